//! OWL data specification → item catalog.
//!
//! Reads an ontology with Sophia and keeps only what the substructure needs:
//!
//! | RDF                                  | Catalog item                          |
//! |--------------------------------------|---------------------------------------|
//! | `?c a owl:Class`                     | `Item::class`                         |
//! | `?p a owl:ObjectProperty`            | `Item::object_property` (domain, range) |
//! | `?p a owl:DatatypeProperty`          | `Item::datatype_property` (domain, datatype) |
//! | `?x rdfs:label ?l`                   | item label (`@en`, then untagged, then any) |
//! | `rdfs:domain` / `rdfs:range`         | property endpoints                    |
//!
//! Items without a label fall back to the IRI's local name. Properties whose
//! domain (or, for object properties, range) is missing or not a named class
//! are skipped with a warning: the merger could not keep the graph complete
//! for them. A datatype property without a named range gets `rdfs:Literal`.
//!
//! Items come out in the order of their type declarations.

mod rdf;

pub use rdf::RdfFormat;

use rdf::{parse_statements, RdfNode, RdfObject, RdfStatement};
use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::path::Path;
use substructure_model::{CatalogError, ClassRef, InMemoryCatalog, Item};

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
pub const RDFS_DOMAIN: &str = "http://www.w3.org/2000/01/rdf-schema#domain";
pub const RDFS_RANGE: &str = "http://www.w3.org/2000/01/rdf-schema#range";
pub const RDFS_LITERAL: &str = "http://www.w3.org/2000/01/rdf-schema#Literal";
pub const OWL_CLASS: &str = "http://www.w3.org/2002/07/owl#Class";
pub const OWL_OBJECT_PROPERTY: &str = "http://www.w3.org/2002/07/owl#ObjectProperty";
pub const OWL_DATATYPE_PROPERTY: &str = "http://www.w3.org/2002/07/owl#DatatypeProperty";

#[derive(Debug, thiserror::Error)]
pub enum OwlIngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported data specification format: {0}")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Parse(#[from] anyhow::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

pub type Result<T> = std::result::Result<T, OwlIngestError>;

// ============================================================================
// Entry points
// ============================================================================

/// Load a catalog from a file; the format follows the extension.
pub fn catalog_from_file(path: &Path) -> Result<InMemoryCatalog> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    let format = RdfFormat::from_extension(ext)
        .ok_or_else(|| OwlIngestError::UnsupportedFormat(format!(".{ext}")))?;
    let file = std::fs::File::open(path)?;
    let catalog = catalog_from_reader(std::io::BufReader::new(file), format)?;
    tracing::debug!(
        path = %path.display(),
        format = format.name(),
        items = catalog.len(),
        "loaded OWL data specification"
    );
    Ok(catalog)
}

pub fn catalog_from_str(text: &str, format: RdfFormat) -> Result<InMemoryCatalog> {
    catalog_from_reader(text.as_bytes(), format)
}

pub fn catalog_from_reader<R: BufRead>(reader: R, format: RdfFormat) -> Result<InMemoryCatalog> {
    let statements = parse_statements(reader, format)?;
    Ok(Extraction::collect(&statements).into_catalog()?)
}

// ============================================================================
// Extraction
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Declared {
    Class,
    ObjectProperty,
    DatatypeProperty,
}

impl Declared {
    fn from_type(iri: &str) -> Option<Self> {
        match iri {
            OWL_CLASS => Some(Declared::Class),
            OWL_OBJECT_PROPERTY => Some(Declared::ObjectProperty),
            OWL_DATATYPE_PROPERTY => Some(Declared::DatatypeProperty),
            _ => None,
        }
    }
}

/// A label candidate ranked by language: lower is better.
struct Label {
    rank: u8,
    text: String,
}

fn language_rank(language: Option<&str>) -> u8 {
    match language {
        Some(lang) if lang.eq_ignore_ascii_case("en") => 0,
        Some(lang) if lang.to_ascii_lowercase().starts_with("en-") => 1,
        None => 2,
        Some(_) => 3,
    }
}

fn local_name(iri: &str) -> &str {
    match iri.rsplit(['#', '/']).next() {
        Some(local) if !local.is_empty() => local,
        _ => iri,
    }
}

#[derive(Default)]
struct Extraction {
    declared: Vec<(String, Declared)>,
    labels: HashMap<String, Label>,
    domains: HashMap<String, String>,
    ranges: HashMap<String, String>,
}

impl Extraction {
    fn collect(statements: &[RdfStatement]) -> Self {
        let mut out = Extraction::default();
        let mut seen: HashSet<String> = HashSet::new();

        for stmt in statements {
            let RdfNode::Iri(subject) = &stmt.subject else {
                continue;
            };
            match stmt.predicate_iri.as_str() {
                RDF_TYPE => {
                    let Some(kind) = stmt.object.as_iri().and_then(Declared::from_type) else {
                        continue;
                    };
                    if seen.insert(subject.clone()) {
                        out.declared.push((subject.clone(), kind));
                    } else if !out.declared.iter().any(|(iri, k)| iri == subject && *k == kind) {
                        tracing::warn!(
                            iri = %subject,
                            ignored = ?kind,
                            "item declared with more than one kind; keeping the first"
                        );
                    }
                }
                RDFS_LABEL => {
                    if let RdfObject::Literal(literal) = &stmt.object {
                        let rank = language_rank(literal.language.as_deref());
                        let better = out
                            .labels
                            .get(subject)
                            .map_or(true, |current| rank < current.rank);
                        if better {
                            out.labels.insert(
                                subject.clone(),
                                Label {
                                    rank,
                                    text: literal.lexical.clone(),
                                },
                            );
                        }
                    }
                }
                RDFS_DOMAIN => {
                    if let Some(domain) = stmt.object.as_iri() {
                        out.domains
                            .entry(subject.clone())
                            .or_insert_with(|| domain.to_string());
                    }
                }
                RDFS_RANGE => {
                    if let Some(range) = stmt.object.as_iri() {
                        out.ranges
                            .entry(subject.clone())
                            .or_insert_with(|| range.to_string());
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn label(&self, iri: &str) -> String {
        match self.labels.get(iri) {
            Some(label) => label.text.clone(),
            None => local_name(iri).to_string(),
        }
    }

    fn class_ref(&self, iri: &str) -> ClassRef {
        ClassRef::new(iri, self.label(iri))
    }

    fn into_catalog(self) -> std::result::Result<InMemoryCatalog, CatalogError> {
        let mut catalog = InMemoryCatalog::new();
        let mut skipped = 0usize;

        for (iri, kind) in &self.declared {
            let label = self.label(iri);
            let item = match kind {
                Declared::Class => Some(Item::class(iri, label)),
                Declared::ObjectProperty => {
                    match (self.domains.get(iri), self.ranges.get(iri)) {
                        (Some(domain), Some(range)) => Some(Item::object_property(
                            iri,
                            label,
                            self.class_ref(domain),
                            self.class_ref(range),
                        )),
                        _ => None,
                    }
                }
                Declared::DatatypeProperty => self.domains.get(iri).map(|domain| {
                    let range = self
                        .ranges
                        .get(iri)
                        .map(String::as_str)
                        .unwrap_or(RDFS_LITERAL);
                    Item::datatype_property(iri, label, self.class_ref(domain), range)
                }),
            };
            match item {
                Some(item) => catalog.insert(item)?,
                None => {
                    skipped += 1;
                    tracing::warn!(
                        iri = %iri,
                        kind = ?kind,
                        "skipping property without a named domain/range class"
                    );
                }
            }
        }

        if skipped > 0 {
            tracing::info!(skipped, items = catalog.len(), "built catalog with skipped properties");
        }
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use substructure_model::{ItemCatalog, ItemKind};

    const SHOP_TTL: &str = r#"
@prefix owl:  <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix xsd:  <http://www.w3.org/2001/XMLSchema#> .
@prefix shop: <http://example.com/shop#> .

shop:Product a owl:Class ;
    rdfs:label "Produkt"@de, "Product"@en .
shop:Seller a owl:Class ;
    rdfs:label "Seller" .
shop:SpecialOffer a owl:Class .

shop:soldBy a owl:ObjectProperty ;
    rdfs:label "sold by"@en ;
    rdfs:domain shop:Product ;
    rdfs:range shop:Seller .

shop:price a owl:DatatypeProperty ;
    rdfs:label "price" ;
    rdfs:domain shop:Product ;
    rdfs:range xsd:decimal .

shop:note a owl:DatatypeProperty ;
    rdfs:domain shop:Seller .

shop:relatedTo a owl:ObjectProperty ;
    rdfs:domain shop:Product .
"#;

    #[test]
    fn turtle_yields_classes_and_properties() {
        let catalog = catalog_from_str(SHOP_TTL, RdfFormat::Turtle).unwrap();

        let iris: Vec<&str> = catalog.items().iter().map(|i| i.iri.as_str()).collect();
        assert_eq!(
            iris,
            vec![
                "http://example.com/shop#Product",
                "http://example.com/shop#Seller",
                "http://example.com/shop#SpecialOffer",
                "http://example.com/shop#soldBy",
                "http://example.com/shop#price",
                "http://example.com/shop#note",
            ]
        );

        let summary = catalog.summary();
        assert_eq!(summary.classes, 3);
        assert_eq!(summary.properties, 3);

        assert_eq!(catalog.get("http://example.com/shop#Product").unwrap().label, "Product");
        assert_eq!(
            catalog.get("http://example.com/shop#SpecialOffer").unwrap().label,
            "SpecialOffer"
        );
    }

    #[test]
    fn property_endpoints_carry_labels() {
        let catalog = catalog_from_str(SHOP_TTL, RdfFormat::Turtle).unwrap();

        let sold_by = catalog.lookup("http://example.com/shop#soldBy").unwrap();
        match sold_by.kind {
            ItemKind::ObjectProperty { domain, range } => {
                assert_eq!(domain, ClassRef::new("http://example.com/shop#Product", "Product"));
                assert_eq!(range, ClassRef::new("http://example.com/shop#Seller", "Seller"));
            }
            other => panic!("unexpected kind: {other:?}"),
        }

        let note = catalog.lookup("http://example.com/shop#note").unwrap();
        match note.kind {
            ItemKind::DatatypeProperty {
                domain,
                range_datatype_iri,
            } => {
                assert_eq!(domain.label, "Seller");
                assert_eq!(range_datatype_iri, RDFS_LITERAL);
            }
            other => panic!("unexpected kind: {other:?}"),
        }

        assert!(catalog.lookup("http://example.com/shop#relatedTo").is_none());
    }

    #[test]
    fn ntriples_and_rdfxml_agree_with_turtle() {
        let nt = r#"
<http://example.com/shop#Product> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://www.w3.org/2002/07/owl#Class> .
<http://example.com/shop#Seller> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://www.w3.org/2002/07/owl#Class> .
<http://example.com/shop#soldBy> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://www.w3.org/2002/07/owl#ObjectProperty> .
<http://example.com/shop#soldBy> <http://www.w3.org/2000/01/rdf-schema#domain> <http://example.com/shop#Product> .
<http://example.com/shop#soldBy> <http://www.w3.org/2000/01/rdf-schema#range> <http://example.com/shop#Seller> .
<http://example.com/shop#soldBy> <http://www.w3.org/2000/01/rdf-schema#label> "sold by" .
"#;
        let xml = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:rdfs="http://www.w3.org/2000/01/rdf-schema#"
         xmlns:owl="http://www.w3.org/2002/07/owl#">
  <owl:Class rdf:about="http://example.com/shop#Product"/>
  <owl:Class rdf:about="http://example.com/shop#Seller"/>
  <owl:ObjectProperty rdf:about="http://example.com/shop#soldBy">
    <rdfs:label xml:lang="en">sold by</rdfs:label>
    <rdfs:domain rdf:resource="http://example.com/shop#Product"/>
    <rdfs:range rdf:resource="http://example.com/shop#Seller"/>
  </owl:ObjectProperty>
</rdf:RDF>
"#;
        let from_nt = catalog_from_str(nt, RdfFormat::NTriples).unwrap();
        let from_xml = catalog_from_str(xml, RdfFormat::RdfXml).unwrap();
        assert_eq!(from_nt.items(), from_xml.items());
        assert_eq!(from_nt.len(), 3);
    }

    #[test]
    fn file_loading_follows_extension() {
        let dir = tempfile::tempdir().unwrap();
        let ttl = dir.path().join("shop.ttl");
        std::fs::write(&ttl, SHOP_TTL).unwrap();
        assert_eq!(catalog_from_file(&ttl).unwrap().len(), 6);

        let csv = dir.path().join("shop.csv");
        std::fs::write(&csv, "a,b").unwrap();
        assert!(matches!(
            catalog_from_file(&csv),
            Err(OwlIngestError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        let err = catalog_from_str("this is not turtle", RdfFormat::Turtle).unwrap_err();
        assert!(matches!(err, OwlIngestError::Parse(_)));
    }
}
