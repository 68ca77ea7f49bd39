//! Item catalog: read-only lookup of data specification items by IRI.
//!
//! The merger only ever asks the catalog one question (`lookup`). Absence is an
//! expected answer (the language model may hallucinate IRIs), not an error.

use crate::item::Item;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Read-only lookup of data specification items.
pub trait ItemCatalog {
    fn lookup(&self, iri: &str) -> Option<Item>;
}

impl<C: ItemCatalog + ?Sized> ItemCatalog for &C {
    fn lookup(&self, iri: &str) -> Option<Item> {
        (**self).lookup(iri)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate catalog item: {0}")]
    DuplicateItem(String),
}

/// Item counts reported when a data specification is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSummary {
    pub classes: usize,
    pub properties: usize,
}

impl CatalogSummary {
    /// Text shown to the user when a conversation starts.
    pub fn welcome_text(&self) -> String {
        format!(
            "Your data specification has been loaded.\nIt contains {} classes and {} properties.",
            self.classes, self.properties
        )
    }
}

/// In-memory catalog keyed by IRI. Iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    items: Vec<Item>,
    by_iri: HashMap<String, usize>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog, rejecting duplicate IRIs.
    pub fn from_items(items: impl IntoIterator<Item = Item>) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for item in items {
            catalog.insert(item)?;
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, item: Item) -> Result<(), CatalogError> {
        if self.by_iri.contains_key(&item.iri) {
            return Err(CatalogError::DuplicateItem(item.iri));
        }
        self.by_iri.insert(item.iri.clone(), self.items.len());
        self.items.push(item);
        Ok(())
    }

    pub fn get(&self, iri: &str) -> Option<&Item> {
        self.by_iri.get(iri).map(|&idx| &self.items[idx])
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn summary(&self) -> CatalogSummary {
        let classes = self.items.iter().filter(|item| item.is_class()).count();
        CatalogSummary {
            classes,
            properties: self.items.len() - classes,
        }
    }

    /// Parse a JSON array of items.
    pub fn from_json_str(text: &str) -> Result<Self, CatalogError> {
        let items: Vec<Item> = serde_json::from_str(text)?;
        Self::from_items(items)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&text)?;
        tracing::debug!(
            path = %path.display(),
            items = catalog.len(),
            "loaded item catalog"
        );
        Ok(catalog)
    }

    pub fn to_json_string(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string_pretty(&self.items)?)
    }
}

impl ItemCatalog for InMemoryCatalog {
    fn lookup(&self, iri: &str) -> Option<Item> {
        self.get(iri).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ClassRef;

    fn mock_catalog() -> InMemoryCatalog {
        let one = ClassRef::new("http://mock.com/class-items#one", "Class item one");
        let two = ClassRef::new("http://mock.com/class-items#two", "Class item two");
        InMemoryCatalog::from_items([
            Item::class(&one.iri, &one.label),
            Item::class(&two.iri, &two.label),
            Item::object_property(
                "http://mock.com/object-properties#one",
                "Object property one",
                one.clone(),
                two.clone(),
            ),
            Item::datatype_property(
                "http://mock.com/datatype-properties#one",
                "Datatype property one",
                two.clone(),
                "http://mock.com/simple-types#Literal",
            ),
            Item::datatype_property(
                "http://mock.com/datatype-properties#two",
                "Datatype property two",
                two,
                "http://mock.com/simple-types#Literal",
            ),
        ])
        .unwrap()
    }

    #[test]
    fn summary_counts_classes_and_properties() {
        let summary = mock_catalog().summary();
        assert_eq!(
            summary,
            CatalogSummary {
                classes: 2,
                properties: 3
            }
        );
        assert_eq!(
            summary.welcome_text(),
            "Your data specification has been loaded.\nIt contains 2 classes and 3 properties."
        );
    }

    #[test]
    fn lookup_absent_iri_is_none() {
        let catalog = mock_catalog();
        assert!(catalog.lookup("http://mock.com/nope").is_none());
        let item = catalog.lookup("http://mock.com/class-items#two").unwrap();
        assert_eq!(item.label, "Class item two");
    }

    #[test]
    fn duplicate_iri_is_rejected() {
        let err = InMemoryCatalog::from_items([
            Item::class("http://mock.com/a", "A"),
            Item::class("http://mock.com/a", "A again"),
        ])
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateItem(iri) if iri == "http://mock.com/a"));
    }

    #[test]
    fn json_file_roundtrip_keeps_order() {
        let catalog = mock_catalog();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, catalog.to_json_string().unwrap()).unwrap();

        let loaded = InMemoryCatalog::from_json_file(&path).unwrap();
        let iris: Vec<&str> = loaded.items().iter().map(|i| i.iri.as_str()).collect();
        let expected: Vec<&str> = catalog.items().iter().map(|i| i.iri.as_str()).collect();
        assert_eq!(iris, expected);
    }
}
