//! The substructure graph: the conversation-scoped subset of the data
//! specification built up turn by turn.
//!
//! ## Representation
//!
//! Class nodes live in a single `Vec` in the order they were first added (the
//! "stored order" the compiler traverses), plus an IRI → index map. Properties
//! are owned by their *domain* class; an object property's range is just an
//! IRI that is looked up in the same arena, so cycles in the class graph never
//! become ownership cycles.
//!
//! ## Invariants
//!
//! - at most one class node per IRI,
//! - at most one property entry per IRI within its owner's lists,
//! - every object property's range IRI names a class node in the graph.
//!
//! The first two hold for every value of [`SubstructureGraph`]. The third is
//! enforced by [`SubstructureGraph::attach_object_property`]; graphs assembled
//! directly from class lists (fixtures, JSON files) can be checked with
//! [`SubstructureGraph::validate`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

// ============================================================================
// Node and edge records
// ============================================================================

/// Object property edge owned by its domain class.
///
/// Domain and range labels are copies of the catalog labels so that the query
/// compiler never needs the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstructureObjectProperty {
    pub iri: String,
    pub label: String,
    pub domain: String,
    pub domain_label: String,
    pub range: String,
    pub range_label: String,
    /// Match this edge in an `OPTIONAL` block.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_optional: bool,
    /// Filter template; `{?var}` stands for this edge's object variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,
}

/// Datatype property edge owned by its domain class. The range is a literal
/// type, so no class node exists for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstructureDatatypeProperty {
    pub iri: String,
    pub label: String,
    pub domain: String,
    pub domain_label: String,
    pub range_datatype_iri: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstructureClass {
    pub iri: String,
    pub label: String,
    #[serde(default)]
    pub object_properties: Vec<SubstructureObjectProperty>,
    #[serde(default)]
    pub datatype_properties: Vec<SubstructureDatatypeProperty>,
}

impl SubstructureClass {
    pub fn new(iri: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            iri: iri.into(),
            label: label.into(),
            object_properties: Vec::new(),
            datatype_properties: Vec::new(),
        }
    }

    pub fn object_property(&self, iri: &str) -> Option<&SubstructureObjectProperty> {
        self.object_properties.iter().find(|p| p.iri == iri)
    }

    pub fn datatype_property(&self, iri: &str) -> Option<&SubstructureDatatypeProperty> {
        self.datatype_properties.iter().find(|p| p.iri == iri)
    }

    fn check_unique_properties(&self) -> Result<(), GraphError> {
        let mut seen = HashSet::new();
        for iri in self
            .object_properties
            .iter()
            .map(|p| &p.iri)
            .chain(self.datatype_properties.iter().map(|p| &p.iri))
        {
            if !seen.insert(iri.as_str()) {
                return Err(GraphError::DuplicateProperty {
                    class: self.iri.clone(),
                    property: iri.clone(),
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("duplicate class node: {0}")]
    DuplicateClass(String),

    #[error("duplicate property {property} on class {class}")]
    DuplicateProperty { class: String, property: String },

    #[error("cannot attach property {property}: class {class} is not in the substructure")]
    MissingClass { property: String, class: String },

    #[error("object property {property} points at {range}, which is not in the substructure")]
    DanglingRange { property: String, range: String },
}

// ============================================================================
// Graph
// ============================================================================

/// Arena of class nodes keyed by IRI, in stored order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "GraphRepr", into = "GraphRepr")]
pub struct SubstructureGraph {
    class_items: Vec<SubstructureClass>,
    index: HashMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
struct GraphRepr {
    #[serde(default)]
    class_items: Vec<SubstructureClass>,
}

impl TryFrom<GraphRepr> for SubstructureGraph {
    type Error = GraphError;

    fn try_from(repr: GraphRepr) -> Result<Self, Self::Error> {
        Self::from_classes(repr.class_items)
    }
}

impl From<SubstructureGraph> for GraphRepr {
    fn from(graph: SubstructureGraph) -> Self {
        Self {
            class_items: graph.class_items,
        }
    }
}

impl PartialEq for SubstructureGraph {
    fn eq(&self, other: &Self) -> bool {
        self.class_items == other.class_items
    }
}

impl Eq for SubstructureGraph {}

impl SubstructureGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a graph from class nodes in stored order.
    ///
    /// Rejects duplicate class IRIs and duplicate property IRIs within a class.
    /// Range completeness is not checked here; see [`Self::validate`].
    pub fn from_classes(classes: Vec<SubstructureClass>) -> Result<Self, GraphError> {
        let mut index = HashMap::with_capacity(classes.len());
        for (idx, class) in classes.iter().enumerate() {
            if index.insert(class.iri.clone(), idx).is_some() {
                return Err(GraphError::DuplicateClass(class.iri.clone()));
            }
            class.check_unique_properties()?;
        }
        Ok(Self {
            class_items: classes,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.class_items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.class_items.is_empty()
    }

    /// Class nodes in stored order.
    pub fn classes(&self) -> &[SubstructureClass] {
        &self.class_items
    }

    pub fn class(&self, iri: &str) -> Option<&SubstructureClass> {
        self.index.get(iri).map(|&idx| &self.class_items[idx])
    }

    pub fn contains_class(&self, iri: &str) -> bool {
        self.index.contains_key(iri)
    }

    pub fn object_property_count(&self) -> usize {
        self.class_items
            .iter()
            .map(|c| c.object_properties.len())
            .sum()
    }

    pub fn datatype_property_count(&self) -> usize {
        self.class_items
            .iter()
            .map(|c| c.datatype_properties.len())
            .sum()
    }

    /// Every class and property IRI in the graph.
    pub fn iris(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for class in &self.class_items {
            out.insert(class.iri.clone());
            out.extend(class.object_properties.iter().map(|p| p.iri.clone()));
            out.extend(class.datatype_properties.iter().map(|p| p.iri.clone()));
        }
        out
    }

    /// Add a class node unless one exists. Returns `true` if it was created.
    pub fn ensure_class(&mut self, iri: &str, label: &str) -> bool {
        if self.contains_class(iri) {
            return false;
        }
        self.index.insert(iri.to_string(), self.class_items.len());
        self.class_items.push(SubstructureClass::new(iri, label));
        true
    }

    /// Attach an object property to its domain class.
    ///
    /// Both the domain and the range class must already be present. An
    /// existing entry with the same IRI is left untouched and `Ok(false)` is
    /// returned.
    pub fn attach_object_property(
        &mut self,
        property: SubstructureObjectProperty,
    ) -> Result<bool, GraphError> {
        if !self.contains_class(&property.range) {
            return Err(GraphError::MissingClass {
                property: property.iri,
                class: property.range,
            });
        }
        let owner = self.owner_mut(&property.iri, &property.domain)?;
        if owner.object_property(&property.iri).is_some() {
            return Ok(false);
        }
        owner.object_properties.push(property);
        Ok(true)
    }

    /// Attach a datatype property to its domain class. Same contract as
    /// [`Self::attach_object_property`], minus the range check.
    pub fn attach_datatype_property(
        &mut self,
        property: SubstructureDatatypeProperty,
    ) -> Result<bool, GraphError> {
        let owner = self.owner_mut(&property.iri, &property.domain)?;
        if owner.datatype_property(&property.iri).is_some() {
            return Ok(false);
        }
        owner.datatype_properties.push(property);
        Ok(true)
    }

    fn owner_mut(
        &mut self,
        property: &str,
        domain: &str,
    ) -> Result<&mut SubstructureClass, GraphError> {
        match self.index.get(domain) {
            Some(&idx) => Ok(&mut self.class_items[idx]),
            None => Err(GraphError::MissingClass {
                property: property.to_string(),
                class: domain.to_string(),
            }),
        }
    }

    /// Check that every object property's range class is present.
    pub fn validate(&self) -> Result<(), GraphError> {
        for class in &self.class_items {
            for property in &class.object_properties {
                if !self.contains_class(&property.range) {
                    return Err(GraphError::DanglingRange {
                        property: property.iri.clone(),
                        range: property.range.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
