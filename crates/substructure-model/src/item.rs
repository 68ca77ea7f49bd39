//! Data specification items as resolved by the item catalog.

use serde::{Deserialize, Serialize};

/// A class reference carried by a property item (IRI plus display label).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassRef {
    pub iri: String,
    pub label: String,
}

impl ClassRef {
    pub fn new(iri: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            iri: iri.into(),
            label: label.into(),
        }
    }
}

/// What kind of data specification item an IRI names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemKind {
    Class,
    ObjectProperty {
        domain: ClassRef,
        range: ClassRef,
    },
    DatatypeProperty {
        domain: ClassRef,
        /// Literal type of the property value (e.g. `xsd:string`).
        range_datatype_iri: String,
    },
}

/// A data specification item (class, object property or datatype property).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub iri: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: ItemKind,
}

impl Item {
    pub fn class(iri: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            iri: iri.into(),
            label: label.into(),
            kind: ItemKind::Class,
        }
    }

    pub fn object_property(
        iri: impl Into<String>,
        label: impl Into<String>,
        domain: ClassRef,
        range: ClassRef,
    ) -> Self {
        Self {
            iri: iri.into(),
            label: label.into(),
            kind: ItemKind::ObjectProperty { domain, range },
        }
    }

    pub fn datatype_property(
        iri: impl Into<String>,
        label: impl Into<String>,
        domain: ClassRef,
        range_datatype_iri: impl Into<String>,
    ) -> Self {
        Self {
            iri: iri.into(),
            label: label.into(),
            kind: ItemKind::DatatypeProperty {
                domain,
                range_datatype_iri: range_datatype_iri.into(),
            },
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self.kind, ItemKind::Class)
    }

    pub fn is_property(&self) -> bool {
        !self.is_class()
    }

    /// Domain class of a property item; `None` for classes.
    pub fn domain(&self) -> Option<&ClassRef> {
        match &self.kind {
            ItemKind::Class => None,
            ItemKind::ObjectProperty { domain, .. } | ItemKind::DatatypeProperty { domain, .. } => {
                Some(domain)
            }
        }
    }
}
