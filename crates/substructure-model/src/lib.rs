//! Substructure model: the types shared by the merger and the query compiler.
//!
//! - [`item`]: data specification items (classes, object/datatype properties)
//! - [`catalog`]: read-only item lookup by IRI, plus an in-memory implementation
//! - [`graph`]: the substructure graph built across a conversation
//! - [`mapping`]: per-turn item mappings and user selections
//!
//! Nothing in this crate talks to a language model, a database or the network.

pub mod catalog;
pub mod graph;
pub mod item;
pub mod mapping;

pub use catalog::{CatalogError, CatalogSummary, InMemoryCatalog, ItemCatalog};
pub use graph::{
    GraphError, SubstructureClass, SubstructureDatatypeProperty, SubstructureGraph,
    SubstructureObjectProperty,
};
pub use item::{ClassRef, Item, ItemKind};
pub use mapping::{ItemMapping, TextSpan, TurnId, UserSelection};
