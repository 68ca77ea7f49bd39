//! Substructure Merger: applies one turn's item mappings to the graph.
//!
//! For every resolved mapping:
//!
//! - **Class**: ensure the class node exists.
//! - **ObjectProperty**: ensure domain and range class nodes exist, then attach
//!   the property to its domain class (existing entries are left untouched).
//! - **DatatypeProperty**: ensure the domain class node exists, then attach.
//!
//! Every class node created as a side effect of a property gets an *implicit*
//! mapping (empty mapped words) for the same turn, unless the batch already
//! maps that class explicitly. Those synthesized mappings are returned next to
//! the caller's mappings in [`MergeOutcome`]; the caller is responsible for
//! persisting all of them.
//!
//! Resolution happens before any mutation, so a batch rejected under
//! [`UnresolvedPolicy::Reject`] leaves the graph untouched.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use substructure_model::{
    ClassRef, GraphError, Item, ItemCatalog, ItemKind, ItemMapping, SubstructureDatatypeProperty,
    SubstructureGraph, SubstructureObjectProperty, TurnId, UserSelection,
};

// ============================================================================
// Configuration
// ============================================================================

/// What to do with a mapping whose IRI the catalog does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedPolicy {
    /// Drop the mapping, log it and keep going.
    #[default]
    Skip,
    /// Fail the whole batch.
    Reject,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub unresolved: UnresolvedPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("item {iri} (turn {turn_id}) is not in the data specification")]
    Unresolved { iri: String, turn_id: TurnId },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

// ============================================================================
// Outcome
// ============================================================================

/// Result of merging one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Resolved input mappings followed by synthesized implicit mappings.
    pub mappings: Vec<ItemMapping>,
    /// Number of implicit mappings at the end of `mappings`.
    pub synthesized: usize,
    /// Input mappings dropped because the catalog could not resolve them.
    pub unresolved: Vec<ItemMapping>,
    /// Class IRIs that were added to the graph, in creation order.
    pub created_classes: Vec<String>,
    /// Property IRIs that were attached to the graph, in attachment order.
    pub attached_properties: Vec<String>,
}

impl MergeOutcome {
    pub fn synthesized_mappings(&self) -> &[ItemMapping] {
        &self.mappings[self.mappings.len() - self.synthesized..]
    }

    /// Whether the graph changed.
    pub fn grew(&self) -> bool {
        !self.created_classes.is_empty() || !self.attached_properties.is_empty()
    }
}

// ============================================================================
// Merger
// ============================================================================

pub struct Merger<C> {
    catalog: C,
    config: MergeConfig,
}

impl<C: ItemCatalog> Merger<C> {
    pub fn new(catalog: C) -> Self {
        Self::with_config(catalog, MergeConfig::default())
    }

    pub fn with_config(catalog: C, config: MergeConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Merge one turn's mappings into `graph`.
    pub fn merge(
        &self,
        graph: &mut SubstructureGraph,
        mappings: Vec<ItemMapping>,
    ) -> Result<MergeOutcome, MergeError> {
        self.merge_with_selections(graph, mappings, &[])
    }

    /// Like [`Self::merge`], additionally copying the optional flag and filter
    /// expression of a matching selection onto newly attached properties.
    pub fn merge_with_selections(
        &self,
        graph: &mut SubstructureGraph,
        mappings: Vec<ItemMapping>,
        selections: &[UserSelection],
    ) -> Result<MergeOutcome, MergeError> {
        let mut outcome = MergeOutcome::default();

        let mut resolved: Vec<(ItemMapping, Item)> = Vec::with_capacity(mappings.len());
        for mapping in mappings {
            match self.catalog.lookup(&mapping.item_iri) {
                Some(item) => resolved.push((mapping, item)),
                None => {
                    if self.config.unresolved == UnresolvedPolicy::Reject {
                        return Err(MergeError::Unresolved {
                            iri: mapping.item_iri,
                            turn_id: mapping.turn_id,
                        });
                    }
                    tracing::warn!(
                        iri = %mapping.item_iri,
                        turn = %mapping.turn_id,
                        "dropping mapping: item not found in data specification"
                    );
                    outcome.unresolved.push(mapping);
                }
            }
        }

        let explicit: HashSet<String> = resolved
            .iter()
            .map(|(mapping, _)| mapping.item_iri.clone())
            .collect();
        let flags: HashMap<&str, &UserSelection> = selections
            .iter()
            .map(|s| (s.property_iri.as_str(), s))
            .collect();

        let mut batch = Batch {
            graph,
            explicit: &explicit,
            outcome: &mut outcome,
            implicit: Vec::new(),
        };
        for (mapping, item) in &resolved {
            batch.apply(mapping, item, flags.get(item.iri.as_str()).copied())?;
        }
        let implicit = std::mem::take(&mut batch.implicit);

        outcome.synthesized = implicit.len();
        outcome.mappings = resolved.into_iter().map(|(mapping, _)| mapping).collect();
        outcome.mappings.extend(implicit);

        tracing::info!(
            mappings = outcome.mappings.len(),
            synthesized = outcome.synthesized,
            unresolved = outcome.unresolved.len(),
            classes = outcome.created_classes.len(),
            properties = outcome.attached_properties.len(),
            "merged mappings into substructure"
        );
        Ok(outcome)
    }
}

/// Mutable state for one batch.
struct Batch<'a> {
    graph: &'a mut SubstructureGraph,
    explicit: &'a HashSet<String>,
    outcome: &'a mut MergeOutcome,
    implicit: Vec<ItemMapping>,
}

impl Batch<'_> {
    fn apply(
        &mut self,
        mapping: &ItemMapping,
        item: &Item,
        selection: Option<&UserSelection>,
    ) -> Result<(), MergeError> {
        match &item.kind {
            ItemKind::Class => {
                self.ensure_class(&ClassRef::new(&item.iri, &item.label), None);
            }
            ItemKind::ObjectProperty { domain, range } => {
                self.ensure_class(domain, Some(mapping.turn_id));
                self.ensure_class(range, Some(mapping.turn_id));
                let attached = self.graph.attach_object_property(SubstructureObjectProperty {
                    iri: item.iri.clone(),
                    label: item.label.clone(),
                    domain: domain.iri.clone(),
                    domain_label: domain.label.clone(),
                    range: range.iri.clone(),
                    range_label: range.label.clone(),
                    is_optional: selection.is_some_and(|s| s.is_optional),
                    filter_expression: selection.and_then(|s| s.filter_expression.clone()),
                })?;
                self.record_attached(item, attached);
            }
            ItemKind::DatatypeProperty {
                domain,
                range_datatype_iri,
            } => {
                self.ensure_class(domain, Some(mapping.turn_id));
                let attached =
                    self.graph
                        .attach_datatype_property(SubstructureDatatypeProperty {
                            iri: item.iri.clone(),
                            label: item.label.clone(),
                            domain: domain.iri.clone(),
                            domain_label: domain.label.clone(),
                            range_datatype_iri: range_datatype_iri.clone(),
                            is_optional: selection.is_some_and(|s| s.is_optional),
                            filter_expression: selection
                                .and_then(|s| s.filter_expression.clone()),
                        })?;
                self.record_attached(item, attached);
            }
        }
        Ok(())
    }

    /// Create the class node if missing. `implicit_for` names the turn to
    /// synthesize a mapping for when the node is created as a side effect.
    fn ensure_class(&mut self, class: &ClassRef, implicit_for: Option<TurnId>) {
        if !self.graph.ensure_class(&class.iri, &class.label) {
            return;
        }
        tracing::debug!(iri = %class.iri, "added class to substructure");
        self.outcome.created_classes.push(class.iri.clone());
        if let Some(turn_id) = implicit_for {
            if !self.explicit.contains(&class.iri) {
                tracing::debug!(iri = %class.iri, turn = %turn_id, "synthesized implicit mapping");
                self.implicit.push(ItemMapping::implicit(turn_id, &class.iri));
            }
        }
    }

    fn record_attached(&mut self, item: &Item, attached: bool) {
        if attached {
            tracing::debug!(iri = %item.iri, "attached property to substructure");
            self.outcome.attached_properties.push(item.iri.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use substructure_model::InMemoryCatalog;
    use uuid::Uuid;

    const ONE: &str = "http://mock.com/class-items#one";
    const TWO: &str = "http://mock.com/class-items#two";
    const OBJ: &str = "http://mock.com/object-properties#one";
    const DT: &str = "http://mock.com/datatype-properties#one";

    fn catalog() -> InMemoryCatalog {
        let one = ClassRef::new(ONE, "Class item one");
        let two = ClassRef::new(TWO, "Class item two");
        InMemoryCatalog::from_items([
            Item::class(ONE, "Class item one"),
            Item::class(TWO, "Class item two"),
            Item::object_property(OBJ, "Object property one", one.clone(), two),
            Item::datatype_property(DT, "Datatype property one", one, "http://mock.com/type#Literal"),
        ])
        .unwrap()
    }

    #[test]
    fn object_property_into_empty_graph_synthesizes_domain_and_range() {
        let merger = Merger::new(catalog());
        let mut graph = SubstructureGraph::new();
        let turn = Uuid::new_v4();

        let outcome = merger
            .merge(&mut graph, vec![ItemMapping::new(turn, OBJ, "Mock mapped words")])
            .unwrap();

        assert_eq!(outcome.mappings.len(), 3);
        assert_eq!(outcome.synthesized, 2);
        assert_eq!(outcome.mappings[0].mapped_words, "Mock mapped words");
        let implicit: Vec<&str> = outcome
            .synthesized_mappings()
            .iter()
            .map(|m| m.item_iri.as_str())
            .collect();
        assert_eq!(implicit, vec![ONE, TWO]);
        assert!(outcome.synthesized_mappings().iter().all(|m| m.is_implicit() && m.turn_id == turn));

        assert_eq!(graph.len(), 2);
        let owner = graph.class(ONE).unwrap();
        let property = owner.object_property(OBJ).unwrap();
        assert_eq!(property.range, TWO);
        assert_eq!(property.range_label, "Class item two");
        assert!(graph.class(TWO).unwrap().object_properties.is_empty());
    }

    #[test]
    fn explicit_class_in_same_batch_is_not_synthesized() {
        let merger = Merger::new(catalog());
        let mut graph = SubstructureGraph::new();
        let turn = Uuid::new_v4();

        let outcome = merger
            .merge(
                &mut graph,
                vec![
                    ItemMapping::new(turn, OBJ, "relates"),
                    ItemMapping::new(turn, TWO, "second thing"),
                ],
            )
            .unwrap();

        assert_eq!(outcome.synthesized, 1);
        assert_eq!(outcome.synthesized_mappings()[0].item_iri, ONE);
        assert_eq!(outcome.mappings.len(), 3);
    }

    #[test]
    fn unresolved_mapping_is_dropped_and_batch_continues() {
        let merger = Merger::new(catalog());
        let mut graph = SubstructureGraph::new();
        let turn = Uuid::new_v4();

        let outcome = merger
            .merge(
                &mut graph,
                vec![
                    ItemMapping::new(turn, "http://mock.com/hallucinated", "ghost"),
                    ItemMapping::new(turn, ONE, "first"),
                ],
            )
            .unwrap();

        assert_eq!(outcome.unresolved.len(), 1);
        assert_eq!(outcome.mappings.len(), 1);
        assert!(graph.contains_class(ONE));
    }

    #[test]
    fn reject_policy_leaves_graph_untouched() {
        let merger = Merger::with_config(
            catalog(),
            MergeConfig {
                unresolved: UnresolvedPolicy::Reject,
            },
        );
        let mut graph = SubstructureGraph::new();
        let turn = Uuid::new_v4();

        let err = merger
            .merge(
                &mut graph,
                vec![
                    ItemMapping::new(turn, ONE, "first"),
                    ItemMapping::new(turn, "http://mock.com/hallucinated", "ghost"),
                ],
            )
            .unwrap_err();

        assert_eq!(
            err,
            MergeError::Unresolved {
                iri: "http://mock.com/hallucinated".to_string(),
                turn_id: turn
            }
        );
        assert!(graph.is_empty());
    }

    #[test]
    fn selection_flags_land_on_new_properties_only() {
        let merger = Merger::new(catalog());
        let mut graph = SubstructureGraph::new();
        let turn = Uuid::new_v4();
        let selections = vec![UserSelection::new(DT).with_filter("{?var} > 100")];

        merger
            .merge_with_selections(&mut graph, vec![ItemMapping::implicit(turn, DT)], &selections)
            .unwrap();
        let property = graph.class(ONE).unwrap().datatype_property(DT).unwrap();
        assert_eq!(property.filter_expression.as_deref(), Some("{?var} > 100"));
        assert!(!property.is_optional);

        // Re-merging with different flags does not rewrite the existing entry.
        let selections = vec![UserSelection::new(DT).optional()];
        let outcome = merger
            .merge_with_selections(&mut graph, vec![ItemMapping::implicit(turn, DT)], &selections)
            .unwrap();
        assert!(!outcome.grew());
        let property = graph.class(ONE).unwrap().datatype_property(DT).unwrap();
        assert!(!property.is_optional);
        assert_eq!(property.filter_expression.as_deref(), Some("{?var} > 100"));
    }
}
