//! Conversation aggregate: turns, the mapping log, the substructure graph and
//! the selection lifecycle for one user conversation.
//!
//! A turn is handled in two steps, because the mapping step (usually a
//! language model) needs the turn's identifier:
//!
//! 1. [`Conversation::start_turn`] records the user's text and returns its id.
//! 2. [`Conversation::merge_turn`] merges the mappings produced for that turn,
//!    appends them (plus synthesized ones) to the log and clears selections.
//!
//! `&mut self` on both steps is what keeps merges for one conversation
//! sequential.

use crate::merger::{MergeError, MergeOutcome, Merger};
use crate::selection::{SelectionError, SelectionState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use substructure_model::{
    ItemCatalog, ItemKind, ItemMapping, SubstructureGraph, TurnId, UserSelection,
};
use substructure_sparql::{CompileError, SparqlCompiler};
use uuid::Uuid;

pub type ConversationId = Uuid;

/// One user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversationError {
    #[error("turn {0} does not belong to this conversation")]
    UnknownTurn(TurnId),

    #[error("mapping for {iri} belongs to turn {found}, expected {expected}")]
    ForeignMapping {
        iri: String,
        expected: TurnId,
        found: TurnId,
    },

    #[error("turn {0} has already been merged")]
    AlreadyMerged(TurnId),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    graph: SubstructureGraph,
    turns: Vec<Turn>,
    /// Ids of turns whose mappings were merged.
    #[serde(default)]
    merged_turns: BTreeSet<TurnId>,
    mappings: Vec<ItemMapping>,
    #[serde(default)]
    selections: SelectionState,
}

impl Conversation {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            created: now,
            last_updated: now,
            graph: SubstructureGraph::new(),
            turns: Vec::new(),
            merged_turns: BTreeSet::new(),
            mappings: Vec::new(),
            selections: SelectionState::Idle,
        }
    }

    pub fn graph(&self) -> &SubstructureGraph {
        &self.graph
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn turn(&self, id: TurnId) -> Option<&Turn> {
        self.turns.iter().find(|t| t.id == id)
    }

    /// Every persisted mapping, oldest first.
    pub fn mappings(&self) -> &[ItemMapping] {
        &self.mappings
    }

    pub fn mappings_for_turn(&self, id: TurnId) -> impl Iterator<Item = &ItemMapping> {
        self.mappings.iter().filter(move |m| m.turn_id == id)
    }

    pub fn selections(&self) -> &SelectionState {
        &self.selections
    }

    pub fn suggested_message(&self) -> Option<&str> {
        self.selections.suggested_message()
    }

    /// Record a user message and return its turn id.
    pub fn start_turn(&mut self, text: impl Into<String>) -> TurnId {
        let turn = Turn {
            id: Uuid::new_v4(),
            text: text.into(),
            timestamp: Utc::now(),
        };
        let id = turn.id;
        tracing::debug!(conversation = %self.id, turn = %id, "started turn");
        self.turns.push(turn);
        self.last_updated = Utc::now();
        id
    }

    /// Merge the mappings produced for `turn_id`.
    ///
    /// If the turn's text is the pending suggested message, the selected
    /// properties are merged as implicit mappings too, carrying their
    /// optional flag and filter expression. Each selected property also
    /// records implicit mappings for its domain class (and range class, for
    /// object properties), whether or not those classes are already in the
    /// substructure. Selections are cleared whatever the turn's text.
    pub fn merge_turn<C: ItemCatalog>(
        &mut self,
        merger: &Merger<C>,
        turn_id: TurnId,
        mappings: Vec<ItemMapping>,
    ) -> Result<MergeOutcome, ConversationError> {
        let text = match self.turn(turn_id) {
            Some(turn) => turn.text.clone(),
            None => return Err(ConversationError::UnknownTurn(turn_id)),
        };
        if self.merged_turns.contains(&turn_id) {
            return Err(ConversationError::AlreadyMerged(turn_id));
        }
        if let Some(foreign) = mappings.iter().find(|m| m.turn_id != turn_id) {
            return Err(ConversationError::ForeignMapping {
                iri: foreign.item_iri.clone(),
                expected: turn_id,
                found: foreign.turn_id,
            });
        }

        let selections = self.selections.take_for_turn(&text);
        let mut batch = mappings;
        for selection in &selections {
            push_implicit(&mut batch, turn_id, &selection.property_iri);
            let Some(item) = merger.catalog().lookup(&selection.property_iri) else {
                continue;
            };
            if let Some(domain) = item.domain() {
                push_implicit(&mut batch, turn_id, &domain.iri);
            }
            if let ItemKind::ObjectProperty { range, .. } = &item.kind {
                push_implicit(&mut batch, turn_id, &range.iri);
            }
        }
        if !selections.is_empty() {
            tracing::info!(
                conversation = %self.id,
                turn = %turn_id,
                selections = selections.len(),
                "turn sends the suggested message; merging selected properties"
            );
        }

        let outcome = merger.merge_with_selections(&mut self.graph, batch, &selections)?;
        self.mappings.extend(outcome.mappings.iter().cloned());
        self.merged_turns.insert(turn_id);
        self.last_updated = Utc::now();
        Ok(outcome)
    }

    /// Replace-all update of the user's selected properties. Any previously
    /// suggested message is discarded.
    pub fn replace_selections(
        &mut self,
        selected: &BTreeSet<String>,
        new_selections: Vec<UserSelection>,
    ) -> Vec<UserSelection> {
        let stored = self.selections.replace(selected, new_selections);
        tracing::debug!(
            conversation = %self.id,
            selections = stored.len(),
            "replaced user selections"
        );
        self.last_updated = Utc::now();
        stored
    }

    /// Store the message suggested for the current selections.
    pub fn record_suggestion(&mut self, message: impl Into<String>) -> Result<(), ConversationError> {
        self.selections.suggest(message)?;
        self.last_updated = Utc::now();
        Ok(())
    }

    pub fn clear_selections(&mut self) {
        self.selections.clear();
    }

    /// Query to show in the reply to `turn_id`: `None` when that turn mapped
    /// nothing, otherwise the current substructure compiled to SPARQL.
    pub fn query_for_turn(
        &self,
        compiler: &SparqlCompiler,
        turn_id: TurnId,
    ) -> Result<Option<String>, ConversationError> {
        if self.turn(turn_id).is_none() {
            return Err(ConversationError::UnknownTurn(turn_id));
        }
        if self.mappings_for_turn(turn_id).next().is_none() {
            tracing::debug!(turn = %turn_id, "no mapped items for turn; skipping query");
            return Ok(None);
        }
        Ok(Some(compiler.compile(&self.graph)?))
    }
}

fn push_implicit(batch: &mut Vec<ItemMapping>, turn_id: TurnId, iri: &str) {
    if !batch.iter().any(|m| m.item_iri == iri) {
        batch.push(ItemMapping::implicit(turn_id, iri));
    }
}
