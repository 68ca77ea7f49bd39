//! Selection lifecycle.
//!
//! ```text
//!            replace                 suggest
//!   Idle ─────────────► Pending ─────────────► Suggested
//!    ▲                    │  ▲ replace            │
//!    │                    │  └────────────────────┤
//!    └────────────────────┴───── take_for_turn ───┘
//! ```
//!
//! Selections are single-use: the next user turn always returns the state to
//! `Idle`, whether or not the turn used the suggestion.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use substructure_model::UserSelection;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("cannot record a suggested message without selected properties")]
    NothingSelected,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SelectionState {
    #[default]
    Idle,
    /// Properties picked, no suggested message yet.
    Pending { selections: Vec<UserSelection> },
    /// A suggested message was generated from the selections.
    Suggested {
        selections: Vec<UserSelection>,
        message: String,
    },
}

impl SelectionState {
    pub fn selections(&self) -> &[UserSelection] {
        match self {
            SelectionState::Idle => &[],
            SelectionState::Pending { selections } | SelectionState::Suggested { selections, .. } => {
                selections.as_slice()
            }
        }
    }

    pub fn suggested_message(&self) -> Option<&str> {
        match self {
            SelectionState::Suggested { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SelectionState::Idle)
    }

    /// Discard every prior selection (and any suggestion) and keep exactly
    /// the selected identifiers. Returns the stored selections.
    pub fn replace(
        &mut self,
        selected: &BTreeSet<String>,
        new_selections: Vec<UserSelection>,
    ) -> Vec<UserSelection> {
        let selections = replace_selections(selected, new_selections);
        *self = if selections.is_empty() {
            SelectionState::Idle
        } else {
            SelectionState::Pending {
                selections: selections.clone(),
            }
        };
        selections
    }

    /// Attach the suggested message generated for the current selections.
    pub fn suggest(&mut self, message: impl Into<String>) -> Result<(), SelectionError> {
        let selections = match std::mem::take(self) {
            SelectionState::Idle => return Err(SelectionError::NothingSelected),
            SelectionState::Pending { selections }
            | SelectionState::Suggested { selections, .. } => selections,
        };
        *self = SelectionState::Suggested {
            selections,
            message: message.into(),
        };
        Ok(())
    }

    /// Consume the state for a new user turn. The selections are returned
    /// only if the turn sends the suggested message verbatim.
    pub fn take_for_turn(&mut self, text: &str) -> Vec<UserSelection> {
        match std::mem::take(self) {
            SelectionState::Suggested {
                selections,
                message,
            } if message == text => selections,
            _ => Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        *self = SelectionState::Idle;
    }
}

/// Build the replacement selection set.
///
/// One selection per selected identifier: flags come from the first entry in
/// `new_selections` with that identifier, in `new_selections` order; selected
/// identifiers without an entry follow in sorted order with default flags.
/// Entries for identifiers that are not selected are ignored.
pub fn replace_selections(
    selected: &BTreeSet<String>,
    new_selections: Vec<UserSelection>,
) -> Vec<UserSelection> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(selected.len());
    for selection in new_selections {
        if selected.contains(&selection.property_iri) && seen.insert(selection.property_iri.clone())
        {
            out.push(selection);
        }
    }
    for iri in selected {
        if !seen.contains(iri) {
            out.push(UserSelection::new(iri.clone()));
        }
    }
    out
}
