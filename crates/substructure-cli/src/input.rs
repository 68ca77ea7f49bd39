//! JSON input files accepted by the CLI.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use substructure_model::{ItemMapping, TextSpan, TurnId, UserSelection};

/// One phrase → item mapping as produced by the mapper, before it is bound
/// to a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseMapping {
    pub item_iri: String,
    #[serde(default)]
    pub mapped_words: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<TextSpan>,
}

impl PhraseMapping {
    pub fn into_mapping(self, turn_id: TurnId) -> ItemMapping {
        let mut mapping = ItemMapping::new(turn_id, self.item_iri, self.mapped_words);
        mapping.span = self.span;
        mapping
    }
}

/// Replace-all selection update.
///
/// `selected` lists the property IRIs the user ticked; `selections` carries
/// their optional flag and filter expression. Omitted flags default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub selected: BTreeSet<String>,
    #[serde(default)]
    pub selections: Vec<UserSelection>,
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}
