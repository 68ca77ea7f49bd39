//! Per-turn records: item mappings and user selections.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one conversational turn (user message).
pub type TurnId = Uuid;

/// Character offsets of the mapped phrase inside the turn's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

/// Associates one turn with one occurrence of a data specification item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemMapping {
    pub turn_id: TurnId,
    pub item_iri: String,
    /// Phrase of the user's text the item was derived from. Empty when the
    /// item was added implicitly.
    #[serde(default)]
    pub mapped_words: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<TextSpan>,
}

impl ItemMapping {
    pub fn new(turn_id: TurnId, item_iri: impl Into<String>, mapped_words: impl Into<String>) -> Self {
        Self {
            turn_id,
            item_iri: item_iri.into(),
            mapped_words: mapped_words.into(),
            span: None,
        }
    }

    /// A mapping for an item that was added without being named in the text.
    pub fn implicit(turn_id: TurnId, item_iri: impl Into<String>) -> Self {
        Self::new(turn_id, item_iri, String::new())
    }

    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.span = Some(TextSpan { start, end });
        self
    }

    pub fn is_implicit(&self) -> bool {
        self.mapped_words.is_empty()
    }
}

/// A property the user picked from the suggestions, with query-shaping flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserSelection {
    pub property_iri: String,
    /// The property should not eliminate otherwise-matching results.
    #[serde(default)]
    pub is_optional: bool,
    /// Filter template containing the `{?var}` placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,
}

impl UserSelection {
    pub fn new(property_iri: impl Into<String>) -> Self {
        Self {
            property_iri: property_iri.into(),
            is_optional: false,
            filter_expression: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    pub fn with_filter(mut self, expression: impl Into<String>) -> Self {
        self.filter_expression = Some(expression.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_mapping_has_empty_words() {
        let turn = Uuid::new_v4();
        let mapping = ItemMapping::implicit(turn, "http://mock.com/class-items#one");
        assert!(mapping.is_implicit());
        assert_eq!(mapping.mapped_words, "");

        let explicit = ItemMapping::new(turn, "http://mock.com/x", "some words").with_span(4, 14);
        assert!(!explicit.is_implicit());
        assert_eq!(explicit.span, Some(TextSpan { start: 4, end: 14 }));
    }

    #[test]
    fn selection_defaults_from_json() {
        let selection: UserSelection =
            serde_json::from_str(r#"{"property_iri":"http://mock.com/p"}"#).unwrap();
        assert_eq!(selection, UserSelection::new("http://mock.com/p"));

        let selection: UserSelection = serde_json::from_str(
            r#"{"property_iri":"http://mock.com/p","is_optional":true,"filter_expression":"{?var} > 100"}"#,
        )
        .unwrap();
        assert_eq!(
            selection,
            UserSelection::new("http://mock.com/p")
                .optional()
                .with_filter("{?var} > 100")
        );
    }
}
