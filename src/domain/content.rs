//! Theme-independent description of an email body.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body of a transactional email.
///
/// Optional fields model presence explicitly: `None` means "unset" and is
/// eligible for defaulting, while `Some` is kept verbatim even when it holds an
/// empty string or an empty sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailContent {
    /// Recipient name, possibly empty.
    pub name: String,
    /// Paragraphs shown before the main content.
    pub intros: Option<Vec<String>>,
    /// Ordered attribute/value pairs.
    pub dictionary: Option<Vec<Entry>>,
    pub table: Table,
    pub actions: Vec<Action>,
    /// Paragraphs shown after the main content.
    pub outros: Option<Vec<String>>,
    pub greeting: Option<String>,
    pub signature: Option<String>,
    /// Replaces "greeting + name" when set.
    pub title: Option<String>,
    /// Raw markdown that themes may render instead of the structured fields.
    pub free_markdown: Option<Markdown>,
}

impl EmailContent {
    /// Values used to fill unset content fields.
    pub fn builtin_defaults() -> Self {
        Self {
            intros: Some(Vec::new()),
            dictionary: Some(Vec::new()),
            outros: Some(Vec::new()),
            signature: Some("Thanks".to_string()),
            greeting: Some("Hi".to_string()),
            ..Self::default()
        }
    }
}

/// Key/value pair; sequences of entries keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub key: String,
    pub value: String,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Tabular content such as invoices or pricing grids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Table {
    /// Rows of cells; every cell carries its column key.
    pub data: Vec<Vec<Entry>>,
    pub columns: Columns,
}

/// Display metadata for table columns, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Columns {
    pub custom_width: BTreeMap<String, String>,
    pub custom_alignment: BTreeMap<String, String>,
}

/// Something the recipient can act on: a button and optionally an invite code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Action {
    pub instructions: String,
    pub button: Button,
    pub invite_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Button {
    pub color: String,
    pub text_color: String,
    pub text: String,
    pub link: String,
}

/// Markdown source carried verbatim until a theme expands it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Markdown(String);

impl Markdown {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Markdown {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Markdown {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sequences_deserialize_as_unset() {
        let content: EmailContent = toml::from_str(r#"name = "Ada""#).expect("valid toml");

        assert_eq!(content.name, "Ada");
        assert!(content.intros.is_none());
        assert!(content.outros.is_none());
        assert!(content.dictionary.is_none());
        assert!(content.greeting.is_none());
    }

    #[test]
    fn explicit_empty_sequences_deserialize_as_present() {
        let content: EmailContent =
            toml::from_str("intros = []\noutros = []\ndictionary = []").expect("valid toml");

        assert_eq!(content.intros, Some(Vec::new()));
        assert_eq!(content.outros, Some(Vec::new()));
        assert_eq!(content.dictionary, Some(Vec::new()));
    }

    #[test]
    fn actions_and_markdown_deserialize_from_toml() {
        let source = r##"
free_markdown = "# Hello"

[[actions]]
instructions = "Click below"
button = { text = "Go", link = "https://example.com/" }
"##;
        let content: EmailContent = toml::from_str(source).expect("valid toml");

        assert_eq!(content.actions.len(), 1);
        assert_eq!(content.actions[0].button.text, "Go");
        assert!(content.actions[0].invite_code.is_none());
        assert_eq!(
            content.free_markdown.as_ref().map(Markdown::as_str),
            Some("# Hello")
        );
    }
}
