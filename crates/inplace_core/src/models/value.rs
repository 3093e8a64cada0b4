//! Committed field values.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Canonical, typed value of an editable field.
///
/// Equality is structural; the unchanged-value shortcut compares two values
/// with `==`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Text(String),
    List(Vec<String>),
    Number(f64),
    Timestamp(NaiveDateTime),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(values.into_iter().map(Into::into).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(number) => Some(*number),
            _ => None,
        }
    }

    /// Coerce to a list: scalars become a one-element list, null an empty one.
    pub fn to_list(&self) -> Vec<String> {
        match self {
            Self::Null => Vec::new(),
            Self::List(values) => values.clone(),
            Self::Text(text) if text.is_empty() => Vec::new(),
            other => vec![other.to_plain_string()],
        }
    }

    /// Generic string form used when no variant-specific rule applies.
    pub fn to_plain_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Text(text) => text.clone(),
            Self::List(values) => values.join(","),
            Self::Number(number) => format_number(*number),
            Self::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Build a value from a decoded JSON attribute.
    ///
    /// Arrays become lists of their string-compared items; numbers stay
    /// numeric; everything else is kept as text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::String(text) => Self::Text(text.clone()),
            serde_json::Value::Number(number) => number
                .as_f64()
                .map(Self::Number)
                .unwrap_or_else(|| Self::Text(number.to_string())),
            serde_json::Value::Array(items) => Self::List(items.iter().map(json_scalar_string).collect()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Render a number the way it is shown and sent: integral values lose `.0`.
pub fn format_number(number: f64) -> String {
    format!("{}", number)
}

/// String form of a JSON scalar; strings are unquoted.
pub fn json_scalar_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Null => String::new(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(json_scalar_string)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}
