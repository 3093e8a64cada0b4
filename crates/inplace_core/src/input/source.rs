//! Option sources for the enumerated inputs.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::models::value::json_scalar_string;

/// One selectable `{value, label}` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceOption {
    pub value: String,
    pub label: String,
}

impl SourceOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Callback producing raw option data.
pub type SourceCallback = Arc<dyn Fn() -> Value + Send + Sync>;

/// Where an enumerated input gets its options.
#[derive(Clone)]
pub enum OptionSource {
    /// Array or object literal.
    Inline(Value),
    /// URL answering with an array or object literal.
    Url(String),
    /// Function returning an array or object literal.
    Callback(SourceCallback),
}

impl fmt::Debug for OptionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline(value) => f.debug_tuple("Inline").field(value).finish(),
            Self::Url(url) => f.debug_tuple("Url").field(url).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl OptionSource {
    /// Resolve without I/O.
    ///
    /// # Returns
    /// `Some(options)` for inline and callback sources; `None` for URL
    /// sources, which need a transport.
    pub fn resolve_local(&self) -> Option<Vec<SourceOption>> {
        match self {
            Self::Inline(value) => Some(normalize_options(value)),
            Self::Callback(callback) => Some(normalize_options(&callback())),
            Self::Url(_) => None,
        }
    }
}

/// Normalize raw option data into an ordered option list.
///
/// Accepted shapes:
/// - `[{"value": v, "text": t}, ...]`
/// - `[{"id": v, "text": t}, ...]`
/// - `[{k1: v, k2: t, ...}, ...]` (first key is the value, second the label)
/// - `[scalar, ...]` (value and label are the same)
/// - `{"v1": "t1", ...}`
///
/// Anything else yields an empty list.
pub fn normalize_options(raw: &Value) -> Vec<SourceOption> {
    match raw {
        Value::Array(items) => items.iter().filter_map(normalize_item).collect(),
        Value::Object(map) => map
            .iter()
            .map(|(value, label)| SourceOption::new(value.clone(), json_scalar_string(label)))
            .collect(),
        _ => Vec::new(),
    }
}

fn normalize_item(item: &Value) -> Option<SourceOption> {
    let Value::Object(map) = item else {
        return Some(SourceOption::new(
            json_scalar_string(item),
            json_scalar_string(item),
        ));
    };
    if let (Some(value), Some(text)) = (map.get("value"), map.get("text")) {
        return Some(SourceOption::new(
            json_scalar_string(value),
            json_scalar_string(text),
        ));
    }
    if let (Some(id), Some(text)) = (map.get("id"), map.get("text")) {
        return Some(SourceOption::new(
            json_scalar_string(id),
            json_scalar_string(text),
        ));
    }
    let mut values = map.values();
    match (values.next(), values.next()) {
        (Some(value), Some(label)) => Some(SourceOption::new(
            json_scalar_string(value),
            json_scalar_string(label),
        )),
        _ => {
            tracing::debug!("Skipping option entry with fewer than two keys: {}", item);
            None
        }
    }
}

/// Label of the first option whose value string-matches `value`.
pub fn label_for<'a>(options: &'a [SourceOption], value: &str) -> Option<&'a str> {
    options
        .iter()
        .find(|option| option.value == value)
        .map(|option| option.label.as_str())
}
