//! Request and response shapes exchanged with the persistence endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::value::json_scalar_string;

/// Caller-supplied context merged into every payload.
///
/// Nothing here is read from ambient state; the host sets it on the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionContext {
    pub user: Option<String>,
    pub timestamp: Option<String>,
    /// Token copied into rich-text envelopes.
    pub csrf_token: Option<String>,
}

/// JSON object posted to the endpoint for one save attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionPayload {
    fields: Map<String, Value>,
}

impl SubmissionPayload {
    pub(crate) fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    pub fn value(&self) -> Option<&str> {
        self.fields.get("value").and_then(Value::as_str)
    }

    pub fn pk(&self) -> Option<&Value> {
        self.fields.get("pk")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

/// Envelope a rich-text field may send in place of its bare markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichTextEnvelope {
    pub content: String,
    #[serde(rename = "htmlAllowed")]
    pub html_allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub csrf_token: Option<String>,
}

/// `status` field of an endpoint response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Structured endpoint response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerResponse {
    #[serde(default)]
    pub status: ResponseStatus,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
}

impl ServerResponse {
    /// Value the endpoint asserts is now stored, if it echoed one.
    ///
    /// Rich-text fields prefer `content` over `value`.
    pub fn authoritative_value(&self, prefer_content: bool) -> Option<String> {
        let value = self
            .value
            .as_ref()
            .filter(|value| !value.is_null())
            .map(json_scalar_string);
        if prefer_content {
            self.content.clone().or(value)
        } else {
            value
        }
    }

    /// Whether the endpoint tagged this rejection as a security failure.
    pub fn is_security_rejection(&self) -> bool {
        let tagged = |text: &Option<String>| {
            text.as_deref()
                .map(|t| {
                    let lower = t.to_ascii_lowercase();
                    lower.contains("csrf") || lower.contains("security")
                })
                .unwrap_or(false)
        };
        tagged(&self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_or_missing_status_is_unknown() {
        let missing: ServerResponse = serde_json::from_value(json!({"message": "hi"})).unwrap();
        assert_eq!(missing.status, ResponseStatus::Unknown);
        let other: ServerResponse = serde_json::from_value(json!({"status": "ok"})).unwrap();
        assert_eq!(other.status, ResponseStatus::Unknown);
    }

    #[test]
    fn authoritative_value_prefers_content_for_rich_text() {
        let response: ServerResponse = serde_json::from_value(json!({
            "status": "success",
            "value": 42,
            "content": "<p>x</p>"
        }))
        .unwrap();
        assert_eq!(response.authoritative_value(false).as_deref(), Some("42"));
        assert_eq!(
            response.authoritative_value(true).as_deref(),
            Some("<p>x</p>")
        );
    }

    #[test]
    fn envelope_uses_wire_field_names() {
        let envelope = RichTextEnvelope {
            content: "<p>x</p>".into(),
            html_allowed: true,
            csrf_token: Some("t".into()),
        };
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"content": "<p>x</p>", "htmlAllowed": true, "csrf_token": "t"})
        );
    }

    #[test]
    fn security_rejections_are_detected_from_title() {
        let response = ServerResponse {
            status: ResponseStatus::Error,
            title: Some("Security Error".into()),
            message: Some("Invalid CSRF token".into()),
            ..ServerResponse::default()
        };
        assert!(response.is_security_rejection());
    }
}
