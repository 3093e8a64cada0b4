//! Submission pipeline: payload construction and response interpretation.

use serde_json::{json, Map, Value};

use crate::config::{Params, PrimaryKey};
use crate::constants::DEFAULT_APPLICATION_ERROR;
use crate::error::{FailureCategory, SubmitFailure, TransportError};
use crate::models::{ResponseStatus, ServerResponse, SubmissionContext, SubmissionPayload};
use crate::transport::TransportResponse;

/// Assemble the JSON body for one save attempt.
///
/// The base entries are `name`, `value` and `pk`, followed by whatever the
/// submission context carries (`user`, `timestamp`, `csrf_token`). Extra
/// params are merged last and win on key collisions.
///
/// # Arguments
/// - `name`: Field name.
/// - `wire_value`: Value already converted to its wire form.
/// - `pk`: Primary key, evaluated now if computed.
/// - `params`: Static or computed extra entries.
/// - `context`: Caller-supplied submission context.
///
/// # Returns
/// The payload to post.
pub fn build_payload(
    name: &str,
    wire_value: String,
    pk: &PrimaryKey,
    params: &Params,
    context: &SubmissionContext,
) -> SubmissionPayload {
    let mut fields = Map::new();
    fields.insert("name".into(), Value::from(name));
    fields.insert("value".into(), Value::from(wire_value));
    fields.insert("pk".into(), pk.resolve());
    if let Some(user) = &context.user {
        fields.insert("user".into(), Value::from(user.as_str()));
    }
    if let Some(timestamp) = &context.timestamp {
        fields.insert("timestamp".into(), Value::from(timestamp.as_str()));
    }
    if let Some(token) = &context.csrf_token {
        fields.insert("csrf_token".into(), Value::from(token.as_str()));
    }
    let extra = match params {
        Params::Static(map) => map.clone(),
        Params::Computed(compute) => compute(&fields),
    };
    for (key, value) in extra {
        fields.insert(key, value);
    }
    SubmissionPayload::from_map(fields)
}

/// Encode rich-text markup as the JSON envelope some endpoints expect.
pub fn encode_envelope(content: &str, csrf_token: Option<&str>) -> String {
    let mut envelope = json!({
        "content": content,
        "htmlAllowed": true,
    });
    if let (Some(token), Some(map)) = (csrf_token, envelope.as_object_mut()) {
        map.insert("csrf_token".into(), Value::from(token));
    }
    envelope.to_string()
}

/// Map a transport status line to a failure.
///
/// # Returns
/// `None` for 2xx statuses, otherwise the categorized failure.
pub fn classify_status(status: u16, reason: &str) -> Option<SubmitFailure> {
    if (200..300).contains(&status) {
        None
    } else {
        Some(SubmitFailure::from_status(status, reason))
    }
}

/// Turn a transport outcome into a committed response or a failure.
///
/// # Returns
/// The parsed response and its raw JSON on `status: "success"`.
///
/// # Errors
/// - Transport errors and non-2xx statuses become [`SubmitFailure::Transport`].
/// - Bodies that are not JSON objects become a generic transport failure.
/// - `status: "error"` becomes [`SubmitFailure::Application`], or
///   [`SubmitFailure::Security`] when the title names a token check.
/// - Any other status is an application failure with a default message.
pub fn interpret_response(
    outcome: Result<TransportResponse, TransportError>,
) -> Result<(ServerResponse, Value), SubmitFailure> {
    let response = outcome.map_err(|err| {
        tracing::error!("Save request failed: {}", err);
        SubmitFailure::from(err)
    })?;
    if let Some(failure) = classify_status(response.status, &response.reason) {
        tracing::error!(
            "Save request returned status {}: {}",
            response.status,
            response.reason
        );
        return Err(failure);
    }
    let raw: Value = serde_json::from_str(&response.body).map_err(|err| {
        tracing::warn!("Save response is not valid JSON: {}", err);
        SubmitFailure::Transport {
            category: FailureCategory::Generic,
            status: Some(response.status),
            detail: format!("Invalid response from server: {}", err),
        }
    })?;
    let parsed: ServerResponse = serde_json::from_value(raw.clone()).map_err(|err| {
        tracing::warn!("Save response has an unexpected shape: {}", err);
        SubmitFailure::Transport {
            category: FailureCategory::Generic,
            status: Some(response.status),
            detail: format!("Invalid response from server: {}", err),
        }
    })?;
    match parsed.status {
        ResponseStatus::Success => Ok((parsed, raw)),
        ResponseStatus::Error if parsed.is_security_rejection() => Err(SubmitFailure::Security {
            message: parsed
                .message
                .unwrap_or_else(|| "Security check failed".to_string()),
        }),
        ResponseStatus::Error | ResponseStatus::Unknown => Err(SubmitFailure::Application {
            title: parsed.title.unwrap_or_else(|| "Error".to_string()),
            message: parsed
                .message
                .unwrap_or_else(|| DEFAULT_APPLICATION_ERROR.to_string()),
        }),
    }
}
