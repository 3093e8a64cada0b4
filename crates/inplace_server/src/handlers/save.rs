//! Save endpoint: accepts one field edit per request.

use crate::{error::HttpError, store::EditRecord, AppState};
use axum::{
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use inplace_core::models::value::json_scalar_string;
use inplace_core::models::RichTextEnvelope;
use inplace_core::Sanitizer;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

const UNKNOWN_USER: &str = "Unknown User";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn is_json_request(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.contains("application/json"))
        .unwrap_or(false)
}

fn body_error(status: StatusCode, message: String) -> HttpError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        HttpError::rejected("Request Too Large", message)
    } else {
        HttpError::rejected("Invalid Request", message)
    }
}

async fn read_fields(state: &AppState, request: Request) -> Result<Map<String, Value>, HttpError> {
    if is_json_request(&request) {
        let bytes = Bytes::from_request(request, state)
            .await
            .map_err(|rejection| body_error(rejection.status(), rejection.body_text()))?;
        return match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Ok(Map::new()),
            Err(err) => Err(HttpError::rejected(
                "Invalid JSON",
                format!("Could not parse JSON data: {}", err),
            )),
        };
    }
    let Form(form) = Form::<HashMap<String, String>>::from_request(request, state)
        .await
        .map_err(|rejection| body_error(rejection.status(), rejection.body_text()))?;
    Ok(form
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect())
}

fn present<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    fields.get(key).filter(|value| !value.is_null())
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    present(fields, key).map(json_scalar_string)
}

/// Loose address check: one `@`, a non-empty local part, and a dotted domain.
pub(crate) fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

fn is_email_field(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with("email")
}

fn check_csrf(
    expected: Option<&str>,
    fields: &Map<String, Value>,
    envelope: Option<&RichTextEnvelope>,
) -> Result<(), HttpError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let supplied = string_field(fields, "csrf_token")
        .or_else(|| envelope.and_then(|envelope| envelope.csrf_token.clone()));
    match supplied {
        Some(token) if token == expected => Ok(()),
        _ => Err(HttpError::rejected(
            "Security Error",
            "Invalid or missing CSRF token",
        )),
    }
}

/// Record one field edit.
///
/// Bodies may be JSON or form-encoded. Rejections are answered with a
/// `status: error` body so the editing client can show the message inline.
///
/// # Returns
/// A `status: success` body with title, message, timestamp and user; rich
/// text envelopes also echo the stored `content`.
///
/// # Errors
/// Returns [`HttpError::Rejected`] for malformed or invalid edits and
/// [`HttpError::Storage`] when the edit log cannot be written.
pub async fn save_edit(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, HttpError> {
    let fields = read_fields(&state, request).await?;

    let (Some(name), Some(pk)) = (string_field(&fields, "name"), present(&fields, "pk").cloned())
    else {
        return Err(HttpError::rejected(
            "Invalid Request",
            "Missing required fields (name or pk)",
        ));
    };
    let raw_value = string_field(&fields, "value").unwrap_or_default();
    let envelope = serde_json::from_str::<RichTextEnvelope>(&raw_value)
        .ok()
        .filter(|envelope| envelope.html_allowed);

    check_csrf(state.config.csrf_token.as_deref(), &fields, envelope.as_ref())?;

    if is_email_field(&name) && !is_valid_email(&raw_value) {
        return Err(HttpError::rejected(
            "Validation Error",
            "Please enter a valid email address",
        ));
    }

    let content = envelope
        .as_ref()
        .map(|envelope| Sanitizer::default().sanitize(&envelope.content));
    let stored = content.clone().unwrap_or(raw_value);
    let user = string_field(&fields, "user")
        .filter(|user| !user.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_USER.to_string());
    let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();

    state
        .store
        .record(EditRecord {
            name: name.clone(),
            pk,
            value: stored,
            user: user.clone(),
            timestamp: timestamp.clone(),
        })
        .await?;
    tracing::debug!("Recorded edit of {}", name);

    let mut body = json!({
        "status": "success",
        "title": "Updated",
        "message": format!("Successfully updated {}", name),
        "timestamp": timestamp,
        "user": user,
    });
    if let (Some(content), Some(map)) = (content, body.as_object_mut()) {
        map.insert("content".into(), Value::String(content));
    }
    Ok(Json(body).into_response())
}

/// Answer non-POST requests to the save route.
pub async fn method_not_allowed() -> HttpError {
    HttpError::MethodNotAllowed
}
