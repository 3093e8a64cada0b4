//! Option source endpoints for select and checklist fields.

use crate::{error::HttpError, AppState};
use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Sources every server starts with.
pub fn default_sources() -> BTreeMap<String, Value> {
    BTreeMap::from([
        (
            "countries".to_string(),
            json!({
                "US": "United States",
                "CA": "Canada",
                "UK": "United Kingdom",
                "AU": "Australia"
            }),
        ),
        (
            "languages".to_string(),
            json!([
                {"value": "en", "text": "English"},
                {"value": "fr", "text": "French"},
                {"value": "es", "text": "Spanish"},
                {"value": "de", "text": "German"}
            ]),
        ),
    ])
}

/// Serve a registered option source.
///
/// # Returns
/// The source's JSON exactly as registered.
///
/// # Errors
/// Returns [`HttpError::NotFound`] for unknown names.
pub async fn get_source(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, HttpError> {
    state
        .sources
        .get(&name)
        .cloned()
        .map(Json)
        .ok_or(HttpError::NotFound)
}

/// List registered source names.
pub async fn list_sources(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.sources.keys().cloned().collect())
}
