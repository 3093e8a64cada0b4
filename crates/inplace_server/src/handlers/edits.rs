//! Read-only views of accepted edits.

use crate::{error::HttpError, store::EditRecord, AppState};
use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

/// Every accepted edit, oldest first.
pub async fn list_edits(State(state): State<AppState>) -> Json<Vec<EditRecord>> {
    Json(state.store.history())
}

/// Latest accepted edit for one field.
///
/// Numeric-looking keys match records whose `pk` was sent as a number.
///
/// # Errors
/// Returns [`HttpError::NotFound`] when the field was never saved.
pub async fn get_edit(
    State(state): State<AppState>,
    Path((name, pk)): Path<(String, String)>,
) -> Result<Json<EditRecord>, HttpError> {
    state
        .store
        .get(&name, &Value::String(pk))
        .map(Json)
        .ok_or(HttpError::NotFound)
}
