//! HTTP request handlers.

/// Edit history endpoint.
pub mod edits;
/// Field save endpoint.
pub mod save;
/// Option source endpoints.
pub mod sources;
