//! Data models shared by the engine, the endpoint, and host code.

use serde::Serialize;
use std::fmt;

/// Emitted events.
pub mod event;
/// Endpoint request/response shapes.
pub mod payload;
/// Typed field values.
pub mod value;

pub use event::{FieldEvent, FieldEventKind};
pub use payload::{
    ResponseStatus, RichTextEnvelope, ServerResponse, SubmissionContext, SubmissionPayload,
};
pub use value::FieldValue;

/// Registry key of an editable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FieldId(pub(crate) u64);

impl FieldId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field#{}", self.0)
    }
}
