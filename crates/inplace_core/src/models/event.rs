//! Events emitted to host code.

use serde::Serialize;
use serde_json::Value;

use super::{FieldId, FieldValue};
use crate::document::NodeId;

/// What happened to a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldEventKind {
    Shown,
    Hidden,
    Save {
        old_value: FieldValue,
        new_value: FieldValue,
        wire_value: String,
        /// Raw endpoint response; `None` for fields saved without a URL.
        response: Option<Value>,
    },
    Cancel,
    NoChange,
    Update {
        value: FieldValue,
    },
}

impl FieldEventKind {
    /// Event name as exposed to host listeners (`editable.<name>`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Shown => "shown",
            Self::Hidden => "hidden",
            Self::Save { .. } => "save",
            Self::Cancel => "cancel",
            Self::NoChange => "nochange",
            Self::Update { .. } => "update",
        }
    }
}

/// One emitted event, addressed by field and anchor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldEvent {
    pub field: FieldId,
    pub anchor: NodeId,
    #[serde(flatten)]
    pub kind: FieldEventKind,
}
