//! In-place editing engine: turns document elements into editable fields.

/// Per-field configuration and attribute parsing.
pub mod config;
/// Shared constants (ports, defaults, timing).
pub mod constants;
/// Floating and inline presentation containers.
pub mod container;
/// In-memory document tree.
pub mod document;
/// Scoped environment overrides for tests.
pub mod env;
/// Error types for editing and submission.
pub mod error;
/// Field controller state machine.
pub mod field;
/// Form wrapper with buttons and the error slot.
pub mod form;
/// Input kinds and their conversions.
pub mod input;
/// Listener registry with disposers.
pub mod listeners;
/// Values, payloads and events.
pub mod models;
/// Notification sink.
pub mod notify;
/// Field registry and event dispatch.
pub mod page;
/// Markup sanitizer.
pub mod sanitize;
/// Deferred work.
pub mod schedule;
/// Payload construction and response interpretation.
pub mod submit;
/// Transport seam and the HTTP implementation.
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{FieldConfig, Mode, OnBlur, Placement, SuccessVerdict, Toggle};
pub use document::{Document, NodeId, Rect, Viewport};
pub use error::{EditError, FailureCategory, SubmitFailure, TransportError};
pub use field::{Completion, FieldState, PendingSubmission, SubmitOutcome, SubmitTicket};
pub use input::{InputKind, OptionSource, SourceOption};
pub use models::{FieldEvent, FieldEventKind, FieldId, FieldValue, SubmissionContext};
pub use notify::{NoticeLevel, Notifier, TracingNotifier};
pub use page::{Key, Modifiers, Page, UiEvent};
pub use sanitize::{Sanitizer, SanitizerPolicy};
pub use transport::{HttpTransport, Transport, TransportResponse};
