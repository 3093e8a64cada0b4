//! Error types for the editing lifecycle and the submission pipeline.
use thiserror::Error;

/// Top-level error type returned by [`crate::Page`] operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("No editable field with id {0}")]
    FieldNotFound(u64),

    #[error("Field has been destroyed")]
    Destroyed,

    #[error("Field is disabled")]
    Disabled,

    #[error("Field is not open")]
    NotOpen,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Submission failed: {0}")]
    Submission(#[from] SubmitFailure),

    #[error("Anchor node is not part of the document")]
    DetachedAnchor,
}

/// Coarse classification of transport/protocol failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    NotFound,
    Forbidden,
    ServerError,
    NetworkUnreachable,
    Generic,
}

impl FailureCategory {
    /// Map an HTTP status code outside the 2xx range to a category.
    ///
    /// # Returns
    /// The category a non-success status falls into; unmapped codes are
    /// [`FailureCategory::Generic`].
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => Self::NotFound,
            401 | 403 => Self::Forbidden,
            500..=599 => Self::ServerError,
            _ => Self::Generic,
        }
    }
}

/// Why a save attempt did not commit.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmitFailure {
    /// The endpoint answered with `status: "error"`.
    #[error("{title}: {message}")]
    Application { title: String, message: String },

    /// The endpoint rejected a security token (CSRF or similar).
    #[error("security check failed: {message}")]
    Security { message: String },

    /// Non-2xx status, malformed body, or the request never completed.
    #[error("{category:?}: {detail}")]
    Transport {
        category: FailureCategory,
        /// HTTP status, when a response arrived.
        status: Option<u16>,
        detail: String,
    },
}

impl SubmitFailure {
    /// Build a transport failure from a non-2xx status line.
    pub fn from_status(status: u16, reason: &str) -> Self {
        Self::Transport {
            category: FailureCategory::from_status(status),
            status: Some(status),
            detail: format!("Server returned {}: {}", status, reason),
        }
    }

    /// Message shown in the form's error slot.
    ///
    /// Application and security failures show the server-supplied text;
    /// transport failures are mapped to a fixed message per category.
    pub fn user_message(&self) -> String {
        match self {
            Self::Application { message, .. } | Self::Security { message } => message.clone(),
            Self::Transport {
                category,
                status,
                detail,
            } => match category {
                FailureCategory::NotFound => format!(
                    "The requested resource was not found ({}).",
                    status.unwrap_or(404)
                ),
                FailureCategory::Forbidden => format!(
                    "Access denied ({}). You do not have permission for this action.",
                    status.unwrap_or(403)
                ),
                FailureCategory::ServerError => format!(
                    "Server error ({}). Please try again later.",
                    status.unwrap_or(500)
                ),
                FailureCategory::NetworkUnreachable => {
                    "Network error. Please check your connection and try again.".to_string()
                }
                FailureCategory::Generic => format!("Error: {}", detail),
            },
        }
    }
}

/// Errors produced by a [`crate::transport::Transport`] implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request never produced a response (DNS, refused, reset, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The request could not be built or the URL is unusable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<TransportError> for SubmitFailure {
    fn from(value: TransportError) -> Self {
        match value {
            TransportError::Network(detail) => Self::Transport {
                category: FailureCategory::NetworkUnreachable,
                status: None,
                detail,
            },
            TransportError::InvalidRequest(detail) => Self::Transport {
                category: FailureCategory::Generic,
                status: None,
                detail,
            },
        }
    }
}
