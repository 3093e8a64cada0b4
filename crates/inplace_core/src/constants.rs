//! Shared constants used across inplace crates.

/// Default port for the reference persistence endpoint.
pub const DEFAULT_PORT: u16 = 38480;

/// Default maximum request body accepted by the endpoint.
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Default endpoint URL used by the CLI.
pub const DEFAULT_CLI_ENDPOINT_URL: &str = "http://localhost:38480/api/save";

/// Text shown in an anchor whose display value is empty.
pub const DEFAULT_EMPTY_TEXT: &str = "Empty";

/// Display string for password fields, independent of the stored value.
pub const PASSWORD_MASK: &str = "******";

/// Default row count for the rich-text region.
pub const DEFAULT_RICH_TEXT_ROWS: u32 = 7;

/// Ticks a blur-triggered submit waits before firing.
pub const BLUR_SUBMIT_DEBOUNCE_TICKS: u64 = 2;

/// Ticks between render and focus activation.
pub const ACTIVATE_DELAY_TICKS: u64 = 1;

/// Default maximum text length for sanitized rich text (warning only).
pub const DEFAULT_MAX_RICH_TEXT_LENGTH: usize = 64 * 1024;

/// Success notification body used when the endpoint sends no message.
pub const DEFAULT_SAVE_MESSAGE: &str = "Changes saved successfully";

/// Inline message used when the endpoint reports an error without a message.
pub const DEFAULT_APPLICATION_ERROR: &str = "Unknown error occurred";
