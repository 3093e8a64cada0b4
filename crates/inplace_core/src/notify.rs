//! User-facing notifications outside the form.

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Toast-style notification sink.
///
/// Used for save confirmations and as the fallback when a failure cannot be
/// shown in a form.
pub trait Notifier {
    fn notify(&self, level: NoticeLevel, title: &str, message: &str);
}

/// Default notifier that writes notices to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NoticeLevel, title: &str, message: &str) {
        match level {
            NoticeLevel::Success => tracing::info!("{}: {}", title, message),
            NoticeLevel::Error => tracing::warn!("{}: {}", title, message),
        }
    }
}
