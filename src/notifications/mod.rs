// src/notifications/mod.rs

//! Notification sink.
//!
//! Build steps report user-facing messages ("CSS build completed.",
//! "JSON data build error.") through a [`Notifier`]. The production sink
//! fans out to the log and, when enabled, to desktop notifications.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info};

pub mod desktop;

pub use desktop::DesktopNotifier;

/// Title used for informational notifications.
pub const INFO_TITLE: &str = "assetdag notification";
/// Title used for error notifications.
pub const ERROR_TITLE: &str = "Error running assetdag";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub message: String,
    /// Whether the desktop notification should play a sound.
    pub sound: bool,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            title: INFO_TITLE.to_string(),
            message: message.into(),
            sound: false,
        }
    }

    /// Error notifications always play a sound.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            title: ERROR_TITLE.to_string(),
            message: message.into(),
            sound: true,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.title, self.message)
    }
}

/// Destination for notifications.
///
/// Implementations must not block: steps call this inline.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Writes notifications to the tracing log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) {
        match notification.severity {
            Severity::Info => info!(title = %notification.title, "{}", notification.message),
            Severity::Error => error!(title = %notification.title, "{}", notification.message),
        }
    }
}

/// Fans every notification out to each registered notifier.
#[derive(Clone, Default)]
pub struct NotificationSink {
    targets: Vec<Arc<dyn Notifier>>,
}

impl fmt::Debug for NotificationSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationSink")
            .field("targets", &self.targets.len())
            .finish()
    }
}

impl NotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, target: Arc<dyn Notifier>) -> Self {
        self.targets.push(target);
        self
    }

    /// Log sink, plus desktop notifications when `desktop` is set.
    pub fn standard(desktop: bool) -> Self {
        let sink = Self::new().with(Arc::new(LogNotifier));
        if desktop {
            sink.with(Arc::new(DesktopNotifier::detect()))
        } else {
            sink
        }
    }
}

impl Notifier for NotificationSink {
    fn notify(&self, notification: &Notification) {
        for target in &self.targets {
            target.notify(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_notifications_carry_title_and_sound() {
        let n = Notification::error("JavaScript build error.");
        assert_eq!(n.title, ERROR_TITLE);
        assert!(n.sound);
        assert!(n.is_error());

        let n = Notification::info("Build completed.");
        assert_eq!(n.title, INFO_TITLE);
        assert!(!n.sound);
        assert_eq!(n.to_string(), "[assetdag notification] Build completed.");
    }
}
