//! Notification types surfaced to the view layer.

use serde::{Deserialize, Serialize};

/// Notification severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Success,
    Error,
    Warning,
    Info,
}

impl NotificationType {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationType::Success => "success",
            NotificationType::Error => "error",
            NotificationType::Warning => "warning",
            NotificationType::Info => "info",
        }
    }
}

/// A transient notice (toast) or, with `requires_ack`, a blocking dialog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Severity
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    /// Short title
    pub title: String,
    /// Body text
    pub message: String,
    /// Whether the user must dismiss it explicitly
    pub requires_ack: bool,
    /// Timestamp in milliseconds
    pub timestamp: i64,
}

impl Notification {
    pub fn new(notification_type: NotificationType, title: &str, message: impl Into<String>) -> Self {
        Self {
            notification_type,
            title: title.to_string(),
            message: message.into(),
            requires_ack: false,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn success(title: &str, message: impl Into<String>) -> Self {
        Self::new(NotificationType::Success, title, message)
    }

    pub fn info(title: &str, message: impl Into<String>) -> Self {
        Self::new(NotificationType::Info, title, message)
    }

    pub fn warning(title: &str, message: impl Into<String>) -> Self {
        Self::new(NotificationType::Warning, title, message)
    }

    pub fn error(title: &str, message: impl Into<String>) -> Self {
        Self::new(NotificationType::Error, title, message)
    }

    /// Turn this notice into one the user has to acknowledge.
    pub fn acknowledged(mut self) -> Self {
        self.requires_ack = true;
        self
    }
}
