#![forbid(unsafe_code)]

//! Notification channel.
//!
//! Notifications are fire-and-forget: the engine hands a [`Notification`] to
//! the host once and never learns whether anything displayed it.

use serde::{Deserialize, Serialize};

/// Toast severity, serialized as the lowercase `type` the UI layer expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Lenient parse; unknown names yield `None`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "info" => Some(Self::Info),
            "success" => Some(Self::Success),
            "warning" | "warn" => Some(Self::Warning),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// A single message for the toast layer.
///
/// Serializes to the `{ "message": ..., "type": ... }` event detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    #[serde(rename = "type")]
    pub severity: Severity,
}

impl Notification {
    #[must_use]
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Info)
    }

    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Success)
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Warning)
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Error)
    }

    /// JSON event detail for the host's broadcast.
    #[must_use]
    pub fn to_detail_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

/// Sink for notifications.
pub trait Notifier {
    /// Broadcast once. Must not fail.
    fn notify(&mut self, notification: &Notification);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_uses_type_key() {
        let n = Notification::success("👨‍💻 Developer Mode: ON");
        let value: serde_json::Value = serde_json::from_str(&n.to_detail_json()).unwrap();
        assert_eq!(value["type"], "success");
        assert_eq!(value["message"], "👨‍💻 Developer Mode: ON");
    }

    #[test]
    fn severity_parse_is_lenient() {
        assert_eq!(Severity::parse("WARNING"), Some(Severity::Warning));
        assert_eq!(Severity::parse(" error "), Some(Severity::Error));
        assert_eq!(Severity::parse("loud"), None);
    }

    #[test]
    fn severity_names_round_trip() {
        for s in [
            Severity::Info,
            Severity::Success,
            Severity::Warning,
            Severity::Error,
        ] {
            assert_eq!(Severity::parse(s.as_str()), Some(s));
        }
    }
}
