#![forbid(unsafe_code)]

//! Engine configuration.
//!
//! Defaults match the production page. Hosts may override individual fields
//! from a JSON object via [`EngineConfig::from_json`]; durations are given in
//! milliseconds and unknown keys are rejected.
//!
//! ```
//! use cheatcode_core::config::EngineConfig;
//! use std::time::Duration;
//!
//! let config = EngineConfig::from_json(r#"{"inactivity_timeout_ms": 2500}"#).unwrap();
//! assert_eq!(config.sequence.inactivity_timeout, Duration::from_millis(2500));
//! assert_eq!(config.sequence.capacity, 50);
//! ```

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::key_sequence::SequenceConfig;
use crate::persistence::DEFAULT_PREFIX;

pub const DEFAULT_VERIFY_ENDPOINT: &str = "/api/verify-cheat/";
pub const DEFAULT_LEGACY_ENDPOINT: &str = "/api/cheat-code/";
pub const DEFAULT_CSRF_COOKIE: &str = "csrftoken";
pub const DEFAULT_CSRF_HEADER: &str = "X-CSRFToken";

/// Errors parsing configuration overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Overrides were not valid JSON for the expected shape.
    Parse(String),
    /// A value parsed but is out of range.
    Invalid { field: &'static str, reason: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "invalid engine options: {msg}"),
            Self::Invalid { field, reason } => write!(f, "invalid {field}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Endpoints and anti-forgery settings for the redemption client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionConfig {
    /// Verification endpoint (default: `/api/verify-cheat/`).
    pub verify_endpoint: String,
    /// Legacy coupon endpoint (default: `/api/cheat-code/`).
    pub legacy_endpoint: String,
    /// Cookie holding the anti-forgery token (default: `csrftoken`).
    pub csrf_cookie: String,
    /// Header carrying the token (default: `X-CSRFToken`).
    pub csrf_header: String,
}

impl Default for RedemptionConfig {
    fn default() -> Self {
        Self {
            verify_endpoint: DEFAULT_VERIFY_ENDPOINT.to_owned(),
            legacy_endpoint: DEFAULT_LEGACY_ENDPOINT.to_owned(),
            csrf_cookie: DEFAULT_CSRF_COOKIE.to_owned(),
            csrf_header: DEFAULT_CSRF_HEADER.to_owned(),
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub sequence: SequenceConfig,
    /// Storage key prefix (default: `cheat_state_`).
    pub storage_prefix: String,
    pub redemption: RedemptionConfig,
    /// Pause between a redirect notification and navigation (default: 1s).
    pub redirect_delay: Duration,
    /// Pause between a season reset notification and reload (default: 1s).
    pub reload_delay: Duration,
    /// How long the god-mode rotation lasts (default: 2s).
    pub godmode_duration: Duration,
    /// Treat the plaintext Konami code as a public trigger hitting the legacy
    /// coupon endpoint (default: false).
    pub legacy_konami: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sequence: SequenceConfig::default(),
            storage_prefix: DEFAULT_PREFIX.to_owned(),
            redemption: RedemptionConfig::default(),
            redirect_delay: Duration::from_millis(1000),
            reload_delay: Duration::from_millis(1000),
            godmode_duration: Duration::from_millis(2000),
            legacy_konami: false,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.sequence.inactivity_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.sequence.capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.redirect_delay = delay;
        self
    }

    #[must_use]
    pub fn with_legacy_konami(mut self, enabled: bool) -> Self {
        self.legacy_konami = enabled;
        self
    }

    /// Defaults with `json` overrides applied.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_json(json)?;
        Ok(config)
    }

    /// Apply a JSON object of overrides. An empty string is no overrides.
    pub fn apply_json(&mut self, json: &str) -> Result<(), ConfigError> {
        if json.trim().is_empty() {
            return Ok(());
        }
        let overrides: Overrides =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        overrides.apply(self)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Overrides {
    capacity: Option<usize>,
    inactivity_timeout_ms: Option<u64>,
    storage_prefix: Option<String>,
    verify_endpoint: Option<String>,
    legacy_endpoint: Option<String>,
    csrf_cookie: Option<String>,
    csrf_header: Option<String>,
    redirect_delay_ms: Option<u64>,
    reload_delay_ms: Option<u64>,
    godmode_duration_ms: Option<u64>,
    legacy_konami: Option<bool>,
}

impl Overrides {
    fn apply(self, config: &mut EngineConfig) -> Result<(), ConfigError> {
        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return Err(ConfigError::Invalid {
                    field: "capacity",
                    reason: "must be at least 1",
                });
            }
            config.sequence.capacity = capacity;
        }
        if let Some(ms) = self.inactivity_timeout_ms {
            if ms == 0 {
                return Err(ConfigError::Invalid {
                    field: "inactivity_timeout_ms",
                    reason: "must be positive",
                });
            }
            config.sequence.inactivity_timeout = Duration::from_millis(ms);
        }
        if let Some(prefix) = self.storage_prefix {
            config.storage_prefix = prefix;
        }
        if let Some(v) = self.verify_endpoint {
            config.redemption.verify_endpoint = v;
        }
        if let Some(v) = self.legacy_endpoint {
            config.redemption.legacy_endpoint = v;
        }
        if let Some(v) = self.csrf_cookie {
            config.redemption.csrf_cookie = v;
        }
        if let Some(v) = self.csrf_header {
            config.redemption.csrf_header = v;
        }
        if let Some(ms) = self.redirect_delay_ms {
            config.redirect_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.reload_delay_ms {
            config.reload_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.godmode_duration_ms {
            config.godmode_duration = Duration::from_millis(ms);
        }
        if let Some(enabled) = self.legacy_konami {
            config.legacy_konami = enabled;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.sequence.capacity, 50);
        assert_eq!(config.storage_prefix, "cheat_state_");
        assert_eq!(config.redemption.verify_endpoint, "/api/verify-cheat/");
        assert_eq!(config.redemption.csrf_header, "X-CSRFToken");
        assert!(!config.legacy_konami);
    }

    #[test]
    fn empty_overrides_keep_defaults() {
        assert_eq!(EngineConfig::from_json("").unwrap(), EngineConfig::default());
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn overrides_apply() {
        let config = EngineConfig::from_json(
            r#"{"capacity": 20, "redirect_delay_ms": 500, "legacy_konami": true, "csrf_cookie": "xsrf"}"#,
        )
        .unwrap();
        assert_eq!(config.sequence.capacity, 20);
        assert_eq!(config.redirect_delay, Duration::from_millis(500));
        assert!(config.legacy_konami);
        assert_eq!(config.redemption.csrf_cookie, "xsrf");
    }

    #[test]
    fn unknown_field_rejected() {
        let err = EngineConfig::from_json(r#"{"capacty": 20}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_capacity_rejected() {
        let err = EngineConfig::from_json(r#"{"capacity": 0}"#).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                field: "capacity",
                reason: "must be at least 1"
            }
        );
    }

    #[test]
    fn builders() {
        let config = EngineConfig::default()
            .with_timeout(Duration::from_millis(2500))
            .with_capacity(10)
            .with_legacy_konami(true);
        assert_eq!(config.sequence.inactivity_timeout, Duration::from_millis(2500));
        assert_eq!(config.sequence.capacity, 10);
        assert!(config.legacy_konami);
    }
}
