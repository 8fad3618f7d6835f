#![forbid(unsafe_code)]

//! WASM frontend for the hidden-command engine.
//!
//! Binds [`cheatcode_core::Engine`] to a browser page: `keydown` listener,
//! `localStorage` persistence, DOM effects, `show-toast` events, and `fetch`
//! redemptions. Load it from a page script and call
//! `CheatEngineWeb.install(options)` once.

#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod net;
#[cfg(target_arch = "wasm32")]
mod tickers;
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::CheatEngineWeb;

use cheatcode_core::{ConfigError, EngineConfig};

/// Build the engine configuration from the JSON form of `install`'s options.
///
/// `None`, `"null"`, and `"undefined"` all mean defaults.
pub fn config_from_options(options: Option<&str>) -> Result<EngineConfig, ConfigError> {
    match options.map(str::trim) {
        None | Some("" | "null" | "undefined") => Ok(EngineConfig::default()),
        Some(json) => EngineConfig::from_json(json),
    }
}

/// Native builds compile this crate as a stub so workspace checks stay green
/// on non-wasm targets.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Default)]
pub struct CheatEngineWeb;

#[cfg(not(target_arch = "wasm32"))]
impl CheatEngineWeb {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn missing_options_use_defaults() {
        for options in [None, Some(""), Some("null"), Some(" undefined ")] {
            assert_eq!(config_from_options(options).ok(), Some(EngineConfig::default()));
        }
    }

    #[test]
    fn options_override_defaults() {
        let config = config_from_options(Some(r#"{"inactivity_timeout_ms": 3000}"#)).unwrap();
        assert_eq!(config.sequence.inactivity_timeout, Duration::from_secs(3));
    }

    #[test]
    fn bad_options_are_reported() {
        assert!(config_from_options(Some("{nope")).is_err());
    }
}
