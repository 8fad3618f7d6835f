#![forbid(unsafe_code)]

//! Hidden-command engine: watches keystrokes for typed commands and applies
//! the visual effects, redirects, and server-granted rewards they unlock.
//!
//! The crate is host-agnostic. A page host implements [`host::PageHost`] and
//! [`persistence::KeyValueStore`], pushes keystrokes and timestamps into an
//! [`engine::Engine`], and performs the HTTP redemptions the engine queues.
//! [`headless`] provides in-memory hosts for tests and tooling.

pub mod bootstrap;
pub mod config;
pub mod digest;
pub mod effect;
pub mod engine;
pub mod headless;
pub mod host;
pub mod key_sequence;
pub mod logging;
pub mod notify;
pub mod persistence;
pub mod redeem;
pub mod schedule;
pub mod trigger;

pub use config::{ConfigError, EngineConfig, RedemptionConfig};
pub use effect::{Season, Surface, ToggleEffect};
pub use engine::{Engine, KeyOutcome};
pub use host::PageHost;
pub use notify::{Notification, Notifier, Severity};
pub use persistence::{KeyValueStore, StorageError};
pub use redeem::{RedemptionClient, RedemptionRequest, RedemptionResult};
pub use trigger::CheatId;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, error, info, trace, warn};
