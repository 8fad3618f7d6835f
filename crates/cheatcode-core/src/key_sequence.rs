#![forbid(unsafe_code)]

//! Rolling key buffer with an inactivity reset.
//!
//! # Design
//!
//! ## Invariants
//! 1. `len() <= capacity` at all times; the oldest token is evicted first.
//! 2. A gap of at least `inactivity_timeout` between two keystrokes empties
//!    the buffer before the second keystroke is appended.
//! 3. Clearing an empty buffer is a no-op, so a match-triggered clear racing
//!    an expiry is harmless.
//!
//! ## Time
//! The host supplies a monotonic `now` (time since page load). Nothing here
//! reads a clock, which keeps every transition reproducible in tests.
//!
//! # Example
//!
//! ```
//! use cheatcode_core::key_sequence::{SequenceBuffer, SequenceConfig};
//! use std::time::Duration;
//!
//! let mut buffer = SequenceBuffer::new(SequenceConfig::default());
//! buffer.feed("d", Duration::ZERO);
//! buffer.feed("e", Duration::from_millis(100));
//! assert_eq!(buffer.joined(), "de");
//!
//! // A long pause resets the buffer before the next key lands.
//! buffer.feed("v", Duration::from_secs(60));
//! assert_eq!(buffer.joined(), "v");
//! ```

use std::collections::VecDeque;
use std::time::Duration;

/// Default buffer capacity in tokens.
pub const DEFAULT_CAPACITY: usize = 50;

/// Default inactivity window.
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_millis(5000);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the rolling buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceConfig {
    /// Maximum number of tokens kept (default: 50). Zero is treated as one.
    pub capacity: usize,

    /// Pause after which the buffer is discarded (default: 5s).
    pub inactivity_timeout: Duration,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
        }
    }
}

impl SequenceConfig {
    /// Create a config with a custom timeout.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            inactivity_timeout: timeout,
            ..Default::default()
        }
    }

    /// Override the capacity.
    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

/// Normalize a DOM `key` value into a buffer token.
///
/// Returns `None` for an empty key.
#[must_use]
pub fn normalize_token(key: &str) -> Option<String> {
    if key.is_empty() {
        None
    } else {
        Some(key.to_lowercase())
    }
}

// ---------------------------------------------------------------------------
// SequenceBuffer
// ---------------------------------------------------------------------------

/// Bounded FIFO of recent key tokens.
#[derive(Clone)]
pub struct SequenceBuffer {
    config: SequenceConfig,
    tokens: VecDeque<String>,
    last_input: Option<Duration>,
}

impl std::fmt::Debug for SequenceBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Token contents stay out of logs; they may be a secret in progress.
        f.debug_struct("SequenceBuffer")
            .field("len", &self.tokens.len())
            .field("capacity", &self.capacity())
            .field("last_input", &self.last_input)
            .finish()
    }
}

impl SequenceBuffer {
    #[must_use]
    pub fn new(config: SequenceConfig) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            config,
            tokens: VecDeque::with_capacity(capacity),
            last_input: None,
        }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(SequenceConfig::default())
    }

    /// Effective capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.config.capacity.max(1)
    }

    /// Append a token at time `now`.
    ///
    /// Returns `true` if the inactivity window had elapsed and the previous
    /// contents were discarded first.
    pub fn feed(&mut self, token: &str, now: Duration) -> bool {
        let expired = self.expire(now);
        self.tokens.push_back(token.to_owned());
        while self.tokens.len() > self.capacity() {
            self.tokens.pop_front();
        }
        self.last_input = Some(now);
        expired
    }

    /// Discard the contents if the inactivity window has elapsed.
    pub fn expire(&mut self, now: Duration) -> bool {
        match self.last_input {
            Some(last) if now.saturating_sub(last) >= self.config.inactivity_timeout => {
                self.clear();
                true
            }
            _ => false,
        }
    }

    /// Empty the buffer.
    pub fn clear(&mut self) {
        self.tokens.clear();
        self.last_input = None;
    }

    /// When the current contents will expire, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.last_input
            .map(|last| last.saturating_add(self.config.inactivity_timeout))
    }

    /// Time remaining before expiry.
    #[must_use]
    pub fn time_until_timeout(&self, now: Duration) -> Option<Duration> {
        self.deadline().map(|deadline| deadline.saturating_sub(now))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens, oldest first.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    /// The buffer read as one string.
    #[must_use]
    pub fn joined(&self) -> String {
        self.tokens.iter().map(String::as_str).collect()
    }

    /// Suffixes taken at token boundaries, longest first.
    ///
    /// Each item yields the tokens of one suffix in order.
    pub fn suffixes(&self) -> impl Iterator<Item = impl Iterator<Item = &str>> {
        (0..self.tokens.len()).map(move |start| self.tokens.range(start..).map(String::as_str))
    }

    #[must_use]
    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MS_100: Duration = Duration::from_millis(100);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn feed_str(buffer: &mut SequenceBuffer, text: &str, start: Duration) -> Duration {
        let mut t = start;
        for c in text.chars() {
            buffer.feed(&c.to_string(), t);
            t += MS_100;
        }
        t
    }

    #[test]
    fn default_config_values() {
        let config = SequenceConfig::default();
        assert_eq!(config.capacity, 50);
        assert_eq!(config.inactivity_timeout, ms(5000));
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut buffer = SequenceBuffer::new(SequenceConfig::default().capacity(3));
        feed_str(&mut buffer, "abcde", Duration::ZERO);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.joined(), "cde");
    }

    #[test]
    fn sixty_keys_keep_last_fifty() {
        let mut buffer = SequenceBuffer::with_defaults();
        for i in 0..60u64 {
            buffer.feed(&format!("k{i}"), ms(i * 10));
        }
        assert_eq!(buffer.len(), 50);
        let tokens: Vec<_> = buffer.tokens().collect();
        assert_eq!(tokens.first().copied(), Some("k10"));
        assert_eq!(tokens.last().copied(), Some("k59"));
    }

    #[test]
    fn pause_resets_before_append() {
        let mut buffer = SequenceBuffer::with_defaults();
        let t = feed_str(&mut buffer, "dev", Duration::ZERO);
        let expired = buffer.feed("m", t + ms(6000));
        assert!(expired);
        assert_eq!(buffer.joined(), "m");
    }

    #[test]
    fn pause_just_under_timeout_keeps_contents() {
        let mut buffer = SequenceBuffer::with_defaults();
        buffer.feed("a", Duration::ZERO);
        assert!(!buffer.feed("b", ms(4999)));
        assert_eq!(buffer.joined(), "ab");
    }

    #[test]
    fn timeout_measured_from_last_key() {
        let mut buffer = SequenceBuffer::new(SequenceConfig::with_timeout(ms(1000)));
        buffer.feed("a", Duration::ZERO);
        buffer.feed("b", ms(900));
        assert!(!buffer.expire(ms(1800)));
        assert!(buffer.expire(ms(1900)));
        assert!(buffer.is_empty());
    }

    #[test]
    fn expire_on_empty_is_noop() {
        let mut buffer = SequenceBuffer::with_defaults();
        assert!(!buffer.expire(ms(100_000)));
        buffer.clear();
        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn deadline_tracks_last_input() {
        let mut buffer = SequenceBuffer::new(SequenceConfig::with_timeout(ms(2500)));
        assert_eq!(buffer.deadline(), None);
        buffer.feed("x", ms(1000));
        assert_eq!(buffer.deadline(), Some(ms(3500)));
        assert_eq!(buffer.time_until_timeout(ms(3000)), Some(ms(500)));
        assert_eq!(buffer.time_until_timeout(ms(9000)), Some(Duration::ZERO));
        buffer.clear();
        assert_eq!(buffer.deadline(), None);
    }

    #[test]
    fn suffixes_longest_first() {
        let mut buffer = SequenceBuffer::with_defaults();
        feed_str(&mut buffer, "abc", Duration::ZERO);
        let suffixes: Vec<String> = buffer.suffixes().map(|s| s.collect()).collect();
        assert_eq!(suffixes, vec!["abc", "bc", "c"]);
    }

    #[test]
    fn zero_capacity_behaves_as_one() {
        let mut buffer = SequenceBuffer::new(SequenceConfig::default().capacity(0));
        feed_str(&mut buffer, "xyz", Duration::ZERO);
        assert_eq!(buffer.joined(), "z");
    }

    #[test]
    fn normalize_lowercases() {
        assert_eq!(normalize_token("ArrowUp").as_deref(), Some("arrowup"));
        assert_eq!(normalize_token("B").as_deref(), Some("b"));
        assert_eq!(normalize_token(""), None);
    }

    #[test]
    fn debug_hides_tokens() {
        let mut buffer = SequenceBuffer::with_defaults();
        buffer.feed("secret", Duration::ZERO);
        let dbg = format!("{buffer:?}");
        assert!(dbg.contains("SequenceBuffer"));
        assert!(!dbg.contains("secret"));
    }
}
