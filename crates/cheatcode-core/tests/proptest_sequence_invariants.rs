//! Property-based invariant tests for key buffering and matching.
//!
//! Verifies:
//! 1. Buffer length never exceeds capacity
//! 2. Buffer holds exactly the last `capacity` tokens when keys arrive quickly
//! 3. A pause of at least the timeout empties the buffer before the next key
//! 4. Digests are deterministic and 64 lowercase hex characters
//! 5. Distinct inputs produce distinct digests
//! 6. Matches on random lowercase input are sound: a public match ends with
//!    its keyword, a secret match ends with a known plaintext
//! 7. Persisted flags read back as set
//! 8. Any input ending in a toggle keyword flips that toggle's persisted
//!    state, and the page shows the new state

use std::time::Duration;

use cheatcode_core::digest::{DIGEST_HEX_LEN, SequenceDigest, digest_hex};
use cheatcode_core::headless::HeadlessPage;
use cheatcode_core::key_sequence::{SequenceBuffer, SequenceConfig};
use cheatcode_core::persistence::{MemoryStore, Persistence};
use cheatcode_core::trigger::{MatchOutcome, Matcher, TriggerTable, public_triggers};
use cheatcode_core::{Engine, EngineConfig, KeyOutcome, ToggleEffect};
use proptest::prelude::*;

// ── Strategy helpers ──────────────────────────────────────────────────

fn arb_token() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z0-9]".prop_map(String::from),
        Just("arrowup".to_owned()),
        Just("arrowdown".to_owned()),
        Just("enter".to_owned()),
    ]
}

fn arb_tokens(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_token(), 0..max)
}

fn fast_config(capacity: usize) -> SequenceConfig {
    SequenceConfig::with_timeout(Duration::from_secs(5)).capacity(capacity)
}

// ── 1. Capacity bound ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn buffer_never_exceeds_capacity(
        capacity in 1usize..64,
        tokens in arb_tokens(200),
    ) {
        let mut buffer = SequenceBuffer::new(fast_config(capacity));
        for (i, token) in tokens.iter().enumerate() {
            buffer.feed(token, Duration::from_millis(i as u64 * 10));
            prop_assert!(buffer.len() <= capacity);
        }
    }
}

// ── 2. FIFO eviction ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn buffer_keeps_last_capacity_tokens(
        capacity in 1usize..64,
        tokens in arb_tokens(200),
    ) {
        let mut buffer = SequenceBuffer::new(fast_config(capacity));
        for (i, token) in tokens.iter().enumerate() {
            buffer.feed(token, Duration::from_millis(i as u64 * 10));
        }
        let start = tokens.len().saturating_sub(capacity);
        let expected: Vec<&str> = tokens[start..].iter().map(String::as_str).collect();
        let actual: Vec<&str> = buffer.tokens().collect();
        prop_assert_eq!(actual, expected);
    }
}

// ── 3. Inactivity reset ───────────────────────────────────────────────

proptest! {
    #[test]
    fn pause_resets_buffer(
        before in arb_tokens(20),
        gap_ms in 5000u64..60_000,
        token in arb_token(),
    ) {
        let mut buffer = SequenceBuffer::new(SequenceConfig::default());
        let mut now = Duration::ZERO;
        for t in &before {
            buffer.feed(t, now);
            now += Duration::from_millis(10);
        }
        let last = now.saturating_sub(Duration::from_millis(10));
        buffer.feed(&token, last + Duration::from_millis(gap_ms));
        let actual: Vec<&str> = buffer.tokens().collect();
        prop_assert_eq!(actual, vec![token.as_str()]);
    }
}

// ── 4 & 5. Digest properties ─────────────────────────────────────────

proptest! {
    #[test]
    fn digest_is_deterministic_hex(input in ".{0,64}") {
        let a = digest_hex(&input);
        let b = digest_hex(&input);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.len(), DIGEST_HEX_LEN);
        prop_assert!(a.bytes().all(|c| matches!(c, b'0'..=b'9' | b'a'..=b'f')));
    }

    #[test]
    fn distinct_inputs_distinct_digests(a in "[a-z]{1,16}", b in "[a-z]{1,16}") {
        prop_assume!(a != b);
        prop_assert_ne!(SequenceDigest::of(&a), SequenceDigest::of(&b));
    }

    #[test]
    fn parts_digest_equals_joined_digest(parts in prop::collection::vec("[a-z]{1,8}", 1..8)) {
        let joined = parts.concat();
        prop_assert_eq!(
            SequenceDigest::of_parts(parts.iter().map(String::as_str)),
            SequenceDigest::of(&joined)
        );
    }
}

// ── 6. Match soundness ────────────────────────────────────────────────

/// Plaintexts behind the built-in secret digests other than the Konami code.
const KNOWN_SECRETS: [&str; 2] = ["idkfa", "iddqd"];

proptest! {
    #[test]
    fn matches_on_letter_noise_are_sound(noise in "[a-z]{1,50}") {
        let matcher = Matcher::new(public_triggers(false), TriggerTable::builtin());
        let mut buffer = SequenceBuffer::with_defaults();
        for (i, c) in noise.chars().enumerate() {
            buffer.feed(&c.to_string(), Duration::from_millis(i as u64));
            let joined = buffer.joined();
            match matcher.evaluate(&buffer) {
                Some(MatchOutcome::Public(trigger)) => {
                    prop_assert!(joined.ends_with(trigger.keyword));
                    buffer.clear();
                }
                Some(MatchOutcome::Secret(id)) => {
                    prop_assert!(
                        KNOWN_SECRETS.iter().any(|s| joined.ends_with(s)),
                        "secret {} matched on {:?}",
                        id,
                        joined
                    );
                    buffer.clear();
                }
                None => {}
            }
        }
    }
}

// ── 7. Persistence round trip ─────────────────────────────────────────

proptest! {
    #[test]
    fn flags_read_back(flags in prop::collection::vec(any::<bool>(), ToggleEffect::ALL.len())) {
        let mut p = Persistence::new(MemoryStore::new());
        for (effect, on) in ToggleEffect::ALL.into_iter().zip(&flags) {
            p.save_flag(effect.key(), *on);
        }
        for (effect, on) in ToggleEffect::ALL.into_iter().zip(&flags) {
            prop_assert_eq!(p.is_active(effect.key()), *on);
        }
    }
}

// ── 8. Toggle keywords flip state ─────────────────────────────────────

fn arb_toggle() -> impl Strategy<Value = ToggleEffect> {
    prop::sample::select(ToggleEffect::ALL.to_vec())
}

proptest! {
    #[test]
    fn toggle_keyword_flips_persisted_state(
        // Digits and q/x/z never complete a keyword, alone or joined to one.
        prefix in "[0-9qxz]{0,20}",
        effect in arb_toggle(),
        seeded in prop::collection::vec(any::<bool>(), ToggleEffect::ALL.len()),
    ) {
        let mut store = MemoryStore::new();
        for (e, on) in ToggleEffect::ALL.into_iter().zip(&seeded) {
            if *on {
                store.insert_raw(format!("cheat_state_{}", e.key()), "true");
            }
        }
        let mut engine = Engine::new(EngineConfig::default(), store, HeadlessPage::new());

        let mut now = Duration::ZERO;
        for round in 0..2 {
            let before = engine.persistence().is_active(effect.key());
            let mut last = KeyOutcome::Ignored;
            for c in prefix.chars().chain(effect.key().chars()) {
                last = engine.on_key_down(&c.to_string(), now);
                now += Duration::from_millis(10);
            }
            prop_assert_eq!(last, KeyOutcome::Public(effect.key()), "round {}", round);
            let after = engine.persistence().is_active(effect.key());
            prop_assert_eq!(after, !before);
            prop_assert_eq!(engine.registry().is_rendered(effect), after);
        }
    }
}
