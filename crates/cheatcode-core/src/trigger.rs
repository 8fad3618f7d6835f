#![forbid(unsafe_code)]

//! Trigger vocabularies and the two-tier matcher.
//!
//! Public triggers are plaintext keywords matched as a suffix of the joined
//! buffer. Secret triggers are known only by digest: every token-boundary
//! suffix of the buffer is hashed and looked up in the [`TriggerTable`].
//!
//! Public keywords are tested longest first (ties keep declaration order), so
//! a short keyword never pre-empts a longer one ending on the same keystroke.
//! Secret suffixes are likewise tried longest first.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::digest::SequenceDigest;
use crate::effect::{Season, ToggleEffect};
use crate::key_sequence::SequenceBuffer;
use crate::notify::Severity;

/// Joined form of the Konami code as typed with DOM key names.
pub const KONAMI_SEQUENCE: &str =
    "arrowuparrowuparrowdownarrowdownarrowleftarrowrightarrowleftarrowrightba";

/// Keyword that clears the seasonal override.
pub const SEASON_RESET_KEYWORD: &str = "seasonpass";

/// Digest → id pairs the client ships with. Plaintexts live server-side only.
const SECRET_TRIGGERS: &[(&str, u32)] = &[
    (
        "11bed8fcf4e2ac623a2b8316a9139c706e82d4555def911171281f98a24306de",
        101,
    ),
    (
        "527aee4e3b96dc5928ee45348c11c6f87f67bae2530fc20ea0b4463a1a8658d0",
        102,
    ),
    (
        "6c58bc00fea09c8d7fdb97c7b58741ad37bd7ba8e5c76d35076e3b57071b172b",
        103,
    ),
];

// ---------------------------------------------------------------------------
// CheatId
// ---------------------------------------------------------------------------

/// Opaque identifier the verifier understands in place of a plaintext secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheatId(pub u32);

impl fmt::Display for CheatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Public vocabulary
// ---------------------------------------------------------------------------

/// A navigation shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redirect {
    pub url: &'static str,
    pub message: &'static str,
    pub severity: Severity,
}

/// What a public trigger does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicAction {
    Toggle(ToggleEffect),
    Season(Season),
    SeasonReset,
    Redirect(Redirect),
    /// Plaintext Konami code redeemed through the legacy coupon endpoint.
    LegacyCoupon,
}

/// A plaintext keyword and its action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicTrigger {
    pub keyword: &'static str,
    pub action: PublicAction,
}

const REDIRECTS: &[(&str, Redirect)] = &[
    ("loot", Redirect { url: "/cart/", message: "💰 Opening Inventory...", severity: Severity::Success }),
    ("shop", Redirect { url: "/products/", message: "🛡️ Visiting Armory...", severity: Severity::Info }),
    ("home", Redirect { url: "/", message: "🏠 Teleporting to Hub...", severity: Severity::Info }),
    ("login", Redirect { url: "/accounts/login/", message: "🔑 Access Protocol Initiated", severity: Severity::Warning }),
    ("team", Redirect { url: "/about/", message: "👥 Loading Guild Roster...", severity: Severity::Info }),
    ("ban", Redirect { url: "/system/glitch/403/", message: "⛔ ACCESS DENIED.", severity: Severity::Error }),
    ("lost", Redirect { url: "/system/glitch/404/", message: "🗺️ Signal Lost.", severity: Severity::Warning }),
    ("crash", Redirect { url: "/system/glitch/500/", message: "🔥 CRITICAL SYSTEM FAILURE", severity: Severity::Error }),
];

/// Build the public vocabulary, sorted longest keyword first.
#[must_use]
pub fn public_triggers(legacy_konami: bool) -> Vec<PublicTrigger> {
    let mut triggers = Vec::with_capacity(ToggleEffect::ALL.len() + Season::ALL.len() + REDIRECTS.len() + 2);

    for effect in ToggleEffect::ALL {
        triggers.push(PublicTrigger {
            keyword: effect.key(),
            action: PublicAction::Toggle(effect),
        });
    }
    for season in Season::ALL {
        triggers.push(PublicTrigger {
            keyword: season.key(),
            action: PublicAction::Season(season),
        });
    }
    triggers.push(PublicTrigger {
        keyword: SEASON_RESET_KEYWORD,
        action: PublicAction::SeasonReset,
    });
    if legacy_konami {
        triggers.push(PublicTrigger {
            keyword: KONAMI_SEQUENCE,
            action: PublicAction::LegacyCoupon,
        });
    }
    for (keyword, redirect) in REDIRECTS {
        triggers.push(PublicTrigger {
            keyword,
            action: PublicAction::Redirect(*redirect),
        });
    }

    // Stable sort keeps declaration order among equal lengths.
    triggers.sort_by(|a, b| b.keyword.len().cmp(&a.keyword.len()));
    triggers
}

// ---------------------------------------------------------------------------
// TriggerTable
// ---------------------------------------------------------------------------

/// Configuration defects in a secret table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerTableError {
    /// Entry is not a 64-character hex digest.
    MalformedDigest(String),
    /// Two entries share a digest.
    DuplicateDigest { digest: String, first: CheatId, second: CheatId },
}

impl fmt::Display for TriggerTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedDigest(d) => write!(f, "malformed digest: {d:?}"),
            Self::DuplicateDigest { digest, first, second } => {
                write!(f, "digest {digest} maps to both {first} and {second}")
            }
        }
    }
}

impl std::error::Error for TriggerTableError {}

/// Immutable digest → [`CheatId`] map.
#[derive(Debug, Clone, Default)]
pub struct TriggerTable {
    entries: HashMap<SequenceDigest, CheatId>,
}

impl TriggerTable {
    /// Build from `(hex digest, id)` pairs, rejecting malformed or duplicate digests.
    pub fn from_hex_pairs(pairs: &[(&str, u32)]) -> Result<Self, TriggerTableError> {
        let mut entries = HashMap::with_capacity(pairs.len());
        for &(hex_digest, id) in pairs {
            let digest = SequenceDigest::from_hex(hex_digest)
                .ok_or_else(|| TriggerTableError::MalformedDigest(hex_digest.to_owned()))?;
            if let Some(first) = entries.insert(digest, CheatId(id)) {
                return Err(TriggerTableError::DuplicateDigest {
                    digest: digest.to_hex(),
                    first,
                    second: CheatId(id),
                });
            }
        }
        Ok(Self { entries })
    }

    /// The table shipped with the client.
    ///
    /// A defective built-in table disables secret triggers rather than the page.
    #[must_use]
    pub fn builtin() -> Self {
        match Self::from_hex_pairs(SECRET_TRIGGERS) {
            Ok(table) => table,
            Err(err) => {
                crate::error!(error = %err, "built-in trigger table rejected");
                Self::default()
            }
        }
    }

    #[must_use]
    pub fn lookup(&self, digest: &SequenceDigest) -> Option<CheatId> {
        self.entries.get(digest).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<CheatId> {
        let mut ids: Vec<_> = self.entries.values().copied().collect();
        ids.sort();
        ids
    }
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

/// Result of evaluating the buffer after a keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Public(PublicTrigger),
    Secret(CheatId),
}

/// Public-then-secret matcher.
#[derive(Debug, Clone)]
pub struct Matcher {
    public: Vec<PublicTrigger>,
    secret: TriggerTable,
}

impl Matcher {
    /// `public` is re-sorted longest first.
    #[must_use]
    pub fn new(mut public: Vec<PublicTrigger>, secret: TriggerTable) -> Self {
        public.sort_by(|a, b| b.keyword.len().cmp(&a.keyword.len()));
        Self { public, secret }
    }

    /// First matching trigger, public tier before secret tier.
    #[must_use]
    pub fn evaluate(&self, buffer: &SequenceBuffer) -> Option<MatchOutcome> {
        if buffer.is_empty() {
            return None;
        }
        let joined = buffer.joined();
        if let Some(trigger) = self.public.iter().find(|t| joined.ends_with(t.keyword)) {
            return Some(MatchOutcome::Public(*trigger));
        }
        if self.secret.is_empty() {
            return None;
        }
        buffer
            .suffixes()
            .find_map(|suffix| self.secret.lookup(&SequenceDigest::of_parts(suffix)))
            .map(MatchOutcome::Secret)
    }

    #[must_use]
    pub fn public(&self) -> &[PublicTrigger] {
        &self.public
    }

    #[must_use]
    pub fn secret(&self) -> &TriggerTable {
        &self.secret
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::digest::digest_hex;

    fn buffer_of(tokens: &[&str]) -> SequenceBuffer {
        let mut buffer = SequenceBuffer::with_defaults();
        for (i, t) in tokens.iter().enumerate() {
            buffer.feed(t, Duration::from_millis(i as u64 * 50));
        }
        buffer
    }

    fn chars(text: &str) -> Vec<String> {
        text.chars().map(|c| c.to_string()).collect()
    }

    fn buffer_of_text(text: &str) -> SequenceBuffer {
        let tokens = chars(text);
        let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
        buffer_of(&refs)
    }

    fn konami_tokens() -> Vec<&'static str> {
        vec![
            "arrowup", "arrowup", "arrowdown", "arrowdown", "arrowleft", "arrowright",
            "arrowleft", "arrowright", "b", "a",
        ]
    }

    #[test]
    fn konami_keyword_is_the_typed_key_names() {
        assert_eq!(konami_tokens().concat(), KONAMI_SEQUENCE);
    }

    #[test]
    fn konami_secret_digest_tracks_keyword() {
        let table = TriggerTable::builtin();
        assert_eq!(table.lookup(&SequenceDigest::of(KONAMI_SEQUENCE)), Some(CheatId(101)));
    }

    #[test]
    fn builtin_table_is_valid() {
        let table = TriggerTable::from_hex_pairs(SECRET_TRIGGERS).unwrap();
        assert_eq!(table.len(), SECRET_TRIGGERS.len());
        assert_eq!(TriggerTable::builtin().ids(), vec![CheatId(101), CheatId(102), CheatId(103)]);
    }

    #[test]
    fn duplicate_digest_rejected() {
        let hex = digest_hex("same");
        let d = hex.as_str();
        let err = TriggerTable::from_hex_pairs(&[(d, 1), (d, 2)]).unwrap_err();
        assert!(matches!(
            err,
            TriggerTableError::DuplicateDigest { first: CheatId(1), second: CheatId(2), .. }
        ));
    }

    #[test]
    fn malformed_digest_rejected() {
        let err = TriggerTable::from_hex_pairs(&[("xyz", 1)]).unwrap_err();
        assert_eq!(err, TriggerTableError::MalformedDigest("xyz".into()));
    }

    #[test]
    fn public_sorted_longest_first() {
        let triggers = public_triggers(true);
        assert_eq!(triggers[0].keyword, KONAMI_SEQUENCE);
        for pair in triggers.windows(2) {
            assert!(pair[0].keyword.len() >= pair[1].keyword.len());
        }
    }

    #[test]
    fn public_keywords_are_unique() {
        let triggers = public_triggers(true);
        let mut keywords: Vec<_> = triggers.iter().map(|t| t.keyword).collect();
        keywords.sort_unstable();
        keywords.dedup();
        assert_eq!(keywords.len(), triggers.len());
    }

    #[test]
    fn public_suffix_match() {
        let matcher = Matcher::new(public_triggers(false), TriggerTable::builtin());
        let outcome = matcher.evaluate(&buffer_of_text("xxdevmode"));
        assert!(matches!(
            outcome,
            Some(MatchOutcome::Public(PublicTrigger { action: PublicAction::Toggle(ToggleEffect::DevMode), .. }))
        ));
    }

    #[test]
    fn longer_keyword_wins_over_shorter_suffix() {
        let public = vec![
            PublicTrigger { keyword: "pass", action: PublicAction::SeasonReset },
            PublicTrigger { keyword: "seasonpass", action: PublicAction::Season(Season::Fall) },
        ];
        let matcher = Matcher::new(public, TriggerTable::default());
        let outcome = matcher.evaluate(&buffer_of_text("seasonpass"));
        assert_eq!(
            outcome,
            Some(MatchOutcome::Public(PublicTrigger {
                keyword: "seasonpass",
                action: PublicAction::Season(Season::Fall),
            }))
        );
    }

    #[test]
    fn secret_match_on_token_suffix() {
        let matcher = Matcher::new(public_triggers(false), TriggerTable::builtin());
        let mut tokens = vec!["q", "shift"];
        tokens.extend(konami_tokens());
        assert_eq!(
            matcher.evaluate(&buffer_of(&tokens)),
            Some(MatchOutcome::Secret(CheatId(101)))
        );
    }

    #[test]
    fn secret_match_idkfa() {
        let matcher = Matcher::new(public_triggers(false), TriggerTable::builtin());
        assert_eq!(
            matcher.evaluate(&buffer_of_text("zzidkfa")),
            Some(MatchOutcome::Secret(CheatId(102)))
        );
    }

    #[test]
    fn legacy_konami_takes_public_path() {
        let matcher = Matcher::new(public_triggers(true), TriggerTable::builtin());
        assert!(matches!(
            matcher.evaluate(&buffer_of(&konami_tokens())),
            Some(MatchOutcome::Public(PublicTrigger { action: PublicAction::LegacyCoupon, .. }))
        ));
    }

    #[test]
    fn unknown_sequence_is_no_match() {
        let matcher = Matcher::new(public_triggers(false), TriggerTable::builtin());
        assert_eq!(matcher.evaluate(&buffer_of_text("hello world")), None);
        assert_eq!(matcher.evaluate(&SequenceBuffer::with_defaults()), None);
    }

    #[test]
    fn redirect_vocabulary() {
        let triggers = public_triggers(false);
        let loot = triggers.iter().find(|t| t.keyword == "loot").unwrap();
        assert!(matches!(loot.action, PublicAction::Redirect(Redirect { url: "/cart/", .. })));
    }
}
