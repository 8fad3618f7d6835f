#![forbid(unsafe_code)]

//! Effect registry.
//!
//! Effects are a closed set. Boolean effects are [`ToggleEffect`]s; the one
//! parameterized effect is the [`Season`] swap. The registry is a pure
//! effector: it mutates the page through a [`Surface`] and never reads or
//! writes persisted state.
//!
//! # Invariants
//!
//! 1. `apply(e, true)` twice leaves the same page as once: tickers are tracked
//!    in a per-effect resource arena and style nodes are existence-checked.
//! 2. `apply(e, false)` releases everything `e` created, including tickers it
//!    started in an earlier call.
//! 3. `apply_season(None)` is a no-op, not a reset.

use std::collections::HashMap;

/// Root-element classes used by the exclusive themes.
const EXCLUSIVE_THEME_CLASSES: [&str; 5] = ["matrix", "cyber", "retro", "doom", "devmode"];

/// Root-element classes used by the season swap.
const SEASON_CLASSES: [&str; 4] = ["spring", "summer", "fall", "winter"];

const BIGHEAD_STYLE_ID: &str = "bighead-style";
const BIGHEAD_CSS: &str = "img { transform: scale(1.5) !important; transition: transform 0.5s; }";
const DOOM_SHAKE: &str = "shake 0.5s cubic-bezier(.36,.07,.19,.97) both";
const FPS_COUNTER_ID: &str = "fps-counter";
const HERO_BG_ID: &str = "seasonal-hero-bg";
const FOOTER_BG_ID: &str = "seasonal-footer-bg";
const SEASON_ASSET_BASE: &str = "/static/images/";

// ---------------------------------------------------------------------------
// Effect identifiers
// ---------------------------------------------------------------------------

/// Boolean, persistable effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToggleEffect {
    DarkMode,
    Cyber,
    Retro,
    DevMode,
    Doom,
    BigHead,
    Fps,
    Matrix,
}

impl ToggleEffect {
    /// Every toggle, in restore order.
    pub const ALL: [Self; 8] = [
        Self::DevMode,
        Self::Doom,
        Self::BigHead,
        Self::Fps,
        Self::DarkMode,
        Self::Cyber,
        Self::Retro,
        Self::Matrix,
    ];

    /// Identifier used as the trigger keyword and the storage key suffix.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::DarkMode => "darkmode",
            Self::Cyber => "cyber",
            Self::Retro => "retro",
            Self::DevMode => "devmode",
            Self::Doom => "doom",
            Self::BigHead => "bighead",
            Self::Fps => "fps",
            Self::Matrix => "matrix",
        }
    }

    /// Label shown in toggle notifications.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::DarkMode => "🌙 Dark Mode",
            Self::Cyber => "🤖 Cyberpunk Mode",
            Self::Retro => "📜 Retro Mode",
            Self::DevMode => "👨‍💻 Developer Mode",
            Self::Doom => "😈 Nightmare Difficulty",
            Self::BigHead => "🏀 Big Head Mode",
            Self::Fps => "⚡ FPS Counter",
            Self::Matrix => "💊 Matrix Rain",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.key() == key)
    }

    /// Root class this effect sets, if any.
    #[must_use]
    pub const fn root_class(self) -> Option<&'static str> {
        match self {
            Self::DarkMode => Some("dark"),
            Self::Cyber => Some("cyber"),
            Self::Retro => Some("retro"),
            Self::DevMode => Some("devmode"),
            Self::Doom => Some("doom"),
            Self::BigHead => Some("bighead"),
            Self::Matrix => Some("matrix"),
            Self::Fps => None,
        }
    }

    /// Themes that replace each other when enabled.
    #[must_use]
    pub const fn is_exclusive_theme(self) -> bool {
        matches!(
            self,
            Self::Matrix | Self::Cyber | Self::Retro | Self::Doom | Self::DevMode
        )
    }
}

impl std::fmt::Display for ToggleEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Seasonal theme value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    pub const ALL: [Self; 4] = [Self::Spring, Self::Summer, Self::Fall, Self::Winter];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Fall => "fall",
            Self::Winter => "winter",
        }
    }

    #[must_use]
    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Spring => "🌸",
            Self::Summer => "☀️",
            Self::Fall => "🍂",
            Self::Winter => "❄️",
        }
    }

    /// `(hero banner, footer)` asset file names.
    #[must_use]
    pub const fn assets(self) -> (&'static str, &'static str) {
        match self {
            Self::Spring => ("spring_banner.webp", "spring_footer.webp"),
            Self::Summer => ("summer_banner.webp", "summer_footer.webp"),
            Self::Fall => ("Fall_banner.webp", "fall_footer.webp"),
            Self::Winter => ("winter_banner.webp", "winter_footer.webp"),
        }
    }

    /// Parse a stored or server-sent season name.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.key().eq_ignore_ascii_case(key))
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

// ---------------------------------------------------------------------------
// Host surface
// ---------------------------------------------------------------------------

/// Long-running render loops an effect can own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ticker {
    /// Frame-rate readout written into `#fps-counter`.
    FpsMeter,
    /// Full-screen falling-glyph overlay.
    RainOverlay,
}

/// Opaque handle for a running ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickerHandle(pub u32);

/// Page mutation primitives supplied by the host.
///
/// Every method must tolerate missing anchors (do nothing) and repeated
/// calls (do not duplicate).
pub trait Surface {
    /// Add or remove a class on the root element.
    fn set_root_class(&mut self, class: &str, present: bool);

    /// Set (`Some`) or clear (`None`) an inline style property on `<body>`.
    fn set_body_style(&mut self, property: &str, value: Option<&str>);

    /// Whether a node with `id` exists.
    fn has_node(&self, id: &str) -> bool;

    /// Append `<style id=..>css</style>` to the document head.
    fn insert_style(&mut self, id: &str, css: &str);

    /// Remove the node with `id` if present.
    fn remove_node(&mut self, id: &str);

    /// Show or hide the element with `id`.
    fn set_visible(&mut self, id: &str, visible: bool);

    /// Point the image element `id` at `src`.
    fn set_image_src(&mut self, id: &str, src: &str);

    /// Start a render loop. The host creates whatever nodes it needs.
    fn start_ticker(&mut self, ticker: Ticker) -> TickerHandle;

    /// Stop a loop and remove its nodes. Unknown handles are ignored.
    fn stop_ticker(&mut self, handle: TickerHandle);
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Resources one effect instance owns.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EffectResources {
    tickers: Vec<(Ticker, TickerHandle)>,
}

impl EffectResources {
    fn has(&self, ticker: Ticker) -> bool {
        self.tickers.iter().any(|(t, _)| *t == ticker)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}

/// Applies effects and tracks what each one has rendered.
#[derive(Debug, Default)]
pub struct EffectRegistry {
    rendered: HashMap<ToggleEffect, EffectResources>,
    season: Option<Season>,
}

impl EffectRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `effect` is currently rendered (independent of persistence).
    #[must_use]
    pub fn is_rendered(&self, effect: ToggleEffect) -> bool {
        self.rendered.contains_key(&effect)
    }

    /// Effects currently rendered, in restore order.
    #[must_use]
    pub fn rendered(&self) -> Vec<ToggleEffect> {
        ToggleEffect::ALL
            .into_iter()
            .filter(|e| self.rendered.contains_key(e))
            .collect()
    }

    /// Resources held by `effect`.
    #[must_use]
    pub fn resources(&self, effect: ToggleEffect) -> Option<&EffectResources> {
        self.rendered.get(&effect)
    }

    /// Season currently rendered.
    #[must_use]
    pub const fn season(&self) -> Option<Season> {
        self.season
    }

    /// Enable or disable a boolean effect. Idempotent in both directions.
    pub fn apply(&mut self, effect: ToggleEffect, enabled: bool, surface: &mut impl Surface) {
        if enabled {
            if effect.is_exclusive_theme() {
                self.clear_exclusive_themes(effect, surface);
            }
            self.enable(effect, surface);
        } else {
            self.disable(effect, surface);
        }
    }

    fn enable(&mut self, effect: ToggleEffect, surface: &mut impl Surface) {
        let mut resources = self.rendered.remove(&effect).unwrap_or_default();
        if let Some(class) = effect.root_class() {
            surface.set_root_class(class, true);
        }
        match effect {
            ToggleEffect::DarkMode
            | ToggleEffect::Cyber
            | ToggleEffect::Retro
            | ToggleEffect::DevMode => {}
            ToggleEffect::Doom => surface.set_body_style("animation", Some(DOOM_SHAKE)),
            ToggleEffect::BigHead => {
                if !surface.has_node(BIGHEAD_STYLE_ID) {
                    surface.insert_style(BIGHEAD_STYLE_ID, BIGHEAD_CSS);
                }
            }
            ToggleEffect::Fps => {
                surface.set_visible(FPS_COUNTER_ID, true);
                Self::ensure_ticker(&mut resources, Ticker::FpsMeter, surface);
            }
            ToggleEffect::Matrix => {
                Self::ensure_ticker(&mut resources, Ticker::RainOverlay, surface);
            }
        }
        self.rendered.insert(effect, resources);
    }

    fn disable(&mut self, effect: ToggleEffect, surface: &mut impl Surface) {
        let resources = self.rendered.remove(&effect).unwrap_or_default();
        for (_, handle) in resources.tickers {
            surface.stop_ticker(handle);
        }
        if let Some(class) = effect.root_class() {
            surface.set_root_class(class, false);
        }
        match effect {
            ToggleEffect::DarkMode
            | ToggleEffect::Cyber
            | ToggleEffect::Retro
            | ToggleEffect::DevMode
            | ToggleEffect::Matrix => {}
            ToggleEffect::Doom => surface.set_body_style("animation", None),
            ToggleEffect::BigHead => surface.remove_node(BIGHEAD_STYLE_ID),
            ToggleEffect::Fps => surface.set_visible(FPS_COUNTER_ID, false),
        }
    }

    fn ensure_ticker(resources: &mut EffectResources, ticker: Ticker, surface: &mut impl Surface) {
        if !resources.has(ticker) {
            let handle = surface.start_ticker(ticker);
            resources.tickers.push((ticker, handle));
        }
    }

    /// Tear down every exclusive theme other than `keep`.
    ///
    /// Classes are removed even when this registry did not render them, so a
    /// stale class left on the page is cleared too.
    fn clear_exclusive_themes(&mut self, keep: ToggleEffect, surface: &mut impl Surface) {
        for other in ToggleEffect::ALL {
            if other != keep && other.is_exclusive_theme() && self.is_rendered(other) {
                self.disable(other, surface);
            }
        }
        for class in EXCLUSIVE_THEME_CLASSES {
            if Some(class) != keep.root_class() {
                surface.set_root_class(class, false);
            }
        }
    }

    /// Apply a season. `None` leaves the page untouched.
    pub fn apply_season(&mut self, season: Option<Season>, surface: &mut impl Surface) {
        let Some(season) = season else {
            return;
        };
        for class in SEASON_CLASSES {
            surface.set_root_class(class, class == season.key());
        }
        let (banner, footer) = season.assets();
        surface.set_image_src(HERO_BG_ID, &format!("{SEASON_ASSET_BASE}{banner}"));
        surface.set_image_src(FOOTER_BG_ID, &format!("{SEASON_ASSET_BASE}{footer}"));
        self.season = Some(season);
    }

    /// Start the temporary god-mode rotation.
    pub fn begin_godmode(&mut self, surface: &mut impl Surface) {
        surface.set_body_style("transition", Some("transform 1s"));
        surface.set_body_style("transform", Some("rotate(180deg)"));
    }

    /// Undo [`begin_godmode`](Self::begin_godmode).
    pub fn end_godmode(&mut self, surface: &mut impl Surface) {
        surface.set_body_style("transform", Some("none"));
    }

    /// Disable every rendered effect. Used on teardown.
    pub fn release_all(&mut self, surface: &mut impl Surface) {
        for effect in self.rendered() {
            self.disable(effect, surface);
        }
    }
}
