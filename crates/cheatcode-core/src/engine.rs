#![forbid(unsafe_code)]

//! The orchestrating engine.
//!
//! [`Engine`] owns the key buffer, the matcher, the persistence adapter, the
//! effect registry, and the deferred-task queue. It is driven entirely by the
//! host:
//!
//! ```text
//! page load ─► bootstrap()
//! keydown   ─► on_key_down(key, now) ─► public action | enqueue redemption
//! host loop ─► take_redemptions() ─► RedemptionClient::execute ─► apply_redemption()
//! timers    ─► tick(now) at next_deadline()
//! ```
//!
//! No method blocks, panics, or returns an error to the host. Storage and
//! network failures are logged and the affected feature degrades.

use std::collections::VecDeque;
use std::time::Duration;

use crate::bootstrap::{self, RestoreReport};
use crate::config::EngineConfig;
use crate::effect::{EffectRegistry, Season, ToggleEffect};
use crate::host::PageHost;
use crate::key_sequence::{SequenceBuffer, normalize_token};
use crate::notify::Notification;
use crate::persistence::{KeyValueStore, Persistence, SEASON_KEY};
use crate::redeem::{
    EffectAction, EffectDescriptor, LegacyReply, RedeemError, RedemptionRequest, RedemptionResult,
};
use crate::schedule::{DeferredTask, Scheduler};
use crate::trigger::{CheatId, MatchOutcome, Matcher, PublicAction, TriggerTable, public_triggers};

const LEGACY_PENDING_MESSAGE: &str = "👾 Input Accepted. Processing Cheat...";
const LEGACY_FAILURE_MESSAGE: &str = "🚫 System Error: Cheat Failed.";
const NIGHTMARE_MESSAGE: &str = "😈 NIGHTMARE DIFFICULTY STARTED";
const SEASON_RESET_MESSAGE: &str = "🔄 Time Sync: Returning to Server Time";

/// What a keystroke did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Empty key; nothing buffered.
    Ignored,
    /// Buffered, no trigger matched.
    Buffered,
    /// A public keyword matched and its action ran.
    Public(&'static str),
    /// A secret digest matched and a redemption was queued.
    Secret(CheatId),
}

/// Hidden-command engine for one page load.
pub struct Engine<S, H> {
    config: EngineConfig,
    buffer: SequenceBuffer,
    matcher: Matcher,
    persistence: Persistence<S>,
    registry: EffectRegistry,
    scheduler: Scheduler,
    outbox: VecDeque<RedemptionRequest>,
    host: H,
}

impl<S, H> std::fmt::Debug for Engine<S, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("buffer", &self.buffer)
            .field("rendered", &self.registry.rendered())
            .field("scheduled", &self.scheduler.len())
            .field("outbox", &self.outbox.len())
            .finish()
    }
}

impl<S: KeyValueStore, H: PageHost> Engine<S, H> {
    /// Engine with the built-in secret table.
    #[must_use]
    pub fn new(config: EngineConfig, store: S, host: H) -> Self {
        Self::with_trigger_table(config, TriggerTable::builtin(), store, host)
    }

    #[must_use]
    pub fn with_trigger_table(config: EngineConfig, table: TriggerTable, store: S, host: H) -> Self {
        let matcher = Matcher::new(public_triggers(config.legacy_konami), table);
        Self {
            buffer: SequenceBuffer::new(config.sequence.clone()),
            persistence: Persistence::with_prefix(store, config.storage_prefix.clone()),
            matcher,
            registry: EffectRegistry::new(),
            scheduler: Scheduler::new(),
            outbox: VecDeque::new(),
            host,
            config,
        }
    }

    /// Re-apply persisted effects. Call once before feeding keys.
    pub fn bootstrap(&mut self) -> RestoreReport {
        bootstrap::restore(&self.persistence, &mut self.registry, &mut self.host)
    }

    /// Process one keydown. `key` is the DOM `key` value.
    pub fn on_key_down(&mut self, key: &str, now: Duration) -> KeyOutcome {
        let Some(token) = normalize_token(key) else {
            return KeyOutcome::Ignored;
        };
        if self.buffer.feed(&token, now) {
            crate::trace!("key buffer expired before keystroke");
        }

        match self.matcher.evaluate(&self.buffer) {
            Some(MatchOutcome::Public(trigger)) => {
                self.buffer.clear();
                crate::debug!(keyword = trigger.keyword, "public trigger matched");
                self.perform_public(trigger.action, now);
                KeyOutcome::Public(trigger.keyword)
            }
            Some(MatchOutcome::Secret(id)) => {
                self.buffer.clear();
                crate::debug!(cheat_id = %id, "secret trigger matched");
                self.outbox.push_back(RedemptionRequest::Verify(id));
                KeyOutcome::Secret(id)
            }
            None => KeyOutcome::Buffered,
        }
    }

    /// Expire the buffer and run deferred tasks due at `now`.
    ///
    /// Returns the number of deferred tasks run.
    pub fn tick(&mut self, now: Duration) -> usize {
        self.buffer.expire(now);
        let due = self.scheduler.take_due(now);
        let count = due.len();
        for task in due {
            self.run_deferred(task);
        }
        count
    }

    /// Earliest time the host should call [`tick`](Self::tick).
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        match (self.buffer.deadline(), self.scheduler.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Drain queued redemptions for the host to perform.
    pub fn take_redemptions(&mut self) -> Vec<RedemptionRequest> {
        self.outbox.drain(..).collect()
    }

    /// Apply the outcome of a redemption the host performed.
    pub fn apply_redemption(&mut self, result: RedemptionResult, now: Duration) {
        match result {
            RedemptionResult::Verify(Ok(descriptor)) => self.apply_descriptor(descriptor, now),
            RedemptionResult::Verify(Err(err)) => log_redeem_failure(&err),
            RedemptionResult::LegacyCoupon(Ok(reply)) => self.apply_legacy_reply(reply),
            RedemptionResult::LegacyCoupon(Err(err)) => {
                log_redeem_failure(&err);
                self.host.notify(&Notification::error(LEGACY_FAILURE_MESSAGE));
            }
        }
    }

    /// Perform exactly one notification (if any) and one action.
    pub fn apply_descriptor(&mut self, descriptor: EffectDescriptor, now: Duration) {
        if let Some(message) = descriptor.message {
            self.host
                .notify(&Notification::new(message, descriptor.severity));
        }
        match descriptor.action {
            EffectAction::Coupon { code } => match code.filter(|c| !c.is_empty()) {
                Some(code) => self.host.copy_to_clipboard(&code),
                None => {
                    crate::debug!("coupon descriptor without a code");
                }
            },
            EffectAction::GodMode => self.begin_godmode(now),
            EffectAction::Redirect { url } => {
                self.scheduler
                    .schedule(now + self.config.redirect_delay, DeferredTask::Navigate(url));
            }
            EffectAction::Toggle { effect } => {
                match ToggleEffect::from_key(&effect.trim().to_ascii_lowercase()) {
                    Some(effect) => {
                        self.toggle(effect);
                    }
                    None => {
                        crate::debug!(effect = %effect, "toggle names unknown effect");
                    }
                }
            }
            EffectAction::Season { season } => match Season::from_key(&season) {
                Some(season) => self.set_season(season),
                None => {
                    crate::debug!(season = %season, "unknown season");
                }
            },
            EffectAction::SeasonReset => self.reset_season(now),
            EffectAction::Noop => {}
        }
    }

    /// Flip `effect`'s persisted state and render the result.
    ///
    /// Returns the new state. Enabling an exclusive theme also clears the
    /// persisted state of the themes it replaces.
    pub fn toggle(&mut self, effect: ToggleEffect) -> bool {
        // An unreadable store falls back to what is on screen.
        let prior = self
            .persistence
            .read_flag(effect.key())
            .unwrap_or_else(|| self.registry.is_rendered(effect));
        let enabled = !prior;

        self.persistence.save_flag(effect.key(), enabled);
        if enabled && effect.is_exclusive_theme() {
            for other in ToggleEffect::ALL {
                if other != effect && other.is_exclusive_theme() {
                    self.persistence.save_flag(other.key(), false);
                }
            }
        }
        self.registry.apply(effect, enabled, &mut self.host);
        enabled
    }

    /// Undo every rendered effect and drop pending work. For page teardown.
    ///
    /// A god-mode rotation still waiting for its revert is reverted now.
    pub fn shutdown(&mut self) {
        self.registry.release_all(&mut self.host);
        if self
            .scheduler
            .cancel(|t| matches!(t, DeferredTask::EndGodMode))
            > 0
        {
            self.registry.end_godmode(&mut self.host);
        }
        self.scheduler.clear();
        self.outbox.clear();
        self.buffer.clear();
    }

    // -- accessors ---------------------------------------------------------

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn buffer(&self) -> &SequenceBuffer {
        &self.buffer
    }

    #[must_use]
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    #[must_use]
    pub fn persistence(&self) -> &Persistence<S> {
        &self.persistence
    }

    #[must_use]
    pub fn registry(&self) -> &EffectRegistry {
        &self.registry
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    // -- internals ---------------------------------------------------------

    fn perform_public(&mut self, action: PublicAction, now: Duration) {
        match action {
            PublicAction::Toggle(effect) => {
                let enabled = self.toggle(effect);
                let notification = if effect == ToggleEffect::Doom && enabled {
                    Notification::error(NIGHTMARE_MESSAGE)
                } else {
                    Notification::success(format!(
                        "{}: {}",
                        effect.label(),
                        if enabled { "ON" } else { "OFF" }
                    ))
                };
                self.host.notify(&notification);
            }
            PublicAction::Season(season) => {
                self.set_season(season);
                self.host.notify(&Notification::info(format!(
                    "{} Season Pass: {} Activated",
                    season.emoji(),
                    season.key().to_uppercase()
                )));
            }
            PublicAction::SeasonReset => {
                self.host.notify(&Notification::warning(SEASON_RESET_MESSAGE));
                self.reset_season(now);
            }
            PublicAction::Redirect(redirect) => {
                self.host
                    .notify(&Notification::new(redirect.message, redirect.severity));
                self.scheduler.schedule(
                    now + self.config.redirect_delay,
                    DeferredTask::Navigate(redirect.url.to_owned()),
                );
            }
            PublicAction::LegacyCoupon => {
                self.host.notify(&Notification::info(LEGACY_PENDING_MESSAGE));
                self.outbox.push_back(RedemptionRequest::LegacyCoupon);
            }
        }
    }

    fn set_season(&mut self, season: Season) {
        self.persistence.save(SEASON_KEY, Some(season.key()));
        self.registry.apply_season(Some(season), &mut self.host);
    }

    fn reset_season(&mut self, now: Duration) {
        self.persistence.save(SEASON_KEY, None);
        self.scheduler
            .schedule(now + self.config.reload_delay, DeferredTask::Reload);
    }

    fn begin_godmode(&mut self, now: Duration) {
        self.scheduler
            .cancel(|t| matches!(t, DeferredTask::EndGodMode));
        self.registry.begin_godmode(&mut self.host);
        self.scheduler
            .schedule(now + self.config.godmode_duration, DeferredTask::EndGodMode);
    }

    fn apply_legacy_reply(&mut self, reply: LegacyReply) {
        let severity = reply.severity();
        if let Some(message) = reply.message.as_deref().filter(|m| !m.is_empty()) {
            self.host.notify(&Notification::new(message, severity));
        }
        if reply.is_success() {
            if let Some(code) = reply.code.as_deref().filter(|c| !c.is_empty()) {
                self.host.copy_to_clipboard(code);
            }
        }
    }

    fn run_deferred(&mut self, task: DeferredTask) {
        match task {
            DeferredTask::Navigate(url) => self.host.navigate(&url),
            DeferredTask::Reload => self.host.reload(),
            DeferredTask::EndGodMode => self.registry.end_godmode(&mut self.host),
        }
    }
}

fn log_redeem_failure(err: &RedeemError) {
    crate::warn!(error = %err, "cheat redemption failed");
}
