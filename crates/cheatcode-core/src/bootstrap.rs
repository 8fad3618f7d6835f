#![forbid(unsafe_code)]

//! Restoration bootstrap.
//!
//! Runs once per page load, before keystrokes are processed, and re-applies
//! every effect whose persisted state is active. Running it again is
//! harmless: effects are idempotent.

use crate::effect::{EffectRegistry, Season, Surface, ToggleEffect};
use crate::persistence::{KeyValueStore, Persistence, SEASON_KEY};

/// What a restore pass re-applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: Vec<ToggleEffect>,
    pub season: Option<Season>,
}

impl RestoreReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.restored.is_empty() && self.season.is_none()
    }
}

/// Re-apply persisted effects.
pub fn restore<S: KeyValueStore>(
    persistence: &Persistence<S>,
    registry: &mut EffectRegistry,
    surface: &mut impl Surface,
) -> RestoreReport {
    let mut report = RestoreReport::default();

    for effect in ToggleEffect::ALL {
        if persistence.is_active(effect.key()) {
            registry.apply(effect, true, surface);
            report.restored.push(effect);
        }
    }

    if let Some(stored) = persistence.load(SEASON_KEY) {
        match Season::from_key(&stored) {
            Some(season) => {
                registry.apply_season(Some(season), surface);
                report.season = Some(season);
            }
            None => {
                crate::debug!(value = %stored, "ignoring unknown stored season");
            }
        }
    }

    crate::info!(
        restored = report.restored.len(),
        season = ?report.season,
        "effect state restored"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessPage;
    use crate::persistence::{MemoryStore, StorageError};
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_store_restores_nothing() {
        let p = Persistence::new(MemoryStore::new());
        let mut registry = EffectRegistry::new();
        let mut page = HeadlessPage::new();
        let report = restore(&p, &mut registry, &mut page);
        assert!(report.is_empty());
        assert!(page.root_classes().is_empty());
    }

    #[test]
    fn restores_active_toggles_and_season() {
        let mut p = Persistence::new(MemoryStore::new());
        p.save_flag("darkmode", true);
        p.save_flag("bighead", true);
        p.save("season", Some("summer"));
        let mut registry = EffectRegistry::new();
        let mut page = HeadlessPage::new();

        let report = restore(&p, &mut registry, &mut page);

        assert_eq!(
            report,
            RestoreReport {
                restored: vec![ToggleEffect::BigHead, ToggleEffect::DarkMode],
                season: Some(Season::Summer),
            }
        );
        assert!(page.has_root_class("dark"));
        assert!(page.has_root_class("bighead"));
        assert!(page.has_root_class("summer"));
    }

    #[test]
    fn restore_twice_is_idempotent() {
        let mut p = Persistence::new(MemoryStore::new());
        p.save_flag("fps", true);
        p.save_flag("matrix", true);
        let mut registry = EffectRegistry::new();
        let mut page = HeadlessPage::new();
        page.add_anchor("fps-counter");

        restore(&p, &mut registry, &mut page);
        let first = page.snapshot();
        restore(&p, &mut registry, &mut page);

        assert_eq!(page.snapshot(), first);
        assert_eq!(page.running_tickers().len(), 2);
    }

    #[test]
    fn false_and_garbage_values_are_ignored() {
        let mut store = MemoryStore::new();
        store.insert_raw("cheat_state_doom", "false");
        store.insert_raw("cheat_state_season", "monsoon");
        let p = Persistence::new(store);
        let mut registry = EffectRegistry::new();
        let mut page = HeadlessPage::new();
        assert!(restore(&p, &mut registry, &mut page).is_empty());
    }

    #[test]
    fn unreadable_store_restores_nothing() {
        let p = Persistence::new(MemoryStore::failing(StorageError::Unavailable));
        let mut registry = EffectRegistry::new();
        let mut page = HeadlessPage::new();
        assert!(restore(&p, &mut registry, &mut page).is_empty());
    }
}
