#![forbid(unsafe_code)]

//! Deferred tasks keyed by due time.
//!
//! Delayed navigation, reloads, and the end of the god-mode rotation are
//! queued here instead of on ambient host timers. The host calls
//! [`Engine::tick`](crate::engine::Engine::tick) at or after
//! [`Scheduler::next_deadline`]; tasks never run early.

use std::time::Duration;

/// Work to run once its due time passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredTask {
    Navigate(String),
    Reload,
    EndGodMode,
}

#[derive(Debug, Clone)]
struct Entry {
    due: Duration,
    seq: u64,
    task: DeferredTask,
}

/// Ordered queue of deferred tasks.
#[derive(Debug, Default, Clone)]
pub struct Scheduler {
    entries: Vec<Entry>,
    next_seq: u64,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` to run at `due`.
    pub fn schedule(&mut self, due: Duration, task: DeferredTask) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry { due, seq, task });
    }

    /// Drop queued tasks matching `predicate`. Returns how many were dropped.
    pub fn cancel(&mut self, mut predicate: impl FnMut(&DeferredTask) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !predicate(&e.task));
        before - self.entries.len()
    }

    /// Remove and return every task due at `now`, earliest first.
    ///
    /// Tasks with the same due time come out in scheduling order.
    pub fn take_due(&mut self, now: Duration) -> Vec<DeferredTask> {
        let (mut due, pending): (Vec<_>, Vec<_>) =
            self.entries.drain(..).partition(|e| e.due <= now);
        self.entries = pending;
        due.sort_by_key(|e| (e.due, e.seq));
        due.into_iter().map(|e| e.task).collect()
    }

    /// Earliest due time among queued tasks.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.iter().map(|e| e.due).min()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn nothing_runs_early() {
        let mut s = Scheduler::new();
        s.schedule(ms(1000), DeferredTask::Reload);
        assert!(s.take_due(ms(999)).is_empty());
        assert_eq!(s.take_due(ms(1000)), vec![DeferredTask::Reload]);
        assert!(s.is_empty());
    }

    #[test]
    fn due_order_then_fifo() {
        let mut s = Scheduler::new();
        s.schedule(ms(300), DeferredTask::Navigate("/b".into()));
        s.schedule(ms(100), DeferredTask::EndGodMode);
        s.schedule(ms(300), DeferredTask::Navigate("/c".into()));
        assert_eq!(s.next_deadline(), Some(ms(100)));
        assert_eq!(
            s.take_due(ms(500)),
            vec![
                DeferredTask::EndGodMode,
                DeferredTask::Navigate("/b".into()),
                DeferredTask::Navigate("/c".into()),
            ]
        );
    }

    #[test]
    fn cancel_by_kind() {
        let mut s = Scheduler::new();
        s.schedule(ms(100), DeferredTask::EndGodMode);
        s.schedule(ms(200), DeferredTask::Reload);
        assert_eq!(s.cancel(|t| matches!(t, DeferredTask::EndGodMode)), 1);
        assert_eq!(s.len(), 1);
        assert_eq!(s.next_deadline(), Some(ms(200)));
    }
}
