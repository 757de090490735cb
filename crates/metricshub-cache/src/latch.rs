//! Durable-tier availability latch.
//!
//! `Available -> Downgraded` happens on the first durable error. Without a
//! re-probe interval the latch never moves back. With one, a downgraded
//! latch hands out a single trial permit once the interval has elapsed; a
//! successful trial re-promotes the tier, a failed one restarts the wait.
//! `Closed` is terminal.
//!
//! While downgraded with a re-probe interval, every key or pattern mutated
//! only in the local tier is journaled as a [`Resync`]. The trial replays the
//! journal as durable deletions first, and the tier is promoted only once the
//! journal is empty, so reads never see a durable value older than the local
//! one.

use std::collections::HashSet;
use std::mem;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TierState {
    /// No durable backend was configured.
    Unconfigured,
    Available,
    Downgraded,
    /// The durable backend was released by `close`.
    Closed,
}

/// Permission to issue one durable operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Permit {
    Normal,
    Probe,
}

/// Journal entries beyond this collapse into a full flush.
const MAX_RESYNC_KEYS: usize = 10_000;

/// What a mutation made stale in the durable tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stale<'a> {
    Key(&'a str),
    Pattern(&'a str),
    All,
}

/// Durable deletions owed before the tier can be trusted again.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Resync {
    pub keys: HashSet<String>,
    pub patterns: Vec<String>,
    pub flush: bool,
}

impl Resync {
    pub fn is_empty(&self) -> bool {
        !self.flush && self.keys.is_empty() && self.patterns.is_empty()
    }

    fn add(&mut self, stale: Stale<'_>) {
        if self.flush {
            return;
        }
        match stale {
            Stale::Key(key) => {
                self.keys.insert(key.to_string());
            }
            Stale::Pattern(pattern) => {
                if !self.patterns.iter().any(|p| p == pattern) {
                    self.patterns.push(pattern.to_string());
                }
            }
            Stale::All => self.flush = true,
        }
        if self.flush || self.keys.len() + self.patterns.len() > MAX_RESYNC_KEYS {
            *self = Self {
                flush: true,
                ..Self::default()
            };
        }
    }

    fn merge(&mut self, other: Resync) {
        if other.flush {
            self.add(Stale::All);
            return;
        }
        for key in &other.keys {
            self.add(Stale::Key(key));
        }
        for pattern in &other.patterns {
            self.add(Stale::Pattern(pattern));
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: TierState,
    downgraded_at: Option<Instant>,
    /// Start of the trial in flight. A trial older than the interval is
    /// treated as abandoned (its caller was dropped mid-operation).
    probing: Option<Instant>,
    resync: Resync,
}

impl Inner {
    fn journal(&mut self, stale: Option<Stale<'_>>, reprobe: bool) {
        if let Some(stale) = stale {
            if reprobe && self.state == TierState::Downgraded {
                self.resync.add(stale);
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct TierLatch {
    inner: Mutex<Inner>,
    reprobe_after: Option<Duration>,
}

impl TierLatch {
    pub fn new(state: TierState, reprobe_after: Option<Duration>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state,
                downgraded_at: (state == TierState::Downgraded).then(Instant::now),
                probing: None,
                resync: Resync::default(),
            }),
            reprobe_after,
        }
    }

    pub fn state(&self) -> TierState {
        self.inner.lock().state
    }

    /// Asks to run one durable operation. A refused mutation of a downgraded
    /// tier is journaled under the same lock, so nothing slips between the
    /// refusal and a concurrent promotion.
    pub fn permit(&self, stale: Option<Stale<'_>>) -> Option<Permit> {
        let mut inner = self.inner.lock();
        let permit = self.try_permit(&mut inner);
        if permit.is_none() {
            inner.journal(stale, self.reprobe_after.is_some());
        }
        permit
    }

    fn try_permit(&self, inner: &mut Inner) -> Option<Permit> {
        match inner.state {
            TierState::Unconfigured | TierState::Closed => None,
            TierState::Available => Some(Permit::Normal),
            TierState::Downgraded => {
                let interval = self.reprobe_after?;
                let now = Instant::now();
                if let Some(started) = inner.probing {
                    if now.saturating_duration_since(started) < interval {
                        return None;
                    }
                }
                let since = inner.downgraded_at?;
                if now.saturating_duration_since(since) >= interval {
                    inner.probing = Some(now);
                    Some(Permit::Probe)
                } else {
                    None
                }
            }
        }
    }

    /// Takes the pending journal for replay by the trial holder.
    pub fn take_resync(&self) -> Resync {
        mem::take(&mut self.inner.lock().resync)
    }

    /// Puts back a journal whose replay failed.
    pub fn restore_resync(&self, resync: Resync) {
        let mut inner = self.inner.lock();
        if inner.state == TierState::Downgraded {
            inner.resync.merge(resync);
        }
    }

    /// Promotes a downgraded tier after a successful trial, unless mutations
    /// were journaled while the trial ran; the next caller then replays them
    /// without waiting for another interval.
    pub fn record_success(&self, permit: Permit) {
        if permit != Permit::Probe {
            return;
        }
        let mut inner = self.inner.lock();
        inner.probing = None;
        if inner.state == TierState::Downgraded && inner.resync.is_empty() {
            inner.state = TierState::Available;
            inner.downgraded_at = None;
            tracing::info!("durable cache tier recovered, resuming dual-tier operation");
        }
    }

    /// Marks the tier downgraded and journals what the failed operation left
    /// stale. Returns `true` when this call performed the
    /// `Available -> Downgraded` transition.
    pub fn record_failure(&self, stale: Option<Stale<'_>>) -> bool {
        let mut inner = self.inner.lock();
        inner.probing = None;
        inner.downgraded_at = Some(Instant::now());
        let transitioned = match inner.state {
            TierState::Available => {
                inner.state = TierState::Downgraded;
                true
            }
            _ => false,
        };
        inner.journal(stale, self.reprobe_after.is_some());
        transitioned
    }

    /// Moves a configured tier to `Closed`. Returns `true` only for the call
    /// that performed the transition.
    pub fn close(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            TierState::Unconfigured | TierState::Closed => false,
            TierState::Available | TierState::Downgraded => {
                inner.state = TierState::Closed;
                inner.probing = None;
                inner.resync = Resync::default();
                true
            }
        }
    }
}
