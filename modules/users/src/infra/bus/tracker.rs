//! Commands published but not yet answered, keyed by correlation id.

use dashmap::DashMap;
use plugkit_bus::{Command, CommandMethod, CommandResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::warn;
use uuid::Uuid;

/// Unanswered commands older than this are dropped from the tracker.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct Pending {
    method: CommandMethod,
    email: String,
    sent_at: Instant,
}

/// How an incoming result related to what we sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    /// Matched a pending command; carries the round-trip time.
    Matched(Duration),
    /// Carried an id we never issued (or already settled).
    Unknown(Uuid),
    /// Carried no id at all.
    Uncorrelated,
}

/// Commands with no follower bound are dropped by the broker and never
/// answered, so entries also expire after `max_age`.
#[derive(Debug)]
pub struct InFlight {
    pending: DashMap<Uuid, Pending>,
    max_age: Duration,
    epoch: Instant,
    /// Millis since `epoch` of the last sweep.
    last_sweep_ms: AtomicU64,
}

impl Default for InFlight {
    fn default() -> Self {
        Self::with_max_age(DEFAULT_MAX_AGE)
    }
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            max_age,
            epoch: Instant::now(),
            last_sweep_ms: AtomicU64::new(0),
        }
    }

    /// Remember `command`; it must already carry a correlation id.
    pub fn record(&self, command: &Command) {
        self.maybe_sweep();
        if let Some(id) = command.correlation_id {
            self.pending.insert(
                id,
                Pending {
                    method: command.method.clone(),
                    email: command.email.clone(),
                    sent_at: Instant::now(),
                },
            );
        }
    }

    /// Drop an entry without waiting for its result (publish failed).
    pub fn forget(&self, id: &Uuid) {
        self.pending.remove(id);
    }

    /// Clear the entry for `result`. A result is matched only when method and
    /// email agree with what was sent; the entry is cleared either way.
    pub fn settle(&self, result: &CommandResult) -> Settled {
        let Some(id) = result.correlation_id else {
            return Settled::Uncorrelated;
        };
        match self.pending.remove(&id) {
            Some((_, p)) if p.method == result.method && p.email == result.email => {
                Settled::Matched(p.sent_at.elapsed())
            }
            _ => Settled::Unknown(id),
        }
    }

    /// Evict entries older than `max_age`. Returns how many were dropped.
    pub fn sweep(&self, max_age: Duration) -> usize {
        let before = self.pending.len();
        self.pending.retain(|id, p| {
            let keep = p.sent_at.elapsed() <= max_age;
            if !keep {
                warn!(
                    correlation_id = %id,
                    method = %p.method,
                    email = %p.email,
                    "no result received; forgetting command"
                );
            }
            keep
        });
        before.saturating_sub(self.pending.len())
    }

    /// Sweep at most once per quarter of `max_age`.
    fn maybe_sweep(&self) {
        let now_ms = self.epoch.elapsed().as_millis() as u64;
        let interval_ms = (self.max_age.as_millis() as u64 / 4).max(1);
        let last = self.last_sweep_ms.load(Ordering::Relaxed);
        if now_ms.saturating_sub(last) < interval_ms {
            return;
        }
        if self
            .last_sweep_ms
            .compare_exchange(last, now_ms, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            self.sweep(self.max_age);
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
