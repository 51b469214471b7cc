//! Single-shot timers gated by a session generation
//!
//! A timer scheduled by one session must never fire into the next one, so
//! every entry carries the generation it was created under and is dropped on
//! fire if the session has moved on.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    /// End of the slow-motion window after a correct answer
    SlowMotionEnd,
    /// Death splash finished, session becomes restartable
    SplashEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScheduledTask {
    kind: TimerKind,
    fire_at_ms: u64,
    generation: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Timers {
    tasks: Vec<ScheduledTask>,
}

impl Timers {
    /// Schedule `kind`, replacing any earlier entry of the same kind
    pub fn schedule(&mut self, kind: TimerKind, fire_at_ms: u64, generation: u64) {
        self.cancel(kind);
        self.tasks.push(ScheduledTask {
            kind,
            fire_at_ms,
            generation,
        });
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.tasks.retain(|t| t.kind != kind);
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn is_scheduled(&self, kind: TimerKind) -> bool {
        self.tasks.iter().any(|t| t.kind == kind)
    }

    /// Remove and return every timer due at `now_ms`, in firing order.
    /// Entries from another generation are discarded.
    pub fn take_due(&mut self, now_ms: u64, generation: u64) -> Vec<TimerKind> {
        let mut due: Vec<ScheduledTask> = Vec::new();
        self.tasks.retain(|t| {
            if t.fire_at_ms <= now_ms {
                due.push(*t);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|t| t.fire_at_ms);
        due.into_iter()
            .filter(|t| {
                let current = t.generation == generation;
                if !current {
                    log::debug!(
                        "Dropping stale {:?} timer (generation {} != {})",
                        t.kind,
                        t.generation,
                        generation
                    );
                }
                current
            })
            .map(|t| t.kind)
            .collect()
    }
}
