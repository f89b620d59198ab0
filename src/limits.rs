//! Advisory pacing for the open-ended loops: a growing schedule of
//! checkpoints where the caller is asked whether to go on, plus a shared
//! cancellation flag.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};

/// When to ask. The default asks after 500 units of work, then 1000, 2000
/// and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub first_checkpoint: usize,
    /// multiplier between checkpoints; 1 or less spaces them evenly
    pub growth: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            first_checkpoint: 500,
            growth: 2,
        }
    }
}

impl SearchLimits {
    /// Never asks.
    pub fn unlimited() -> Self {
        SearchLimits {
            first_checkpoint: usize::MAX,
            growth: 2,
        }
    }

    pub fn pacer(&self) -> Pacer {
        Pacer {
            count: 0,
            next: self.first_checkpoint,
            step: self.first_checkpoint.max(1),
            growth: self.growth,
        }
    }
}

/// Counts work against a [`SearchLimits`] schedule.
#[derive(Debug, Clone)]
pub struct Pacer {
    count: usize,
    next: usize,
    step: usize,
    growth: usize,
}

impl Pacer {
    /// Counts one unit; true exactly when a checkpoint is reached.
    pub fn tick(&mut self) -> bool {
        self.count += 1;
        if self.count < self.next {
            return false;
        }
        self.next = if self.growth > 1 {
            self.next.saturating_mul(self.growth)
        } else {
            self.next.saturating_add(self.step)
        };
        true
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// The "keep going?" question. Receives the amount of work done so far.
pub trait Checkpoint {
    fn proceed(&mut self, generated: usize) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysContinue;

impl Checkpoint for AlwaysContinue {
    fn proceed(&mut self, _: usize) -> bool {
        true
    }
}

/// Gives up at the first checkpoint; what headless runs want.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverContinue;

impl Checkpoint for NeverContinue {
    fn proceed(&mut self, _: usize) -> bool {
        false
    }
}

impl<F: FnMut(usize) -> bool> Checkpoint for F {
    fn proceed(&mut self, generated: usize) -> bool {
        self(generated)
    }
}

/// Clonable stop request, checked once per unit of work.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Everything a paced loop carries around.
#[derive(Debug, Clone)]
pub(crate) struct Guard<C> {
    pub(crate) pacer: Pacer,
    pub(crate) checkpoint: C,
    pub(crate) cancel: CancelFlag,
}

impl<C: Checkpoint> Guard<C> {
    pub(crate) fn new(limits: SearchLimits, checkpoint: C) -> Self {
        Guard {
            pacer: limits.pacer(),
            checkpoint,
            cancel: CancelFlag::new(),
        }
    }

    /// Counts one unit of work. False means stop: cancelled, or the
    /// checkpoint declined.
    pub(crate) fn advance(&mut self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        if self.pacer.tick() {
            let generated = self.pacer.count();
            log::debug!("checkpoint after {generated} unit(s) of work");
            return self.checkpoint.proceed(generated);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use pretty_assertions::assert_eq;

    fn checkpoints(limits: SearchLimits, work: usize) -> Vec<usize> {
        let mut pacer = limits.pacer();
        let mut out = Vec::new();
        for _ in 0..work {
            if pacer.tick() {
                out.push(pacer.count());
            }
        }
        out
    }

    #[test]
    fn doubling_schedule() {
        assert_eq!(checkpoints(SearchLimits::default(), 4500), [500, 1000, 2000, 4000]);
    }

    #[test]
    fn even_schedule() {
        let limits = SearchLimits {
            first_checkpoint: 3,
            growth: 1,
        };
        assert_eq!(checkpoints(limits, 10), [3, 6, 9]);
    }

    #[test]
    fn unlimited_never_asks() {
        assert!(checkpoints(SearchLimits::unlimited(), 10_000).is_empty());
    }

    #[test]
    fn guard_stops_on_decline_or_cancel() {
        let limits = SearchLimits {
            first_checkpoint: 2,
            growth: 2,
        };
        let mut asked = Vec::new();
        let mut guard = Guard::new(limits, |n: usize| {
            asked.push(n);
            n < 4
        });
        let ran = (0..10).take_while(|_| guard.advance()).count();
        assert_eq!(ran, 3);
        drop(guard);
        assert_eq!(asked, [2, 4]);

        let mut guard = Guard::new(SearchLimits::default(), AlwaysContinue);
        assert!(guard.advance());
        guard.cancel.clone().cancel();
        assert!(!guard.advance());
        let eager = SearchLimits {
            first_checkpoint: 1,
            growth: 2,
        };
        assert!(!Guard::new(eager, NeverContinue).advance());
    }
}
