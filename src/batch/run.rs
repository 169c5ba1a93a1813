// ABOUTME: Completion barrier: tallies terminal outcomes and arms aggregation exactly once.
// ABOUTME: The tally and the all-terminal check share one lock to close the double-fire race.

use std::path::PathBuf;
use std::sync::Mutex;
use uuid::Uuid;

use super::worker::TerminalStatus;

/// Terminal-outcome counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchCounts {
    pub finished: usize,
    pub failed: usize,
    pub canceled: usize,
}

impl BatchCounts {
    pub fn terminal(&self) -> usize {
        self.finished + self.failed + self.canceled
    }
}

/// One-shot summary emitted when the run settles.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub id: Uuid,
    pub total: usize,
    pub counts: BatchCounts,
    pub log_path: PathBuf,
}

struct BarrierInner {
    counts: BatchCounts,
    aggregated: bool,
}

/// Counts terminal outcomes against the worker total. The tally and the
/// all-terminal check share one lock, so exactly one caller ever observes the
/// transition to done — even when outcomes land concurrently.
pub struct CompletionBarrier {
    total: usize,
    inner: Mutex<BarrierInner>,
}

impl CompletionBarrier {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            inner: Mutex::new(BarrierInner {
                counts: BatchCounts::default(),
                aggregated: false,
            }),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn counts(&self) -> BatchCounts {
        self.inner.lock().unwrap().counts
    }

    /// Record one terminal outcome. Returns `true` for exactly one call: the
    /// one that completes the batch and should run aggregation.
    pub fn record(&self, status: TerminalStatus) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match status {
            TerminalStatus::Finished => inner.counts.finished += 1,
            TerminalStatus::Failed => inner.counts.failed += 1,
            TerminalStatus::Canceled => inner.counts.canceled += 1,
        }
        if inner.counts.terminal() >= self.total && !inner.aggregated {
            inner.aggregated = true;
            true
        } else {
            false
        }
    }

    /// An empty batch has no outcomes; the starter claims aggregation directly.
    pub fn claim_empty(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if self.total == 0 && !inner.aggregated {
            inner.aggregated = true;
            true
        } else {
            false
        }
    }
}
