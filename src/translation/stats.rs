/*!
 * Run statistics shared by all lanes.
 */

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Live counters. Lanes only ever add to them.
#[derive(Debug, Default)]
pub struct RunStats {
    total_units: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    started_at: Mutex<Option<DateTime<Utc>>>,
    ended_at: Mutex<Option<DateTime<Utc>>>,
}

/// Plain copy of the statistics at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StatsSnapshot {
    pub total_units: usize,
    pub completed: usize,
    pub failed: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl StatsSnapshot {
    pub fn processed(&self) -> usize {
        self.completed + self.failed
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some() && self.ended_at.is_none()
    }

    /// Wall time of a finished run
    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.ended_at? - self.started_at?)
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zeroes the counters and stamps the start time
    pub fn reset(&self, total_units: usize) {
        self.completed.store(0, Ordering::SeqCst);
        self.failed.store(0, Ordering::SeqCst);
        self.total_units.store(total_units, Ordering::SeqCst);
        *self.ended_at.lock() = None;
        *self.started_at.lock() = Some(Utc::now());
    }

    pub fn add_completed(&self, count: usize) {
        self.completed.fetch_add(count, Ordering::AcqRel);
    }

    pub fn add_failed(&self, count: usize) {
        self.failed.fetch_add(count, Ordering::AcqRel);
    }

    /// Stamps the end time; called once every lane has exited
    pub fn finish(&self) {
        *self.ended_at.lock() = Some(Utc::now());
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_units: self.total_units.load(Ordering::Acquire),
            completed: self.completed.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
            started_at: *self.started_at.lock(),
            ended_at: *self.ended_at.lock(),
        }
    }
}
