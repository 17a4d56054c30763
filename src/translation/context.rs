/*!
 * Shared state of a translation run.
 *
 * A `RunContext` is created by the caller, handed to the dispatcher behind an
 * `Arc`, and read by the presentation layer at any time. Readers always get
 * copies; no guard is ever handed out.
 */

use log::warn;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::app_config::BackendDescriptor;
use crate::subtitle_processor::{Unit, UnitState};
use crate::translation::batch::Batch;
use crate::translation::events::EventLog;
use crate::translation::stats::RunStats;

/// Live status of a backend descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendStatus {
    #[default]
    Idle,
    Working,
    Error,
    RateLimited,
}

/// A descriptor together with its live status
#[derive(Debug, Clone, PartialEq)]
pub struct BackendState {
    pub descriptor: BackendDescriptor,
    pub status: BackendStatus,
    pub last_error: Option<String>,
}

/// Cooperative stop signal shared by the dispatcher and its lanes
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every lane to stop before its next claim
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub(crate) fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Units, backend statuses, statistics and events of a run
#[derive(Debug)]
pub struct RunContext {
    units: RwLock<Vec<Unit>>,
    backends: RwLock<Vec<BackendState>>,
    stats: RunStats,
    events: EventLog,
    cancel: CancelHandle,
    running: AtomicBool,
}

impl RunContext {
    pub fn new(units: Vec<Unit>, backends: Vec<BackendDescriptor>) -> Self {
        Self {
            units: RwLock::new(units),
            backends: RwLock::new(
                backends
                    .into_iter()
                    .map(|descriptor| BackendState {
                        descriptor,
                        status: BackendStatus::Idle,
                        last_error: None,
                    })
                    .collect(),
            ),
            stats: RunStats::new(),
            events: EventLog::new(),
            cancel: CancelHandle::new(),
            running: AtomicBool::new(false),
        }
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Marks the context busy; false when a run already holds it
    pub(crate) fn try_begin(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn end(&self) {
        self.running.store(false, Ordering::Release);
    }

    // ----- units -----

    /// Copy of all units in document order
    pub fn units_snapshot(&self) -> Vec<Unit> {
        self.units.read().clone()
    }

    pub fn unit_count(&self) -> usize {
        self.units.read().len()
    }

    /// Replaces the document. Refused while a run is active.
    pub fn load_units(&self, units: Vec<Unit>) -> bool {
        if self.is_running() {
            return false;
        }
        *self.units.write() = units;
        true
    }

    /// Positions of units still waiting for translation
    pub fn pending_positions(&self) -> Vec<usize> {
        self.units
            .read()
            .iter()
            .enumerate()
            .filter(|(_, unit)| unit.state() == UnitState::Pending)
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Source texts of a batch, in batch order
    pub fn batch_texts(&self, batch: &Batch) -> Vec<String> {
        let units = self.units.read();
        batch
            .units
            .iter()
            .filter_map(|&pos| units.get(pos).map(|u| u.source_text.clone()))
            .collect()
    }

    /// Marks every unit of the batch claimed by `lane`
    pub fn claim_batch(&self, batch: &Batch, lane: &str) {
        let mut units = self.units.write();
        for &pos in &batch.units {
            if let Some(unit) = units.get_mut(pos) {
                if let Err(e) = unit.claim(lane) {
                    warn!("{}", e);
                }
            }
        }
    }

    /// Stores results by index; missing entries become empty translations.
    /// Returns the number of units that had no matching result.
    pub fn complete_batch(&self, batch: &Batch, results: &[String]) -> usize {
        let mut units = self.units.write();
        for (idx, &pos) in batch.units.iter().enumerate() {
            if let Some(unit) = units.get_mut(pos) {
                let text = results.get(idx).cloned().unwrap_or_default();
                if let Err(e) = unit.complete(text) {
                    warn!("{}", e);
                }
            }
        }
        batch.len().saturating_sub(results.len())
    }

    /// Marks every unit of the batch failed
    pub fn fail_batch(&self, batch: &Batch) {
        let mut units = self.units.write();
        for &pos in &batch.units {
            if let Some(unit) = units.get_mut(pos) {
                if let Err(e) = unit.fail() {
                    warn!("{}", e);
                }
            }
        }
    }

    /// Fails units left in `Claimed` by a lane that died mid-batch.
    /// Only meaningful once every lane has exited.
    pub(crate) fn fail_orphaned(&self) -> usize {
        let mut units = self.units.write();
        let mut orphaned = 0;
        for unit in units.iter_mut().filter(|u| u.state() == UnitState::Claimed) {
            if unit.fail().is_ok() {
                orphaned += 1;
            }
        }
        orphaned
    }

    // ----- backends -----

    /// Copy of every descriptor with its live status
    pub fn backend_states(&self) -> Vec<BackendState> {
        self.backends.read().clone()
    }

    pub fn descriptors(&self) -> Vec<BackendDescriptor> {
        self.backends.read().iter().map(|b| b.descriptor.clone()).collect()
    }

    pub fn backend_status(&self, id: &str) -> Option<BackendStatus> {
        self.backends
            .read()
            .iter()
            .find(|b| b.descriptor.id == id)
            .map(|b| b.status)
    }

    /// Replaces the descriptor list. Refused while a run is active.
    pub fn set_descriptors(&self, descriptors: Vec<BackendDescriptor>) -> bool {
        if self.is_running() {
            return false;
        }
        *self.backends.write() = descriptors
            .into_iter()
            .map(|descriptor| BackendState {
                descriptor,
                status: BackendStatus::Idle,
                last_error: None,
            })
            .collect();
        true
    }

    /// Updates the live status of a descriptor. `error` is kept only for
    /// the error states and cleared otherwise.
    pub fn set_backend_status(&self, id: &str, status: BackendStatus, error: Option<String>) {
        let mut backends = self.backends.write();
        if let Some(state) = backends.iter_mut().find(|b| b.descriptor.id == id) {
            state.status = status;
            state.last_error = match status {
                BackendStatus::Error | BackendStatus::RateLimited => error.or(state.last_error.take()),
                BackendStatus::Idle | BackendStatus::Working => None,
            };
        }
    }
}
