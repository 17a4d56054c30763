/*!
 * The dispatcher: one run, many lanes.
 *
 * A run checks its preconditions, cuts the pending units into batches,
 * spawns one lane per eligible backend and waits for all of them. Stopping
 * is cooperative: `cancel` raises a flag that lanes read before each claim,
 * so a run ends at most one adapter call (or one cooldown) after the signal.
 */

use log::debug;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{BackendDescriptor, DispatchConfig, TranslationSettings};
use crate::errors::DispatchError;
use crate::providers::{create_backend, BackendSettings, TranslationBackend, TranslationRequest};
use crate::translation::batch::{build_batches, BatchQueue};
use crate::translation::context::{BackendStatus, CancelHandle, RunContext};
use crate::translation::events::Severity;
use crate::translation::lane::{LaneReport, WorkerLane};
use crate::translation::stats::StatsSnapshot;

/// Outcome of a run that actually started
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub stats: StatsSnapshot,
    pub cancelled: bool,
    pub batches: usize,
    pub lanes: Vec<LaneReport>,
}

/// Clears the running flag however the run ends
struct RunningGuard<'a>(&'a RunContext);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.end();
    }
}

/// Runs batches of a `RunContext` over a pool of worker lanes
pub struct Dispatcher {
    context: Arc<RunContext>,
    cooldown: Duration,
    backend_settings: BackendSettings,
}

impl Dispatcher {
    pub fn new(context: Arc<RunContext>) -> Self {
        Self::from_config(context, &DispatchConfig::default())
    }

    pub fn from_config(context: Arc<RunContext>, config: &DispatchConfig) -> Self {
        Self {
            context,
            cooldown: config.cooldown(),
            backend_settings: BackendSettings::from(config),
        }
    }

    /// Pause a lane takes after a failed batch
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn context(&self) -> &Arc<RunContext> {
        &self.context
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.context.cancel_handle()
    }

    /// Asks the running lanes to stop. In-flight calls are not interrupted.
    pub fn cancel(&self) {
        if !self.context.is_cancelled() {
            self.context.cancel_handle().cancel();
            self.context.events().warning("Stopping process...");
        }
    }

    /// Runs with adapters built from the context's descriptors
    pub async fn run(&self, settings: &TranslationSettings) -> Result<RunReport, DispatchError> {
        let backends = self
            .context
            .descriptors()
            .into_iter()
            .filter(BackendDescriptor::is_eligible)
            .map(|descriptor| {
                let backend = create_backend(&descriptor, &self.backend_settings);
                (descriptor, backend)
            })
            .collect();

        self.run_with_backends(settings, backends).await
    }

    /// Runs with the given adapters. Ineligible descriptors are skipped.
    pub async fn run_with_backends(
        &self,
        settings: &TranslationSettings,
        backends: Vec<(BackendDescriptor, Arc<dyn TranslationBackend>)>,
    ) -> Result<RunReport, DispatchError> {
        let context = &self.context;
        let events = context.events();

        if !context.try_begin() {
            let err = DispatchError::AlreadyRunning;
            events.warning(err.to_string());
            return Err(err);
        }
        let _running = RunningGuard(context);

        let eligible: Vec<_> = backends.into_iter().filter(|(d, _)| d.is_eligible()).collect();
        if eligible.is_empty() {
            let err = DispatchError::NoEligibleBackend;
            events.error(format!("{}!", err));
            return Err(err);
        }

        let pending = context.pending_positions();
        if pending.is_empty() {
            let err = DispatchError::NoPendingUnits;
            events.warning(err.to_string());
            return Err(err);
        }

        let batches = match build_batches(&pending, settings.batch_size) {
            Ok(batches) => batches,
            Err(err) => {
                events.error(err.to_string());
                return Err(err);
            }
        };

        // Preconditions hold; from here on the run mutates shared state
        context.cancel_handle().reset();
        context.stats().reset(pending.len());
        events.info("Starting translation process...");
        events.info(format!(
            "Created {} batches. Using {} worker threads.",
            batches.len(),
            eligible.len()
        ));

        let batch_count = batches.len();
        let queue = Arc::new(BatchQueue::new(batches));
        let request = Arc::new(TranslationRequest::from(settings));

        let handles: Vec<_> = eligible
            .into_iter()
            .map(|(descriptor, backend)| {
                let lane = WorkerLane::new(
                    &descriptor,
                    backend,
                    Arc::clone(context),
                    Arc::clone(&queue),
                    Arc::clone(&request),
                    self.cooldown,
                );
                debug!("Spawning lane '{}' ({})", lane.name(), descriptor.provider_type);
                (descriptor, tokio::spawn(lane.run()))
            })
            .collect();

        let mut lanes = Vec::with_capacity(handles.len());
        for (descriptor, handle) in handles {
            match handle.await {
                Ok(report) => lanes.push(report),
                Err(e) => {
                    events.record(
                        Severity::Error,
                        format!("Lane stopped unexpectedly: {}", e),
                        Some(descriptor.label()),
                    );
                    context.set_backend_status(&descriptor.id, BackendStatus::Idle, None);
                }
            }
        }

        let orphaned = context.fail_orphaned();
        if orphaned > 0 {
            context.stats().add_failed(orphaned);
            events.warning(format!("{} line(s) were left unfinished by a crashed lane", orphaned));
        }

        context.stats().finish();
        let cancelled = context.is_cancelled();
        let stats = context.stats().snapshot();

        if cancelled {
            events.warning(format!(
                "Translation stopped: {} completed, {} failed, {} not started.",
                stats.completed,
                stats.failed,
                stats.total_units.saturating_sub(stats.processed())
            ));
        } else {
            events.info("Translation process finished.");
        }

        Ok(RunReport {
            stats,
            cancelled,
            batches: batch_count,
            lanes,
        })
    }
}
