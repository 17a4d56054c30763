/*!
 * Worker lanes.
 *
 * A lane is one sequential task bound to one backend descriptor. It claims
 * batches from the shared queue until the queue is empty or the run is
 * cancelled, and writes every outcome back into the run context.
 */

use futures::FutureExt;
use log::debug;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::BackendDescriptor;
use crate::errors::ProviderError;
use crate::providers::{TranslationBackend, TranslationRequest};
use crate::translation::batch::{Batch, BatchQueue};
use crate::translation::context::{BackendStatus, RunContext};
use crate::translation::events::Severity;

/// Execution state of a lane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneState {
    Idle,
    Working,
    BackingOff,
}

/// What a lane did during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaneReport {
    pub lane: String,
    pub descriptor_id: String,
    pub batches_completed: usize,
    pub batches_failed: usize,
    /// Indices of every batch this lane claimed, in claim order
    pub claimed: Vec<usize>,
}

/// One backend consuming batches from the shared queue
pub struct WorkerLane {
    name: String,
    descriptor_id: String,
    backend: Arc<dyn TranslationBackend>,
    context: Arc<RunContext>,
    queue: Arc<BatchQueue>,
    request: Arc<TranslationRequest>,
    cooldown: Duration,
    state: LaneState,
}

impl WorkerLane {
    pub fn new(
        descriptor: &BackendDescriptor,
        backend: Arc<dyn TranslationBackend>,
        context: Arc<RunContext>,
        queue: Arc<BatchQueue>,
        request: Arc<TranslationRequest>,
        cooldown: Duration,
    ) -> Self {
        Self {
            name: descriptor.label().to_string(),
            descriptor_id: descriptor.id.clone(),
            backend,
            context,
            queue,
            request,
            cooldown,
            state: LaneState::Idle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LaneState {
        self.state
    }

    /// Runs until the queue is drained or cancellation is observed
    pub async fn run(mut self) -> LaneReport {
        let mut report = LaneReport {
            lane: self.name.clone(),
            descriptor_id: self.descriptor_id.clone(),
            ..LaneReport::default()
        };
        let queue = Arc::clone(&self.queue);

        loop {
            if self.context.is_cancelled() {
                debug!("[{}] Stop requested, not claiming further batches", self.name);
                break;
            }
            let Some(batch) = queue.claim() else {
                break;
            };
            report.claimed.push(batch.index);

            if self.process(batch).await {
                report.batches_completed += 1;
                self.set_state(LaneState::Idle);
            } else {
                report.batches_failed += 1;
                self.set_state(LaneState::BackingOff);
                tokio::time::sleep(self.cooldown).await;
            }
        }

        self.set_state(LaneState::Idle);
        self.context
            .set_backend_status(&self.descriptor_id, BackendStatus::Idle, None);
        debug!(
            "[{}] Lane finished: {} batch(es) done, {} failed",
            self.name, report.batches_completed, report.batches_failed
        );
        report
    }

    /// Translates one claimed batch; true on success
    async fn process(&mut self, batch: &Batch) -> bool {
        self.set_state(LaneState::Working);
        self.context
            .set_backend_status(&self.descriptor_id, BackendStatus::Working, None);
        self.context.claim_batch(batch, &self.name);

        let texts = self.context.batch_texts(batch);
        let started = Instant::now();
        // A panicking adapter only costs this batch
        let result = AssertUnwindSafe(self.backend.translate(&texts, &self.request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(ProviderError::RequestFailed(format!(
                    "Backend panicked: {}",
                    panic_message(panic.as_ref())
                )))
            });
        let elapsed = started.elapsed().as_secs_f64();

        let events = self.context.events();
        let stats = self.context.stats();
        let batch_number = batch.index + 1;

        match result {
            Ok(translated) => {
                let missing = self.context.complete_batch(batch, &translated);
                stats.add_completed(batch.len());
                events.record(
                    Severity::Success,
                    format!("Batch {} done ({:.1}s)", batch_number, elapsed),
                    Some(&self.name),
                );
                if missing > 0 {
                    events.record(
                        Severity::Warning,
                        format!(
                            "Batch {} returned {} of {} lines; {} left untranslated",
                            batch_number,
                            translated.len(),
                            batch.len(),
                            missing
                        ),
                        Some(&self.name),
                    );
                } else if translated.len() > batch.len() {
                    debug!(
                        "[{}] Batch {} returned {} surplus line(s), ignored",
                        self.name,
                        batch_number,
                        translated.len() - batch.len()
                    );
                }
                true
            }
            Err(e) => {
                self.context.fail_batch(batch);
                stats.add_failed(batch.len());
                let status = if e.is_rate_limited() {
                    BackendStatus::RateLimited
                } else {
                    BackendStatus::Error
                };
                self.context
                    .set_backend_status(&self.descriptor_id, status, Some(e.to_string()));
                events.record(
                    Severity::Error,
                    format!("Batch {} failed: {}", batch_number, e),
                    Some(&self.name),
                );
                false
            }
        }
    }

    fn set_state(&mut self, state: LaneState) {
        if self.state != state {
            debug!("[{}] {:?} -> {:?}", self.name, self.state, state);
            self.state = state;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
