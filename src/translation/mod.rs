/*!
 * Concurrent batch translation.
 *
 * This module contains the dispatcher and everything it shares with its
 * worker lanes. It is split into several submodules:
 *
 * - `batch`: Batch construction and the claim cursor
 * - `context`: Shared run state (units, backend statuses, cancellation)
 * - `dispatcher`: Run orchestration over a pool of lanes
 * - `events`: Append-only event log
 * - `lane`: Worker lanes bound to one backend each
 * - `prompts`: System instruction construction
 * - `stats`: Run statistics
 */

// Re-export main types for easier usage
pub use self::batch::{build_batches, Batch, BatchQueue};
pub use self::context::{BackendState, BackendStatus, CancelHandle, RunContext};
pub use self::dispatcher::{Dispatcher, RunReport};
pub use self::events::{Event, EventLog, Severity};
pub use self::lane::{LaneReport, LaneState, WorkerLane};
pub use self::stats::{RunStats, StatsSnapshot};

// Submodules
pub mod batch;
pub mod context;
pub mod dispatcher;
pub mod events;
pub mod lane;
pub mod prompts;
pub mod stats;
