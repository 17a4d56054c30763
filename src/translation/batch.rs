/*!
 * Batch construction and the shared claim cursor.
 *
 * Pending units are cut into fixed-size batches once, at run start. Lanes
 * then take batches off a `BatchQueue` whose cursor hands every index to
 * exactly one caller.
 */

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::DispatchError;

/// An ordered, immutable group of units processed in one adapter call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Position of this batch in the queue
    pub index: usize,

    /// Positions of the member units in the unit collection
    pub units: Vec<usize>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Splits pending unit positions into batches of at most `batch_size`.
///
/// Order is preserved and only the last batch may be short.
pub fn build_batches(pending: &[usize], batch_size: usize) -> Result<Vec<Batch>, DispatchError> {
    if batch_size == 0 {
        return Err(DispatchError::InvalidBatchSize(batch_size));
    }

    Ok(pending
        .chunks(batch_size)
        .enumerate()
        .map(|(index, chunk)| Batch {
            index,
            units: chunk.to_vec(),
        })
        .collect())
}

/// Batches of one run plus the cursor lanes claim from
#[derive(Debug)]
pub struct BatchQueue {
    batches: Vec<Batch>,
    cursor: AtomicUsize,
}

impl BatchQueue {
    pub fn new(batches: Vec<Batch>) -> Self {
        Self {
            batches,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Claims the next unclaimed batch.
    ///
    /// `fetch_add` gives each caller a distinct index, so a batch is never
    /// handed out twice and no index is skipped while batches remain.
    pub fn claim(&self) -> Option<&Batch> {
        // Cheap check so an exhausted queue does not keep bumping the cursor
        if self.cursor.load(Ordering::Acquire) >= self.batches.len() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::AcqRel);
        self.batches.get(index)
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Number of batches handed out so far
    pub fn claimed(&self) -> usize {
        self.cursor.load(Ordering::Acquire).min(self.batches.len())
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }
}
