/*!
 * Tests for batch construction and the claim cursor
 */

use std::collections::HashSet;
use std::sync::Arc;

use polysub::translation::{build_batches, BatchQueue};
use polysub::DispatchError;

/// 25 pending units with batch size 10 give 10, 10 and 5
#[test]
fn test_build_batches_with_remainder_should_end_with_short_batch() {
    let pending: Vec<usize> = (0..25).collect();
    let batches = build_batches(&pending, 10).unwrap();

    assert_eq!(batches.iter().map(|b| b.len()).collect::<Vec<_>>(), vec![10, 10, 5]);
    assert_eq!(batches[2].units, (20..25).collect::<Vec<_>>());
}

#[test]
fn test_build_batches_with_no_pending_units_should_return_empty() {
    assert!(build_batches(&[], 10).unwrap().is_empty());
    assert_eq!(build_batches(&[], 0), Err(DispatchError::InvalidBatchSize(0)));
}

/// Every batch is handed out exactly once across tokio tasks
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_claim_from_many_tasks_should_hand_out_each_batch_once() {
    let pending: Vec<usize> = (0..997).collect();
    let queue = Arc::new(BatchQueue::new(build_batches(&pending, 7).unwrap()));
    let total = queue.len();

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                let mut mine = Vec::new();
                while let Some(batch) = queue.claim() {
                    mine.push(batch.index);
                    tokio::task::yield_now().await;
                }
                mine
            })
        })
        .collect();

    let mut seen = HashSet::new();
    let mut count = 0;
    for handle in handles {
        for index in handle.await.unwrap() {
            assert!(seen.insert(index), "batch {} claimed twice", index);
            count += 1;
        }
    }

    assert_eq!(count, total);
    assert_eq!(seen, (0..total).collect::<HashSet<_>>());
    assert_eq!(queue.claimed(), total);
    assert!(queue.claim().is_none());
}
