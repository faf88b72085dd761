use backoff::ExponentialBackoff;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use web3::types::H256;

use crate::error::TrackerError;
use crate::eth::{ChainClient, NewBlockEvent};
use crate::reconcile::{
    handle_candidate_hash, handle_new_block, reconcile_block_tx, BlockReport, CandidateOutcome,
    TrackerContext,
};

// 100ms, 200ms, 400ms ... up to 2s, with jitter
fn store_backoff() -> ExponentialBackoff {
    ExponentialBackoff {
        current_interval: Duration::from_millis(100),
        initial_interval: Duration::from_millis(100),
        randomization_factor: 0.1,
        multiplier: 2.0,
        max_interval: Duration::from_secs(2),
        max_elapsed_time: None,
        ..Default::default()
    }
}

/// Runs `op` again while it fails with a store error, at most `store_retry_attempts` extra
/// times. Other errors are returned right away.
async fn with_store_retry<T, F, Fut>(
    what: &str,
    store_retry_attempts: u32,
    mut op: F,
) -> Result<T, TrackerError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, TrackerError>>,
{
    let mut attempt = 0;
    backoff::future::retry(store_backoff(), || {
        attempt += 1;
        let attempt_no = attempt;
        let fut = op();
        async move {
            fut.await.map_err(|err| {
                if err.is_retryable() && attempt_no <= store_retry_attempts {
                    log::warn!(
                        "Store error while handling {}, retrying ({}/{}): {}",
                        what,
                        attempt_no,
                        store_retry_attempts,
                        err
                    );
                    backoff::Error::transient(err)
                } else {
                    backoff::Error::permanent(err)
                }
            })
        }
    })
    .await
}

pub async fn process_candidate<C: ChainClient>(ctx: &TrackerContext<C>, tx_hash: H256) {
    ctx.shared_state.lock().await.candidates_seen += 1;
    let what = format!("candidate {:#x}", tx_hash);
    let res = with_store_retry(&what, ctx.setup.store_retry_attempts, || {
        handle_candidate_hash(ctx, tx_hash)
    })
    .await;

    let mut shared_state = ctx.shared_state.lock().await;
    match res {
        Ok(CandidateOutcome::Created(_)) => shared_state.candidates_created += 1,
        Ok(CandidateOutcome::Requeued) => shared_state.candidates_requeued += 1,
        Ok(CandidateOutcome::Unchanged(_)) => {}
        Err(err) => {
            log::error!("Failed to store status of {:#x}: {}", tx_hash, err);
            shared_state.store_failures += 1;
        }
    }
}

pub async fn process_block<C: ChainClient>(ctx: &TrackerContext<C>, event: NewBlockEvent) {
    let mut report = match handle_new_block(ctx, event).await {
        Ok(report) => report,
        Err(err) => {
            log::error!("Error processing block {:#x}: {}", event.block_hash, err);
            ctx.shared_state.lock().await.blocks_unavailable += 1;
            return;
        }
    };

    // the first store attempt already happened inside the block handler
    let mut store_failures = 0;
    let block_number = report.block_number;
    let failed = if ctx.setup.store_retry_attempts > 0 {
        std::mem::take(&mut report.failed)
    } else {
        store_failures = report.failed.len() as u64;
        Vec::new()
    };
    for (tx_hash, _) in failed {
        let what = format!("transaction {:#x}", tx_hash);
        let res = with_store_retry(&what, ctx.setup.store_retry_attempts - 1, || {
            reconcile_block_tx(ctx, tx_hash, block_number)
        })
        .await;
        match res {
            Ok(status) => report.reconciled.push((tx_hash, status)),
            Err(err) if err.is_receipt_unavailable() => report.receipts_unavailable.push(tx_hash),
            Err(err) => {
                log::error!("Giving up on transaction {:#x}: {}", tx_hash, err);
                report.failed.push((tx_hash, err.to_string()));
                store_failures += 1;
            }
        }
    }

    log_block_report(&report);
    let mut shared_state = ctx.shared_state.lock().await;
    shared_state.blocks_processed += 1;
    shared_state.txs_reconciled += report.reconciled.len() as u64;
    shared_state.receipts_unavailable += report.receipts_unavailable.len() as u64;
    shared_state.store_failures += store_failures;
    if let Some(block_number) = report.block_number {
        shared_state.last_block_number = Some(
            shared_state
                .last_block_number
                .map_or(block_number, |last| last.max(block_number)),
        );
    }
}

fn log_block_report(report: &BlockReport) {
    log::info!(
        "Block {:#x} ({}) done: {} reconciled, {} without receipt, {} failed",
        report.block_hash,
        report
            .block_number
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string()),
        report.reconciled.len(),
        report.receipts_unavailable.len(),
        report.failed.len()
    );
}

async fn drain(semaphore: &Semaphore, max_in_flight: usize) {
    // every permit back means every spawned task finished
    if let Ok(permits) = semaphore.acquire_many(max_in_flight as u32).await {
        drop(permits);
    }
}

/// Consumes the pending feed. Each hash is handled on its own task, with at most
/// `max_in_flight` running at once. Returns after the channel closes and all tasks end.
pub async fn candidate_loop<C: ChainClient + 'static>(
    ctx: Arc<TrackerContext<C>>,
    mut receiver: mpsc::Receiver<H256>,
) {
    let max_in_flight = ctx.setup.max_in_flight;
    let semaphore = Arc::new(Semaphore::new(max_in_flight));
    while let Some(tx_hash) = receiver.recv().await {
        log::debug!("Candidate transaction: {:#x}", tx_hash);
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        let ctx = ctx.clone();
        tokio::spawn(async move {
            process_candidate(ctx.as_ref(), tx_hash).await;
            drop(permit);
        });
    }
    drain(&semaphore, max_in_flight).await;
    log::info!("Candidate feed closed");
}

/// Consumes the new block feed with the same concurrency limit as the candidate loop.
pub async fn block_loop<C: ChainClient + 'static>(
    ctx: Arc<TrackerContext<C>>,
    mut receiver: mpsc::Receiver<NewBlockEvent>,
) {
    let max_in_flight = ctx.setup.max_in_flight;
    let semaphore = Arc::new(Semaphore::new(max_in_flight));
    while let Some(event) = receiver.recv().await {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        let ctx = ctx.clone();
        tokio::spawn(async move {
            process_block(ctx.as_ref(), event).await;
            drop(permit);
        });
    }
    drain(&semaphore, max_in_flight).await;
    log::info!("Block feed closed");
}
