use backoff::backoff::Backoff;
use std::future::Future;
use web3::types::H256;

use crate::err_create;
use crate::error::{BlockUnavailableError, ReceiptUnavailableError, TrackerError};
use crate::eth::{BlockTransactions, ChainClient, ChainReceipt, ChainTransaction};
use crate::setup::RetrySettings;

/// Calls `read` until it returns a value, at most `retry.max_attempts` times.
///
/// Both a failed call and an empty answer count as an unsuccessful attempt.
/// No delay follows the last attempt.
pub async fn fetch_with_retry<T, F, Fut>(
    what: &str,
    hash: H256,
    retry: &RetrySettings,
    mut read: F,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, web3::Error>>,
{
    let mut backoff = retry.backoff();
    for attempt in 1..=retry.max_attempts {
        match read().await {
            Ok(Some(value)) => return Some(value),
            Ok(None) => {
                log::debug!(
                    "{} {:#x} not available yet, attempt {}/{}",
                    what,
                    hash,
                    attempt,
                    retry.max_attempts
                );
            }
            Err(err) => {
                log::warn!(
                    "Error retrieving {} {:#x}, attempt {}/{}: {}",
                    what,
                    hash,
                    attempt,
                    retry.max_attempts,
                    err
                );
            }
        }
        if attempt < retry.max_attempts {
            if let Some(delay) = backoff.next_backoff() {
                tokio::time::sleep(delay).await;
            }
        }
    }
    None
}

/// Missing transactions are normal for the mempool feed, so exhaustion yields `None`.
pub async fn fetch_transaction<C: ChainClient + ?Sized>(
    client: &C,
    tx_hash: H256,
    retry: &RetrySettings,
) -> Option<ChainTransaction> {
    let tx = fetch_with_retry("transaction", tx_hash, retry, move || {
        client.get_transaction(tx_hash)
    })
    .await;
    if tx.is_none() {
        log::warn!("Failed to retrieve transaction {:#x}", tx_hash);
    }
    tx
}

pub async fn fetch_receipt<C: ChainClient + ?Sized>(
    client: &C,
    tx_hash: H256,
    retry: &RetrySettings,
) -> Result<ChainReceipt, TrackerError> {
    fetch_with_retry("receipt", tx_hash, retry, move || client.get_receipt(tx_hash))
        .await
        .ok_or_else(|| err_create!(ReceiptUnavailableError::new(tx_hash, retry.max_attempts)))
}

pub async fn fetch_block_transactions<C: ChainClient + ?Sized>(
    client: &C,
    block_hash: H256,
    retry: &RetrySettings,
) -> Result<BlockTransactions, TrackerError> {
    fetch_with_retry("block", block_hash, retry, move || {
        client.get_block_transactions(block_hash)
    })
    .await
    .ok_or_else(|| err_create!(BlockUnavailableError::new(block_hash, retry.max_attempts)))
}
