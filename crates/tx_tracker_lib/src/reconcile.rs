use sqlx::SqliteConnection;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use web3::types::H256;

use crate::db::model::{TxIdentity, TxStatusDao};
use crate::db::ops::*;
use crate::err_from;
use crate::error::TrackerError;
use crate::eth::{ChainClient, ChainReceipt, ChainTransaction, NewBlockEvent};
use crate::fetch::{fetch_block_transactions, fetch_receipt, fetch_transaction};
use crate::runtime::SharedState;
use crate::setup::TrackerSetup;
use crate::status::{classify, TxStatus};
use crate::utils::{u256_to_i64, wei_to_ether_str, wei_to_gwei_str};

/// Everything the handlers need, passed in explicitly so a mock client can stand in.
pub struct TrackerContext<C: ChainClient> {
    pub client: C,
    pub conn: Arc<Mutex<SqliteConnection>>,
    pub setup: TrackerSetup,
    pub shared_state: Arc<Mutex<SharedState>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CandidateOutcome {
    /// First sighting, record created as Pending.
    Created(TxStatusDao),
    /// Seen again while not yet final.
    Requeued,
    /// Record already final and left alone.
    Unchanged(Option<TxStatus>),
}

#[derive(Debug, Clone, Default)]
pub struct BlockReport {
    pub block_hash: H256,
    pub block_number: Option<u64>,
    pub reconciled: Vec<(H256, TxStatus)>,
    pub receipts_unavailable: Vec<H256>,
    pub failed: Vec<(H256, String)>,
}

/// Builds the identity columns. Values that cannot be represented are stored as null.
pub fn identity_from_chain(
    tx_hash: H256,
    tx: Option<&ChainTransaction>,
    receipt: Option<&ChainReceipt>,
    block_number: Option<u64>,
) -> TxIdentity {
    let mut identity = TxIdentity {
        tx_hash: format!("{:#x}", tx_hash),
        gas_used: receipt.and_then(|r| u256_to_i64(r.gas_used)),
        block_number: receipt
            .and_then(|r| r.block_number)
            .or_else(|| tx.and_then(|tx| tx.block_number))
            .or(block_number)
            .map(|n| n as i64),
        ..Default::default()
    };
    if let Some(tx) = tx {
        identity.from_addr = tx.from.map(|addr| format!("{:#x}", addr));
        identity.to_addr = tx.to.map(|addr| format!("{:#x}", addr));
        identity.value_ether = match wei_to_ether_str(tx.value) {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("Cannot store value of {}: {}", identity.tx_hash, err);
                None
            }
        };
        identity.gas_price_gwei = match tx.gas_price.map(wei_to_gwei_str).transpose() {
            Ok(gas_price) => gas_price,
            Err(err) => {
                log::warn!("Cannot store gas price of {}: {}", identity.tx_hash, err);
                None
            }
        };
        identity.gas_limit = u256_to_i64(tx.gas_limit);
    }
    identity
}

/// Handles a hash seen on the pending feed.
///
/// Unknown hashes are created as Pending. Known ones move to Queued unless they are
/// already final and regression is disabled.
pub async fn handle_candidate_hash<C: ChainClient>(
    ctx: &TrackerContext<C>,
    tx_hash: H256,
) -> Result<CandidateOutcome, TrackerError> {
    let tx = fetch_transaction(&ctx.client, tx_hash, &ctx.setup.retry).await;
    let identity = identity_from_chain(tx_hash, tx.as_ref(), None, None);

    let mut conn = ctx.conn.lock().await;
    if let Some(created) = insert_tx_status_if_absent(&mut conn, &identity, TxStatus::Pending)
        .await
        .map_err(err_from!())?
    {
        log::info!("Transaction {} status: {}", created.tx_hash, created.status);
        return Ok(CandidateOutcome::Created(created));
    }

    let filter = if ctx.setup.allow_status_regression {
        None
    } else {
        Some(TX_FILTER_NOT_TERMINAL)
    };
    if update_tx_status(&mut conn, &identity.tx_hash, TxStatus::Queued, filter)
        .await
        .map_err(err_from!())?
    {
        log::info!("Transaction {} status: {}", identity.tx_hash, TxStatus::Queued);
        return Ok(CandidateOutcome::Requeued);
    }

    let current = get_tx_status(&mut conn, &identity.tx_hash)
        .await
        .map_err(err_from!())?
        .map(|dao| TxStatus::from_str(&dao.status))
        .transpose()
        .map_err(err_from!())?;
    log::debug!(
        "Transaction {} already final ({:?}), not requeued",
        identity.tx_hash,
        current
    );
    Ok(CandidateOutcome::Unchanged(current))
}

/// Classifies one mined transaction and writes the result. Nothing is written when the
/// receipt cannot be read.
pub async fn reconcile_block_tx<C: ChainClient>(
    ctx: &TrackerContext<C>,
    tx_hash: H256,
    block_number: Option<u64>,
) -> Result<TxStatus, TrackerError> {
    let tx = fetch_transaction(&ctx.client, tx_hash, &ctx.setup.retry).await;
    let receipt = fetch_receipt(&ctx.client, tx_hash, &ctx.setup.retry).await?;
    let status = classify(tx.as_ref(), &receipt);
    let identity = identity_from_chain(tx_hash, tx.as_ref(), Some(&receipt), block_number);

    let dao = {
        let mut conn = ctx.conn.lock().await;
        reconcile_tx_status(&mut conn, &identity, status)
            .await
            .map_err(err_from!())?
    };
    log::info!("Transaction {} status: {}", dao.tx_hash, status);
    Ok(status)
}

/// Reconciles every transaction of a new block, one after another. A failing hash is
/// reported and skipped, the rest of the block still gets processed.
pub async fn handle_new_block<C: ChainClient>(
    ctx: &TrackerContext<C>,
    event: NewBlockEvent,
) -> Result<BlockReport, TrackerError> {
    log::info!("New block header: {:#x}", event.block_hash);
    let block = fetch_block_transactions(&ctx.client, event.block_hash, &ctx.setup.retry).await?;
    let mut report = BlockReport {
        block_hash: event.block_hash,
        block_number: block.block_number.or(event.block_number),
        ..Default::default()
    };
    log::debug!(
        "Block {:#x} carries {} transactions",
        event.block_hash,
        block.tx_hashes.len()
    );

    for tx_hash in block.tx_hashes {
        match reconcile_block_tx(ctx, tx_hash, report.block_number).await {
            Ok(status) => report.reconciled.push((tx_hash, status)),
            Err(err) if err.is_receipt_unavailable() => {
                log::error!("Error retrieving transaction receipt: {}", err);
                report.receipts_unavailable.push(tx_hash);
            }
            Err(err) => {
                log::error!("Failed to store status of {:#x}: {}", tx_hash, err);
                report.failed.push((tx_hash, err.to_string()));
            }
        }
    }
    Ok(report)
}
