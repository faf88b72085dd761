use serde::Serialize;
use sqlx::SqliteConnection;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::db::create_sqlite_connection;
use crate::err_custom_create;
use crate::error::TrackerError;
use crate::eth::Web3ChainClient;
use crate::reconcile::TrackerContext;
use crate::service::{block_loop, candidate_loop};
use crate::setup::{ChainSetup, TrackerSetup};
use crate::subscribe::{run_block_feed, run_pending_feed};

const FEED_CHANNEL_CAPACITY: usize = 1000;

/// Counters shared between the feed handlers and the status server.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedState {
    pub candidates_seen: u64,
    pub candidates_created: u64,
    pub candidates_requeued: u64,
    pub blocks_processed: u64,
    pub blocks_unavailable: u64,
    pub txs_reconciled: u64,
    pub receipts_unavailable: u64,
    pub store_failures: u64,
    pub last_block_number: Option<u64>,
}

pub struct TrackerRuntime {
    pub runtime_handle: JoinHandle<()>,
    pub setup: TrackerSetup,
    pub chain_setup: ChainSetup,
    pub shared_state: Arc<Mutex<SharedState>>,
    pub conn: Arc<Mutex<SqliteConnection>>,
}

pub async fn start_tracker_engine(
    db_filename: &str,
    chain_setup: ChainSetup,
    setup: TrackerSetup,
) -> Result<TrackerRuntime, TrackerError> {
    let ws_endpoint = chain_setup.ws_endpoint.clone().ok_or_else(|| {
        err_custom_create!(
            "No websocket endpoint configured for chain {}",
            chain_setup.chain_name
        )
    })?;
    log::info!(
        "Tracking chain {} (id {}, currency {})",
        chain_setup.chain_name,
        chain_setup.chain_id,
        chain_setup.currency_symbol
    );
    log::debug!("Starting tracker engine: {:#?}", setup);

    log::info!("connecting to sqlite file db: {}", db_filename);
    let conn = create_sqlite_connection(Some(db_filename), true).await?;
    let conn2 = create_sqlite_connection(Some(db_filename), false).await?;

    let shared_state = Arc::new(Mutex::new(SharedState::default()));
    let ctx = Arc::new(TrackerContext {
        client: Web3ChainClient::new(chain_setup.clone()),
        conn: Arc::new(Mutex::new(conn)),
        setup: setup.clone(),
        shared_state: shared_state.clone(),
    });

    let (pending_sender, pending_receiver) = mpsc::channel(FEED_CHANNEL_CAPACITY);
    let (block_sender, block_receiver) = mpsc::channel(FEED_CHANNEL_CAPACITY);
    let reconnect_delay = setup.reconnect_delay;
    let jh = tokio::spawn(async move {
        tokio::join!(
            run_pending_feed(ws_endpoint.clone(), pending_sender, reconnect_delay),
            run_block_feed(ws_endpoint, block_sender, reconnect_delay),
            candidate_loop(ctx.clone(), pending_receiver),
            block_loop(ctx, block_receiver),
        );
    });

    Ok(TrackerRuntime {
        runtime_handle: jh,
        setup,
        chain_setup,
        shared_state,
        conn: Arc::new(Mutex::new(conn2)),
    })
}
