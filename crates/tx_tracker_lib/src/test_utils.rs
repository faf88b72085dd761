use async_trait::async_trait;
use sqlx::SqliteConnection;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use web3::types::{Address, H256, U256};

use crate::db::create_sqlite_connection;
use crate::eth::{BlockTransactions, ChainClient, ChainReceipt, ChainTransaction};
use crate::reconcile::TrackerContext;
use crate::runtime::SharedState;
use crate::setup::{RetrySettings, TrackerSetup};

pub const TX_CALL: &str = "transaction";
pub const RECEIPT_CALL: &str = "receipt";
pub const BLOCK_CALL: &str = "block";

/// Scripted answer for consecutive calls; `Err` is turned into a transport error.
pub type ScriptedRead<T> = Result<Option<T>, String>;

/// Answers reads from per-hash scripts. Once a script runs out its last entry repeats.
/// Unknown hashes read as "not found".
#[derive(Default)]
pub struct MockChainClient {
    transactions: HashMap<H256, Vec<ScriptedRead<ChainTransaction>>>,
    receipts: HashMap<H256, Vec<ScriptedRead<ChainReceipt>>>,
    blocks: HashMap<H256, Vec<ScriptedRead<BlockTransactions>>>,
    calls: std::sync::Mutex<HashMap<(&'static str, H256), usize>>,
}

impl MockChainClient {
    pub fn with_transaction(self, tx: ChainTransaction) -> Self {
        let tx_hash = tx.tx_hash;
        self.with_transaction_script(tx_hash, vec![Ok(Some(tx))])
    }

    pub fn with_transaction_script(
        mut self,
        tx_hash: H256,
        script: Vec<ScriptedRead<ChainTransaction>>,
    ) -> Self {
        self.transactions.insert(tx_hash, script);
        self
    }

    pub fn with_receipt(self, receipt: ChainReceipt) -> Self {
        let tx_hash = receipt.tx_hash;
        self.with_receipt_script(tx_hash, vec![Ok(Some(receipt))])
    }

    pub fn with_receipt_script(
        mut self,
        tx_hash: H256,
        script: Vec<ScriptedRead<ChainReceipt>>,
    ) -> Self {
        self.receipts.insert(tx_hash, script);
        self
    }

    pub fn with_block(mut self, block: BlockTransactions) -> Self {
        self.blocks.insert(block.block_hash, vec![Ok(Some(block))]);
        self
    }

    pub fn calls(&self, kind: &'static str, hash: H256) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&(kind, hash))
            .copied()
            .unwrap_or(0)
    }

    fn next<T: Clone>(
        &self,
        kind: &'static str,
        scripts: &HashMap<H256, Vec<ScriptedRead<T>>>,
        hash: H256,
    ) -> Result<Option<T>, web3::Error> {
        let call_no = {
            let mut calls = self.calls.lock().unwrap();
            let counter = calls.entry((kind, hash)).or_insert(0);
            *counter += 1;
            *counter - 1
        };
        let script = match scripts.get(&hash) {
            Some(script) => script,
            None => return Ok(None),
        };
        match script.get(call_no).or_else(|| script.last()) {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(msg)) => Err(web3::Error::InvalidResponse(msg.clone())),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn get_transaction(
        &self,
        tx_hash: H256,
    ) -> Result<Option<ChainTransaction>, web3::Error> {
        self.next(TX_CALL, &self.transactions, tx_hash)
    }

    async fn get_receipt(&self, tx_hash: H256) -> Result<Option<ChainReceipt>, web3::Error> {
        self.next(RECEIPT_CALL, &self.receipts, tx_hash)
    }

    async fn get_block_transactions(
        &self,
        block_hash: H256,
    ) -> Result<Option<BlockTransactions>, web3::Error> {
        self.next(BLOCK_CALL, &self.blocks, block_hash)
    }
}

pub fn hash(n: u64) -> H256 {
    H256::from_low_u64_be(n)
}

pub fn hash_str(n: u64) -> String {
    format!("{:#x}", hash(n))
}

pub fn sample_tx(tx_hash: H256, value_ether: u64) -> ChainTransaction {
    ChainTransaction {
        tx_hash,
        from: Some(Address::from_low_u64_be(0x456)),
        to: Some(Address::from_low_u64_be(0x789)),
        value: U256::exp10(18) * U256::from(value_ether),
        gas_price: Some(U256::from(30_000_000_000u64)),
        gas_limit: U256::from(21000),
        block_number: None,
    }
}

pub fn sample_receipt(tx_hash: H256, success: bool, gas_used: u64, block: u64) -> ChainReceipt {
    ChainReceipt {
        tx_hash,
        success,
        gas_used: U256::from(gas_used),
        block_number: Some(block),
    }
}

pub fn sample_block(block_hash: H256, block_number: u64, tx_hashes: Vec<H256>) -> BlockTransactions {
    BlockTransactions {
        block_hash,
        block_number: Some(block_number),
        tx_hashes,
    }
}

pub fn fast_retry(max_attempts: u32) -> RetrySettings {
    RetrySettings {
        max_attempts,
        delay: Duration::ZERO,
        ..Default::default()
    }
}

pub fn fast_setup() -> TrackerSetup {
    TrackerSetup {
        retry: fast_retry(3),
        ..Default::default()
    }
}

pub async fn test_conn() -> Arc<Mutex<SqliteConnection>> {
    Arc::new(Mutex::new(
        create_sqlite_connection(None, true).await.unwrap(),
    ))
}

pub async fn test_context(
    client: MockChainClient,
    setup: TrackerSetup,
) -> TrackerContext<MockChainClient> {
    TrackerContext {
        client,
        conn: test_conn().await,
        setup,
        shared_state: Arc::new(Mutex::new(SharedState::default())),
    }
}

/// Makes the next `count` inserts into `tx_status` fail with a database error.
/// `RAISE(FAIL)` keeps the counter update made before it, so every failed write uses one up.
pub async fn fail_next_writes(conn: &Arc<Mutex<SqliteConnection>>, count: u32) {
    let mut conn = conn.lock().await;
    sqlx::query("CREATE TABLE write_faults (remaining INTEGER NOT NULL)")
        .execute(&mut *conn)
        .await
        .unwrap();
    sqlx::query("INSERT INTO write_faults (remaining) VALUES ($1)")
        .bind(count as i64)
        .execute(&mut *conn)
        .await
        .unwrap();
    sqlx::query(
        r"CREATE TRIGGER fail_tx_status_write BEFORE INSERT ON tx_status
WHEN (SELECT remaining FROM write_faults) > 0
BEGIN
    UPDATE write_faults SET remaining = remaining - 1;
    SELECT RAISE(FAIL, 'injected write failure');
END;",
    )
    .execute(&mut *conn)
    .await
    .unwrap();
}
