use async_trait::async_trait;
use rand::Rng;
use web3::transports::Http;
use web3::types::{Address, BlockId, TransactionId, H256, U256, U64};
use web3::Web3;

use crate::setup::ChainSetup;

/// Transaction as seen by the tracker, trimmed to the fields it stores or classifies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTransaction {
    pub tx_hash: H256,
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub value: U256,
    pub gas_price: Option<U256>,
    pub gas_limit: U256,
    pub block_number: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReceipt {
    pub tx_hash: H256,
    pub success: bool,
    pub gas_used: U256,
    pub block_number: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTransactions {
    pub block_hash: H256,
    pub block_number: Option<u64>,
    pub tx_hashes: Vec<H256>,
}

/// Header delivered by the new block feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewBlockEvent {
    pub block_hash: H256,
    pub block_number: Option<u64>,
}

/// Upstream reads the tracker depends on. `Ok(None)` means the node does not know the
/// object (yet), errors are transport level failures.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_transaction(&self, tx_hash: H256)
        -> Result<Option<ChainTransaction>, web3::Error>;

    async fn get_receipt(&self, tx_hash: H256) -> Result<Option<ChainReceipt>, web3::Error>;

    async fn get_block_transactions(
        &self,
        block_hash: H256,
    ) -> Result<Option<BlockTransactions>, web3::Error>;
}

impl From<web3::types::Transaction> for ChainTransaction {
    fn from(tx: web3::types::Transaction) -> Self {
        ChainTransaction {
            tx_hash: tx.hash,
            from: tx.from,
            to: tx.to,
            value: tx.value,
            // type 2 transactions carry no gas price until mined
            gas_price: tx.gas_price.or(tx.max_fee_per_gas),
            gas_limit: tx.gas,
            block_number: tx.block_number.map(|n| n.as_u64()),
        }
    }
}

impl From<web3::types::TransactionReceipt> for ChainReceipt {
    fn from(receipt: web3::types::TransactionReceipt) -> Self {
        ChainReceipt {
            tx_hash: receipt.transaction_hash,
            success: receipt.status == Some(U64::from(1)),
            gas_used: receipt.gas_used.unwrap_or_default(),
            block_number: receipt.block_number.map(|n| n.as_u64()),
        }
    }
}

/// Reads through the HTTP providers configured for a chain, picking one at random per call.
#[derive(Clone, Debug)]
pub struct Web3ChainClient {
    pub chain_setup: ChainSetup,
}

impl Web3ChainClient {
    pub fn new(chain_setup: ChainSetup) -> Self {
        Self { chain_setup }
    }

    fn provider(&self) -> Result<&Web3<Http>, web3::Error> {
        let providers = &self.chain_setup.providers;
        if providers.is_empty() {
            return Err(web3::Error::InvalidResponse(format!(
                "No providers found for chain id: {}",
                self.chain_setup.chain_id
            )));
        }
        let idx = rand::thread_rng().gen_range(0..providers.len());
        Ok(&providers[idx].provider)
    }
}

#[async_trait]
impl ChainClient for Web3ChainClient {
    async fn get_transaction(
        &self,
        tx_hash: H256,
    ) -> Result<Option<ChainTransaction>, web3::Error> {
        let tx = self
            .provider()?
            .eth()
            .transaction(TransactionId::Hash(tx_hash))
            .await?;
        Ok(tx.map(ChainTransaction::from))
    }

    async fn get_receipt(&self, tx_hash: H256) -> Result<Option<ChainReceipt>, web3::Error> {
        let receipt = self.provider()?.eth().transaction_receipt(tx_hash).await?;
        Ok(receipt.map(ChainReceipt::from))
    }

    async fn get_block_transactions(
        &self,
        block_hash: H256,
    ) -> Result<Option<BlockTransactions>, web3::Error> {
        let block = self
            .provider()?
            .eth()
            .block(BlockId::Hash(block_hash))
            .await?;
        Ok(block.map(|block| BlockTransactions {
            block_hash,
            block_number: block.number.map(|n| n.as_u64()),
            tx_hashes: block.transactions,
        }))
    }
}
