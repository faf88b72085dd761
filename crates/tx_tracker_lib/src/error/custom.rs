use std::fmt::{Display, Formatter};
use web3::types::H256;

#[derive(Debug, Clone)]
pub struct CustomError {
    pub msg: String,
}

impl CustomError {
    pub fn from_owned_string(msg: String) -> Self {
        Self { msg }
    }
}

impl Display for CustomError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl std::error::Error for CustomError {}

/// Receipt lookup gave nothing after the whole retry budget was spent.
#[derive(Debug, Clone)]
pub struct ReceiptUnavailableError {
    pub tx_hash: H256,
    pub attempts: u32,
}

impl ReceiptUnavailableError {
    pub fn new(tx_hash: H256, attempts: u32) -> Self {
        Self { tx_hash, attempts }
    }
}

impl Display for ReceiptUnavailableError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Failed to retrieve receipt for transaction {:#x} after {} attempts",
            self.tx_hash, self.attempts
        )
    }
}

impl std::error::Error for ReceiptUnavailableError {}

#[derive(Debug, Clone)]
pub struct BlockUnavailableError {
    pub block_hash: H256,
    pub attempts: u32,
}

impl BlockUnavailableError {
    pub fn new(block_hash: H256, attempts: u32) -> Self {
        Self {
            block_hash,
            attempts,
        }
    }
}

impl Display for BlockUnavailableError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Failed to retrieve block {:#x} after {} attempts",
            self.block_hash, self.attempts
        )
    }
}

impl std::error::Error for BlockUnavailableError {}
