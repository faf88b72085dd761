use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use web3::types::U256;

use crate::eth::{ChainReceipt, ChainTransaction};
use crate::utils::ConversionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxStatus {
    Pending,
    Queued,
    Confirmed,
    Cancelled,
    Failed,
}

pub const ALL_STATUSES: [TxStatus; 5] = [
    TxStatus::Pending,
    TxStatus::Queued,
    TxStatus::Confirmed,
    TxStatus::Cancelled,
    TxStatus::Failed,
];

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "Pending",
            TxStatus::Queued => "Queued",
            TxStatus::Confirmed => "Confirmed",
            TxStatus::Cancelled => "Cancelled",
            TxStatus::Failed => "Failed",
        }
    }

    /// Reached only after block inclusion and receipt evaluation.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TxStatus::Confirmed | TxStatus::Cancelled | TxStatus::Failed
        )
    }
}

impl Display for TxStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TxStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_STATUSES
            .iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| ConversionError::from(format!("Unknown tx status: {}", s)))
    }
}

/// Terminal status of a transaction found in a block.
///
/// A failed execution that still carried value counts as a cancelled transfer.
/// A transaction that could not be fetched is treated as carrying no value.
pub fn classify(tx: Option<&ChainTransaction>, receipt: &ChainReceipt) -> TxStatus {
    if receipt.success && !receipt.gas_used.is_zero() {
        TxStatus::Confirmed
    } else if tx.map(|tx| tx.value > U256::zero()).unwrap_or(false) {
        TxStatus::Cancelled
    } else {
        TxStatus::Failed
    }
}
