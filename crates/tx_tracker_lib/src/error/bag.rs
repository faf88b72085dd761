use super::custom::{BlockUnavailableError, CustomError, ReceiptUnavailableError};
use crate::utils::ConversionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ErrorBag {
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
    #[error("web3 error: {0}")]
    Web3Error(#[from] web3::Error),
    #[error("{0}")]
    ConversionError(#[from] ConversionError),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("{0}")]
    ReceiptUnavailable(#[from] ReceiptUnavailableError),
    #[error("{0}")]
    BlockUnavailable(#[from] BlockUnavailableError),
    #[error("{0}")]
    CustomError(#[from] CustomError),
}
