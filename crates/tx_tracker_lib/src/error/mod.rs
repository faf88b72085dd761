mod bag;
mod custom;
mod wrapped;

pub use bag::ErrorBag;
pub use custom::{BlockUnavailableError, CustomError, ReceiptUnavailableError};
pub use wrapped::TrackerError;

/// Export macros for creating errors
mod macros;
