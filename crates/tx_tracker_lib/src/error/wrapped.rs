use super::bag::ErrorBag;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub struct TrackerError {
    pub inner: ErrorBag,
    pub msg: String,
}

impl TrackerError {
    pub fn new<E: Into<ErrorBag>>(err: E, file: &str, line: u32) -> Self {
        Self {
            inner: err.into(),
            msg: format!("{}:{}", file, line),
        }
    }

    /// Store failures are worth another attempt by the caller, everything else is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self.inner, ErrorBag::StoreUnavailable(_))
    }

    pub fn is_receipt_unavailable(&self) -> bool {
        matches!(self.inner, ErrorBag::ReceiptUnavailable(_))
    }
}

impl Display for TrackerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.inner, self.msg)
    }
}

impl std::error::Error for TrackerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.inner)
    }
}
