mod tx_status_ops;

pub use tx_status_ops::*;
