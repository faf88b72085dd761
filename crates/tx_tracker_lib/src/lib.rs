pub mod config;
pub mod db;
pub mod error;
pub mod eth;
pub mod fetch;
pub mod reconcile;
pub mod runtime;
pub mod server;
pub mod service;
pub mod setup;
pub mod status;
pub mod subscribe;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;
