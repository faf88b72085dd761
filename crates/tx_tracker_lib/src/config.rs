use serde::Deserialize;
use std::collections::btree_map::BTreeMap as Map;

use std::fs;
use std::path::Path;

use crate::error::TrackerError;
use crate::{err_custom_create, err_from};

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub chain: Map<String, Chain>,
    #[serde(default)]
    pub tracker: Tracker,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Chain {
    pub network_id: usize,
    pub rpc_endpoints: Vec<String>,
    pub ws_endpoint: Option<String>,
    pub currency_symbol: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RetryPolicy {
    Fixed,
    Exponential,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", default)]
pub struct Tracker {
    pub max_fetch_attempts: u32,
    pub retry_delay_ms: u64,
    pub retry_policy: RetryPolicy,
    pub max_retry_delay_ms: u64,
    pub allow_status_regression: bool,
    pub max_in_flight: usize,
    pub store_retry_attempts: u32,
    pub reconnect_delay_secs: u64,
}

impl Default for Tracker {
    fn default() -> Self {
        Tracker {
            max_fetch_attempts: 3,
            retry_delay_ms: 1000,
            retry_policy: RetryPolicy::Fixed,
            max_retry_delay_ms: 30000,
            allow_status_regression: false,
            max_in_flight: 32,
            store_retry_attempts: 2,
            reconnect_delay_secs: 5,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TrackerError> {
        Self::parse(&fs::read_to_string(path).map_err(err_from!())?)
    }

    pub fn parse(contents: &str) -> Result<Self, TrackerError> {
        match toml::from_str(contents) {
            Ok(config) => Ok(config),
            Err(e) => Err(err_custom_create!("Failed to parse toml {:?}", e)),
        }
    }
}
