use crate::config::{Config, RetryPolicy, Tracker};
use crate::err_custom_create;
use crate::error::TrackerError;
use backoff::ExponentialBackoff;
use std::time::Duration;
use web3::transports::Http;
use web3::Web3;

#[derive(Clone, Debug)]
pub struct ProviderSetup {
    pub provider: Web3<Http>,
    pub endpoint: String,
}

#[derive(Clone, Debug)]
pub struct ChainSetup {
    pub chain_name: String,
    pub chain_id: i64,
    pub providers: Vec<ProviderSetup>,
    pub ws_endpoint: Option<String>,
    pub currency_symbol: String,
}

impl ChainSetup {
    pub fn new(config: &Config, chain_name: &str) -> Result<Self, TrackerError> {
        let chain_config = config
            .chain
            .get(chain_name)
            .ok_or_else(|| err_custom_create!("No chain config for chain name: {}", chain_name))?;
        let mut providers = Vec::new();
        for endp in &chain_config.rpc_endpoints {
            let Ok(transport) = web3::transports::Http::new(endp) else {
                return Err(err_custom_create!("Failed to create transport for endpoint: {}", endp));
            };
            providers.push(ProviderSetup {
                provider: Web3::new(transport),
                endpoint: endp.clone(),
            });
        }
        if providers.is_empty() {
            return Err(err_custom_create!(
                "No rpc endpoints configured for chain: {}",
                chain_name
            ));
        }
        Ok(ChainSetup {
            chain_name: chain_name.to_string(),
            chain_id: chain_config.network_id as i64,
            providers,
            ws_endpoint: chain_config.ws_endpoint.clone(),
            currency_symbol: chain_config
                .currency_symbol
                .clone()
                .unwrap_or_else(|| "ETH".to_string()),
        })
    }
}

/// Retry budget shared by every upstream lookup. One policy is applied everywhere.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay: Duration,
    pub policy: RetryPolicy,
    pub max_delay: Duration,
}

impl RetrySettings {
    /// Delay source for the pauses between attempts. The attempt count, not elapsed
    /// time, ends the retries, so the backoff itself never gives up.
    pub fn backoff(&self) -> ExponentialBackoff {
        let multiplier = match self.policy {
            RetryPolicy::Fixed => 1.0,
            RetryPolicy::Exponential => 2.0,
        };
        ExponentialBackoff {
            current_interval: self.delay,
            initial_interval: self.delay,
            randomization_factor: 0.0,
            multiplier,
            max_interval: self.max_delay.max(self.delay),
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
            policy: RetryPolicy::Fixed,
            max_delay: Duration::from_millis(30000),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TrackerSetup {
    pub retry: RetrySettings,
    pub allow_status_regression: bool,
    pub max_in_flight: usize,
    pub store_retry_attempts: u32,
    pub reconnect_delay: Duration,
}

impl TrackerSetup {
    pub fn new(
        tracker_config: &Tracker,
        max_fetch_attempts: Option<u32>,
    ) -> Result<Self, TrackerError> {
        let max_attempts = max_fetch_attempts.unwrap_or(tracker_config.max_fetch_attempts);
        if max_attempts == 0 {
            return Err(err_custom_create!("max-fetch-attempts has to be at least 1"));
        }
        if tracker_config.max_in_flight == 0 {
            return Err(err_custom_create!("max-in-flight has to be at least 1"));
        }
        Ok(TrackerSetup {
            retry: RetrySettings {
                max_attempts,
                delay: Duration::from_millis(tracker_config.retry_delay_ms),
                policy: tracker_config.retry_policy,
                max_delay: Duration::from_millis(tracker_config.max_retry_delay_ms),
            },
            allow_status_regression: tracker_config.allow_status_regression,
            max_in_flight: tracker_config.max_in_flight,
            store_retry_attempts: tracker_config.store_retry_attempts,
            reconnect_delay: Duration::from_secs(tracker_config.reconnect_delay_secs),
        })
    }
}

impl Default for TrackerSetup {
    fn default() -> Self {
        TrackerSetup {
            retry: RetrySettings::default(),
            allow_status_regression: false,
            max_in_flight: 32,
            store_retry_attempts: 2,
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backoff::backoff::Backoff;

    fn delays(retry: &RetrySettings, count: usize) -> Vec<u128> {
        let mut backoff = retry.backoff();
        (0..count)
            .map(|_| backoff.next_backoff().unwrap().as_millis())
            .collect()
    }

    #[test]
    fn test_fixed_delay() {
        let retry = RetrySettings::default();
        assert_eq!(delays(&retry, 5), vec![1000; 5]);
    }

    #[test]
    fn test_exponential_delay_doubles_and_caps() {
        let retry = RetrySettings {
            policy: RetryPolicy::Exponential,
            max_delay: Duration::from_secs(5),
            ..Default::default()
        };
        assert_eq!(delays(&retry, 6), vec![1000, 2000, 4000, 5000, 5000, 5000]);
    }

    #[test]
    fn test_backoff_never_runs_out() {
        let retry = RetrySettings {
            policy: RetryPolicy::Exponential,
            delay: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(delays(&retry, 50).iter().sum::<u128>(), 0);
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let tracker = Tracker::default();
        assert!(TrackerSetup::new(&tracker, Some(0)).is_err());
        let setup = TrackerSetup::new(&tracker, Some(7)).unwrap();
        assert_eq!(setup.retry.max_attempts, 7);
    }

    #[test]
    fn test_chain_setup_unknown_chain() {
        let config = Config::parse(
            r#"
[chain.polygon]
network-id = 137
rpc-endpoints = ["http://127.0.0.1:8545"]
"#,
        )
        .unwrap();
        assert!(ChainSetup::new(&config, "mumbai").is_err());
        let chain_setup = ChainSetup::new(&config, "polygon").unwrap();
        assert_eq!(chain_setup.chain_id, 137);
        assert_eq!(chain_setup.currency_symbol, "ETH");
    }
}
