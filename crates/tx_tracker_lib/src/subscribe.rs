use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::time::Duration;
use tokio::sync::mpsc;
use web3::futures::StreamExt;
use web3::transports::WebSocket;
use web3::types::H256;
use web3::Web3;

use crate::err_from;
use crate::error::TrackerError;
use crate::eth::NewBlockEvent;

const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);

/// Reconnect pauses start at `reconnect_delay` and double up to a minute.
fn reconnect_backoff(reconnect_delay: Duration) -> ExponentialBackoff {
    ExponentialBackoff {
        current_interval: reconnect_delay,
        initial_interval: reconnect_delay,
        randomization_factor: 0.1,
        multiplier: 2.0,
        max_interval: MAX_RECONNECT_DELAY.max(reconnect_delay),
        max_elapsed_time: None,
        ..Default::default()
    }
}

async fn pause_before_reconnect(backoff: &mut ExponentialBackoff) {
    let delay = backoff.next_backoff().unwrap_or(backoff.max_interval);
    log::info!("Resubscribing in {:?}", delay);
    tokio::time::sleep(delay).await;
}

#[derive(Debug, PartialEq, Eq)]
enum FeedEnd {
    StreamEnded,
    ConsumerClosed,
}

async fn forward_pending_transactions(
    ws_endpoint: &str,
    sender: &mpsc::Sender<H256>,
) -> Result<FeedEnd, TrackerError> {
    let transport = WebSocket::new(ws_endpoint).await.map_err(err_from!())?;
    let web3 = Web3::new(transport);
    let mut stream = web3
        .eth_subscribe()
        .subscribe_new_pending_transactions()
        .await
        .map_err(err_from!())?;
    log::info!("Subscribed to pending transactions on {}", ws_endpoint);

    while let Some(item) = stream.next().await {
        match item {
            Ok(tx_hash) => {
                if sender.send(tx_hash).await.is_err() {
                    return Ok(FeedEnd::ConsumerClosed);
                }
            }
            Err(err) => log::error!("Pending transaction subscription error: {}", err),
        }
    }
    Ok(FeedEnd::StreamEnded)
}

async fn forward_new_heads(
    ws_endpoint: &str,
    sender: &mpsc::Sender<NewBlockEvent>,
) -> Result<FeedEnd, TrackerError> {
    let transport = WebSocket::new(ws_endpoint).await.map_err(err_from!())?;
    let web3 = Web3::new(transport);
    let mut stream = web3
        .eth_subscribe()
        .subscribe_new_heads()
        .await
        .map_err(err_from!())?;
    log::info!("Subscribed to new block headers on {}", ws_endpoint);

    while let Some(item) = stream.next().await {
        match item {
            Ok(header) => {
                let block_hash = match header.hash {
                    Some(block_hash) => block_hash,
                    None => {
                        log::debug!("Skipping header without hash");
                        continue;
                    }
                };
                let event = NewBlockEvent {
                    block_hash,
                    block_number: header.number.map(|n| n.as_u64()),
                };
                if sender.send(event).await.is_err() {
                    return Ok(FeedEnd::ConsumerClosed);
                }
            }
            Err(err) => log::error!("New block subscription error: {}", err),
        }
    }
    Ok(FeedEnd::StreamEnded)
}

/// Keeps the pending transaction feed alive, resubscribing with a growing pause
/// starting at `reconnect_delay` whenever the connection drops. Returns once the
/// consumer side is gone.
pub async fn run_pending_feed(
    ws_endpoint: String,
    sender: mpsc::Sender<H256>,
    reconnect_delay: Duration,
) {
    let mut backoff = reconnect_backoff(reconnect_delay);
    loop {
        match forward_pending_transactions(&ws_endpoint, &sender).await {
            Ok(FeedEnd::ConsumerClosed) => return,
            Ok(FeedEnd::StreamEnded) => {
                // the subscription worked, start over from the shortest pause
                log::warn!("Pending transaction subscription ended");
                backoff.reset();
            }
            Err(err) => log::error!("Pending transaction subscription failed: {}", err),
        }
        if sender.is_closed() {
            return;
        }
        pause_before_reconnect(&mut backoff).await;
    }
}

/// Same as [`run_pending_feed`] for block headers.
pub async fn run_block_feed(
    ws_endpoint: String,
    sender: mpsc::Sender<NewBlockEvent>,
    reconnect_delay: Duration,
) {
    let mut backoff = reconnect_backoff(reconnect_delay);
    loop {
        match forward_new_heads(&ws_endpoint, &sender).await {
            Ok(FeedEnd::ConsumerClosed) => return,
            Ok(FeedEnd::StreamEnded) => {
                // the subscription worked, start over from the shortest pause
                log::warn!("New block subscription ended");
                backoff.reset();
            }
            Err(err) => log::error!("New block subscription failed: {}", err),
        }
        if sender.is_closed() {
            return;
        }
        pause_before_reconnect(&mut backoff).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnect_backoff_grows_and_resets() {
        let mut backoff = reconnect_backoff(Duration::from_secs(20));
        let mut delays = Vec::new();
        for _ in 0..4 {
            delays.push(backoff.next_backoff().unwrap());
        }
        // 20s, 40s, then capped at a minute, each within 10% jitter
        for (delay, expected) in delays.iter().zip([20.0, 40.0, 60.0, 60.0]) {
            let secs = delay.as_secs_f64();
            assert!(secs >= expected * 0.9 && secs <= expected * 1.1 + 0.001, "{:?}", delay);
        }
        backoff.reset();
        assert!(backoff.next_backoff().unwrap() <= Duration::from_secs(23));
    }

    #[tokio::test]
    async fn test_feed_stops_when_consumer_gone() {
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);
        // nothing listens on this port, the connect fails and the closed channel ends the loop
        tokio::time::timeout(
            Duration::from_secs(10),
            run_pending_feed(
                "ws://127.0.0.1:1".to_string(),
                sender,
                Duration::from_millis(10),
            ),
        )
        .await
        .unwrap();
    }
}
