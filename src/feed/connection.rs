//! Reconnecting WebSocket stream shared by the exchange connectors

use super::SpotPriceSample;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite, tungstenite::Message};

/// Parses one text frame into a sample; unparseable frames yield `None`
pub type FrameParser = fn(&str) -> Option<SpotPriceSample>;

/// Connection errors for exchange streams
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
}

/// Stream connection settings
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Connector name used in logs (e.g., "binance")
    pub name: &'static str,
    /// WebSocket URL
    pub url: String,
    /// Message sent right after connecting, if the venue needs one
    pub subscribe: Option<String>,
    /// Maximum consecutive reconnection attempts (0 = infinite)
    pub max_reconnects: u32,
    /// Initial delay before reconnecting
    pub initial_delay: Duration,
    /// Backoff ceiling
    pub max_delay: Duration,
}

impl StreamConfig {
    /// Create a config with default backoff (1s doubling up to 60s, infinite retries)
    pub fn new(name: &'static str, url: impl Into<String>) -> Self {
        Self {
            name,
            url: url.into(),
            subscribe: None,
            max_reconnects: 0,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }

    /// Set the subscription message
    pub fn subscribe_with(mut self, message: impl Into<String>) -> Self {
        self.subscribe = Some(message.into());
        self
    }
}

enum StreamEnd {
    /// Server closed the socket
    Closed { delivered: bool },
    /// Nobody is listening any more
    ReceiverDropped,
}

/// Run the stream until the receiver goes away or reconnects are exhausted
pub async fn run_stream(config: StreamConfig, parse: FrameParser, tx: mpsc::Sender<SpotPriceSample>) {
    let mut attempts = 0u32;
    let mut delay = config.initial_delay;

    loop {
        match stream_once(&config, parse, &tx).await {
            Ok(StreamEnd::ReceiverDropped) => {
                tracing::debug!(feed = config.name, "Sample receiver dropped, stopping feed");
                return;
            }
            Ok(StreamEnd::Closed { delivered }) => {
                tracing::warn!(feed = config.name, "Feed connection closed by server");
                if delivered {
                    attempts = 0;
                    delay = config.initial_delay;
                }
            }
            Err(e) => {
                tracing::warn!(feed = config.name, error = %e, "Feed connection error");
            }
        }

        if tx.is_closed() {
            return;
        }

        attempts += 1;
        if config.max_reconnects > 0 && attempts > config.max_reconnects {
            tracing::error!(feed = config.name, attempts, "Max reconnection attempts reached");
            return;
        }

        tracing::info!(feed = config.name, attempt = attempts, delay_ms = delay.as_millis() as u64, "Reconnecting");
        sleep(delay).await;
        delay = (delay * 2).min(config.max_delay);
    }
}

async fn stream_once(
    config: &StreamConfig,
    parse: FrameParser,
    tx: &mpsc::Sender<SpotPriceSample>,
) -> Result<StreamEnd, FeedError> {
    let (ws_stream, _response) = connect_async(config.url.as_str()).await?;
    let (mut write, mut read) = ws_stream.split();

    tracing::info!(feed = config.name, url = %config.url, "Feed connected");

    if let Some(subscribe) = &config.subscribe {
        write.send(Message::Text(subscribe.clone())).await?;
    }

    let mut delivered = false;
    while let Some(frame) = read.next().await {
        match frame? {
            Message::Text(text) => {
                if let Some(sample) = parse(&text) {
                    if tx.send(sample).await.is_err() {
                        return Ok(StreamEnd::ReceiverDropped);
                    }
                    delivered = true;
                }
            }
            Message::Ping(payload) => write.send(Message::Pong(payload)).await?,
            Message::Close(_) => break,
            _ => {}
        }
    }

    Ok(StreamEnd::Closed { delivered })
}
