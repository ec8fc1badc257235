//! Gamma API quote feed
//!
//! Polls Polymarket's Gamma `/events` endpoint for active crypto up/down
//! events and turns each open market into a [`MarketQuote`]. The event's
//! start is the window open that the market settles against.

use super::{MarketKind, MarketQuote, QuoteFeed, TokenPair};
use crate::feed::Asset;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc;

/// Gamma API base URL
pub const GAMMA_API_URL: &str = "https://gamma-api.polymarket.com";

/// Configuration for the Gamma quote feed
#[derive(Debug, Clone)]
pub struct GammaConfig {
    /// Base URL for the Gamma API
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Delay between polls
    pub poll_interval: Duration,
    /// Event tag to query
    pub tag_slug: String,
    /// Events per poll, newest first
    pub limit: u32,
}

impl Default for GammaConfig {
    fn default() -> Self {
        Self {
            base_url: GAMMA_API_URL.to_string(),
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(1),
            tag_slug: "up-or-down".to_string(),
            limit: 50,
        }
    }
}

/// Polling quote feed backed by the Gamma API
pub struct GammaQuoteFeed {
    config: GammaConfig,
    client: Client,
    assets: Vec<Asset>,
}

impl GammaQuoteFeed {
    /// Create a feed emitting quotes for the given assets
    pub fn new(config: GammaConfig, assets: Vec<Asset>) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            config,
            client,
            assets,
        })
    }
}

async fn fetch_quotes(
    client: &Client,
    config: &GammaConfig,
    assets: &[Asset],
) -> anyhow::Result<Vec<MarketQuote>> {
    let url = format!("{}/events", config.base_url.trim_end_matches('/'));
    let limit = config.limit.to_string();

    let response = client
        .get(&url)
        .query(&[
            ("tag_slug", config.tag_slug.as_str()),
            ("active", "true"),
            ("closed", "false"),
            ("order", "startDate"),
            ("ascending", "false"),
            ("limit", limit.as_str()),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Gamma API error: {} - {}", status, body);
    }

    let events: Vec<GammaEvent> = response.json().await?;
    let quotes = quotes_from_events(events, assets, Utc::now());

    tracing::debug!(quotes = quotes.len(), "Fetched Gamma quotes");
    Ok(quotes)
}

#[async_trait]
impl QuoteFeed for GammaQuoteFeed {
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<MarketQuote>> {
        let (tx, rx) = mpsc::channel(1024);
        let client = self.client.clone();
        let config = self.config.clone();
        let assets = self.assets.clone();

        tracing::info!(
            tag = %config.tag_slug,
            interval_ms = config.poll_interval.as_millis() as u64,
            "Starting Gamma quote polling"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                match fetch_quotes(&client, &config, &assets).await {
                    Ok(quotes) => {
                        for quote in quotes {
                            if tx.send(quote).await.is_err() {
                                tracing::debug!("Quote receiver dropped, stopping Gamma polling");
                                return;
                            }
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "Gamma poll failed"),
                }
            }
        });

        Ok(rx)
    }
}

/// Event returned by `/events`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GammaEvent {
    title: String,
    start_date: Option<String>,
    start_time: Option<String>,
    #[serde(default)]
    markets: Vec<GammaMarket>,
}

/// Market nested inside an event
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GammaMarket {
    id: String,
    question: String,
    #[serde(default)]
    active: bool,
    #[serde(default)]
    closed: bool,
    clob_token_ids: Option<JsonList>,
    outcome_prices: Option<JsonList>,
    event_start_time: Option<String>,
}

/// Gamma encodes list fields either as a JSON array or as a string holding one
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonList {
    Encoded(String),
    List(Vec<serde_json::Value>),
}

impl JsonList {
    fn into_strings(self) -> Option<Vec<String>> {
        let values = match self {
            JsonList::Encoded(s) => serde_json::from_str::<Vec<serde_json::Value>>(&s).ok()?,
            JsonList::List(values) => values,
        };
        Some(
            values
                .into_iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
        )
    }
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw?)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Convert events into quotes for the tracked assets
fn quotes_from_events(
    events: Vec<GammaEvent>,
    assets: &[Asset],
    now: DateTime<Utc>,
) -> Vec<MarketQuote> {
    let mut quotes = Vec::new();

    for event in events {
        let Some(asset) = Asset::from_title(&event.title) else {
            continue;
        };
        if !assets.contains(&asset) {
            continue;
        }

        let event_start = parse_timestamp(event.start_time.as_deref())
            .or_else(|| parse_timestamp(event.start_date.as_deref()));

        for market in event.markets {
            if !market.active || market.closed {
                continue;
            }

            let Some(prices) = market.outcome_prices.and_then(JsonList::into_strings) else {
                continue;
            };
            let Some(yes_price) = prices.first().and_then(|p| Decimal::from_str(p).ok()) else {
                tracing::trace!(market_id = %market.id, "Unparseable outcome prices");
                continue;
            };
            let no_price = prices.get(1).and_then(|p| Decimal::from_str(p).ok());

            let token_ids = market
                .clob_token_ids
                .and_then(JsonList::into_strings)
                .and_then(|ids| TokenPair::from_list(&ids));

            let anchor_timestamp =
                parse_timestamp(market.event_start_time.as_deref()).or(event_start);

            quotes.push(MarketQuote {
                asset,
                market_kind: MarketKind::classify(&market.question),
                market_id: market.id,
                question: market.question,
                yes_price,
                no_price,
                anchor_timestamp,
                token_ids,
                timestamp: now,
            });
        }
    }

    quotes
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const EVENTS: &str = r#"[
        {
            "id": "9001",
            "title": "Bitcoin Up or Down - October 16, 3:00PM-3:15PM ET",
            "startDate": "2024-10-15T19:00:00Z",
            "startTime": "2024-10-16T19:00:00Z",
            "markets": [
                {
                    "id": "501",
                    "question": "Bitcoin Up or Down - October 16, 3:00PM-3:15PM ET",
                    "active": true,
                    "closed": false,
                    "clobTokenIds": "[\"111\", \"222\"]",
                    "outcomePrices": "[\"0.62\", \"0.38\"]"
                },
                {
                    "id": "502",
                    "question": "Bitcoin Up or Down - closed",
                    "active": true,
                    "closed": true,
                    "outcomePrices": "[\"1\", \"0\"]"
                }
            ]
        },
        {
            "id": "9002",
            "title": "Solana Up or Down - October 16",
            "startDate": "2024-10-16T18:45:00Z",
            "markets": [
                {
                    "id": "601",
                    "question": "Solana Up or Down - October 16",
                    "active": true,
                    "closed": false,
                    "clobTokenIds": ["333", "444"],
                    "outcomePrices": ["0.5"],
                    "eventStartTime": "2024-10-16T18:50:00Z"
                }
            ]
        },
        {
            "id": "9003",
            "title": "XRP Up or Down",
            "markets": [
                {"id": "701", "question": "XRP Up or Down", "active": true, "closed": false, "outcomePrices": "[\"0.5\",\"0.5\"]"}
            ]
        }
    ]"#;

    fn parse(assets: &[Asset]) -> Vec<MarketQuote> {
        let events: Vec<GammaEvent> = serde_json::from_str(EVENTS).unwrap();
        quotes_from_events(events, assets, Utc::now())
    }

    #[test]
    fn test_gamma_config_default() {
        let config = GammaConfig::default();
        assert_eq!(config.base_url, GAMMA_API_URL);
        assert_eq!(config.tag_slug, "up-or-down");
        assert_eq!(config.limit, 50);
    }

    #[test]
    fn test_quotes_from_encoded_lists() {
        let quotes = parse(&Asset::ALL);
        assert_eq!(quotes.len(), 2);

        let btc = &quotes[0];
        assert_eq!(btc.asset, Asset::Btc);
        assert_eq!(btc.market_id, "501");
        assert_eq!(btc.yes_price, dec!(0.62));
        assert_eq!(btc.no_price, Some(dec!(0.38)));
        assert_eq!(btc.market_kind, MarketKind::UpDown);
        assert_eq!(btc.token_ids, Some(TokenPair::new("111", "222")));
        assert_eq!(
            btc.anchor_timestamp.unwrap().to_rfc3339(),
            "2024-10-16T19:00:00+00:00"
        );
    }

    #[test]
    fn test_quotes_from_plain_lists() {
        let quotes = parse(&Asset::ALL);
        let sol = &quotes[1];
        assert_eq!(sol.asset, Asset::Sol);
        assert_eq!(sol.yes_price, dec!(0.5));
        assert_eq!(sol.no_price, None);
        assert_eq!(sol.token_ids, Some(TokenPair::new("333", "444")));
        // Market-level start takes precedence over the event start date
        assert_eq!(
            sol.anchor_timestamp.unwrap().to_rfc3339(),
            "2024-10-16T18:50:00+00:00"
        );
    }

    #[test]
    fn test_quotes_filtered_by_tracked_assets() {
        let quotes = parse(&[Asset::Sol]);
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].asset, Asset::Sol);
    }

    #[test]
    fn test_json_list_rejects_garbage() {
        assert!(JsonList::Encoded("not json".to_string()).into_strings().is_none());
    }

    #[tokio::test]
    async fn test_feed_creation() {
        let feed = GammaQuoteFeed::new(GammaConfig::default(), Asset::ALL.to_vec()).unwrap();
        assert_eq!(feed.assets.len(), 3);
    }
}
