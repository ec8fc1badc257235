//! poly-lag: latency-arbitrage bot for Polymarket crypto up/down markets
//!
//! This library provides the core components for:
//! - Real-time spot price feeds from Binance and Coinbase
//! - Cross-exchange spot aggregation
//! - Market quote polling via the Gamma API
//! - Window-open reference prices from historical candles
//! - Lag detection between spot moves and market odds
//! - Simulated, monitor-only and live position management
//! - Durable trade ledger and daily reporting
//! - Structured logging and Prometheus metrics

pub mod aggregator;
pub mod app;
pub mod cli;
pub mod config;
pub mod execution;
pub mod feed;
pub mod lag;
pub mod market;
pub mod position;
pub mod reference;
pub mod store;
pub mod telemetry;
