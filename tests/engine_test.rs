//! End-to-end engine tests: spot samples and quotes in, trades out

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use poly_lag::aggregator::PriceAggregator;
use poly_lag::app::Bot;
use poly_lag::config::{EngineConfig, LagConfig, TradingMode};
use poly_lag::execution::{OrderSide, PaperExecutor};
use poly_lag::feed::{Asset, SpotPriceSample};
use poly_lag::lag::LagStrategy;
use poly_lag::market::{MarketKind, MarketQuote, TokenPair};
use poly_lag::position::{Direction, ExitReason, PositionManager, TradeStatus};
use poly_lag::reference::{CandleError, CandleSource, ReferenceResolver};
use poly_lag::store::{MemoryTradeStore, TradeStore};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

struct WindowOpen(Decimal);

#[async_trait]
impl CandleSource for WindowOpen {
    fn name(&self) -> &'static str {
        "window-open"
    }

    async fn open_price(
        &self,
        _asset: Asset,
        _at: DateTime<Utc>,
    ) -> Result<Option<Decimal>, CandleError> {
        Ok(Some(self.0))
    }
}

fn anchor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 14, 0, 0).unwrap()
}

fn bot(mode: TradingMode, store: MemoryTradeStore, executor: Option<PaperExecutor>) -> Bot {
    let resolver = ReferenceResolver::new(
        vec![Box::new(WindowOpen(dec!(100000)))],
        Duration::from_secs(60),
        Duration::from_secs(5),
    );
    let positions = PositionManager::new(
        EngineConfig {
            mode,
            ..EngineConfig::default()
        },
        Box::new(store),
        executor.map(|e| Arc::new(e) as Arc<dyn poly_lag::execution::OrderExecutor>),
    )
    .unwrap();

    Bot::new(
        PriceAggregator::new(Asset::ALL, None),
        LagStrategy::new(LagConfig::default(), resolver),
        positions,
    )
}

fn quote(yes: Decimal) -> MarketQuote {
    MarketQuote {
        asset: Asset::Btc,
        market_id: "btc-updown-14".to_string(),
        question: "Bitcoin Up or Down - June 1, 2PM ET".to_string(),
        yes_price: yes,
        no_price: Some(Decimal::ONE - yes),
        anchor_timestamp: Some(anchor()),
        market_kind: MarketKind::UpDown,
        token_ids: Some(TokenPair::new("yes-token", "no-token")),
        timestamp: anchor(),
    }
}

fn spot(source: &str, price: Decimal) -> SpotPriceSample {
    SpotPriceSample::new(source, Asset::Btc, price, anchor() + ChronoDuration::minutes(2))
}

#[tokio::test]
async fn test_lagging_odds_open_simulated_trade() {
    let store = MemoryTradeStore::new();
    let mut bot = bot(TradingMode::Simulation, store.clone(), None);
    let now = anchor() + ChronoDuration::minutes(2);

    bot.handle_spot(&spot("binance", dec!(101000)));
    bot.handle_spot(&spot("coinbase", dec!(101000)));

    let opportunity = bot.handle_quote_at(&quote(dec!(0.60)), now).await.unwrap();
    assert_eq!(opportunity.delta_percent(), dec!(1));
    assert_eq!(opportunity.implied_probability, dec!(0.95));

    let trades = store.load().unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].direction, Direction::BuyYes);
    assert_eq!(trades[0].entry_price, dec!(0.60));
    assert_eq!(trades[0].size, dec!(10) / dec!(0.60));
    assert_eq!(trades[0].status, TradeStatus::Open);
}

#[tokio::test]
async fn test_quote_updates_take_profit() {
    let store = MemoryTradeStore::new();
    let mut bot = bot(TradingMode::Simulation, store.clone(), None);
    let now = anchor() + ChronoDuration::minutes(2);

    bot.handle_spot(&spot("binance", dec!(101000)));
    bot.handle_quote_at(&quote(dec!(0.40)), now).await.unwrap();

    // YES repriced above the up gate: no new signal, position marked and closed
    assert!(bot.handle_quote_at(&quote(dec!(0.90)), now).await.is_none());

    let trades = store.load().unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].status, TradeStatus::Closed);
    assert_eq!(trades[0].exit_reason, Some(ExitReason::TakeProfit));
    assert_eq!(trades[0].realized_pnl, Some(dec!(12.5)));
    assert_eq!(bot.positions().cash(), dec!(1012.5));
}

#[tokio::test]
async fn test_down_move_buys_no() {
    let mut bot = bot(TradingMode::Simulation, MemoryTradeStore::new(), None);
    let now = anchor() + ChronoDuration::minutes(2);

    bot.handle_spot(&spot("binance", dec!(99000)));
    let opportunity = bot.handle_quote_at(&quote(dec!(0.50)), now).await.unwrap();
    assert_eq!(opportunity.implied_probability, dec!(0.05));

    let trade = &bot.positions().trades()[0];
    assert_eq!(trade.direction, Direction::BuyNo);
    assert_eq!(trade.entry_price, dec!(0.50));
}

#[tokio::test]
async fn test_monitor_only_never_trades() {
    let store = MemoryTradeStore::new();
    let mut bot = bot(TradingMode::MonitorOnly, store.clone(), None);
    let now = anchor() + ChronoDuration::minutes(2);

    bot.handle_spot(&spot("binance", dec!(101000)));
    assert!(bot.handle_quote_at(&quote(dec!(0.60)), now).await.is_some());
    assert!(store.load().unwrap().is_empty());
    assert_eq!(bot.strategy().recent_opportunities(10).len(), 1);
}

#[tokio::test]
async fn test_live_round_trip_through_executor() {
    let executor = PaperExecutor::new();
    let mut bot = bot(TradingMode::LiveTrading, MemoryTradeStore::new(), Some(executor.clone()));
    let now = anchor() + ChronoDuration::minutes(2);

    bot.handle_spot(&spot("binance", dec!(101000)));
    bot.handle_quote_at(&quote(dec!(0.40)), now).await.unwrap();
    // Above the up gate, so only the exit fires
    bot.handle_quote_at(&quote(dec!(0.80)), now).await;

    let fills = executor.fills().await;
    assert_eq!(fills.len(), 2);
    assert_eq!((fills[0].side, fills[0].token_id.as_str()), (OrderSide::Buy, "yes-token"));
    assert_eq!((fills[1].side, fills[1].price), (OrderSide::Sell, dec!(0.80)));

    let trade = &bot.positions().trades()[0];
    assert_eq!(trade.id, fills[0].order_id);
    assert_eq!(trade.exit_reason, Some(ExitReason::TakeProfit));
}

#[tokio::test]
async fn test_future_window_is_not_traded() {
    let mut bot = bot(TradingMode::Simulation, MemoryTradeStore::new(), None);
    let early = anchor() - ChronoDuration::minutes(5);

    bot.handle_spot(&spot("binance", dec!(101000)));
    assert!(bot.handle_quote_at(&quote(dec!(0.60)), early).await.is_none());
    assert!(bot.positions().trades().is_empty());
}
