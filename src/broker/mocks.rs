use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;

use crate::broker::traits::{BrokerAdapter, FillConfirmation, MarketDataProvider};
use crate::error::ExecutionError;
use crate::models::market_data::MarketData;
use crate::models::order::{OrderId, OrderSide};

/// A mock implementation of the MarketDataProvider trait for testing and development
pub struct MockMarketData {
    prices: HashMap<String, f64>,
    history: HashMap<String, Vec<MarketData>>,
}

impl MockMarketData {
    pub fn new() -> Self {
        let mut provider = Self {
            prices: HashMap::new(),
            history: HashMap::new(),
        };

        // Initialize with some test data
        provider.initialize_test_data();
        provider
    }

    fn initialize_test_data(&mut self) {
        self.prices.insert("BTCUSDT".to_string(), 50000.0);
        self.prices.insert("ETHUSDT".to_string(), 3000.0);

        // Create some mock bar history for BTC/USDT
        let symbol = "BTCUSDT".to_string();
        let now = Utc::now();
        let mut bars = Vec::new();
        let mut last_price = 50000.0;

        for i in 0..1000 {
            let timestamp = now - chrono::Duration::minutes(i);
            let price_change = (rand::thread_rng().gen_range(-200.0..200.0)) / 100.0;
            last_price = f64::max(f64::min(last_price * (1.0 + price_change / 100.0), 100000.0), 10000.0);
            let volume = rand::thread_rng().gen_range(0.1..10.0);

            bars.push(MarketData {
                symbol: symbol.clone(),
                timestamp: timestamp.timestamp_millis(),
                open: last_price * (1.0 - 0.001),
                high: last_price * (1.0 + 0.002),
                low: last_price * (1.0 - 0.002),
                close: last_price,
                volume,
            });
        }

        self.history.insert(symbol, bars);
    }

    /// Set the current mark price for a symbol
    pub fn set_price(&mut self, symbol: impl Into<String>, price: f64) {
        self.prices.insert(symbol.into(), price);
    }

    /// Replace the bar history for a symbol
    pub fn set_history(&mut self, symbol: impl Into<String>, bars: Vec<MarketData>) {
        self.history.insert(symbol.into(), bars);
    }
}

impl Default for MockMarketData {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for MockMarketData {
    async fn current_price(&self, symbol: &str) -> Result<f64, ExecutionError> {
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| ExecutionError::DataNotFound(format!("No mark price for {}", symbol)))
    }

    async fn historical_bars(
        &self,
        symbol: &str,
        window_minutes: u64,
    ) -> Result<Vec<MarketData>, ExecutionError> {
        let cutoff = Utc::now().timestamp_millis() - (window_minutes as i64) * 60_000;

        if let Some(bars) = self.history.get(symbol) {
            let windowed = bars
                .iter()
                .filter(|b| b.timestamp >= cutoff)
                .cloned()
                .collect();

            Ok(windowed)
        } else {
            Ok(Vec::new())
        }
    }
}

/// A mock implementation of the BrokerAdapter trait for testing and development.
/// Limit children fill at the limit price, market children at the provider's
/// mark price, so tests stay deterministic.
pub struct MockBroker {
    market_data: Arc<RwLock<dyn MarketDataProvider>>,
    fills: Vec<FillConfirmation>,
    fail_submissions: bool,
    child_counter: u64,
}

impl MockBroker {
    pub fn new(market_data: Arc<RwLock<dyn MarketDataProvider>>) -> Self {
        MockBroker {
            market_data,
            fills: Vec::new(),
            fail_submissions: false,
            child_counter: 0,
        }
    }

    /// Make subsequent submissions fail with an adapter error
    pub fn set_fail_submissions(&mut self, fail: bool) {
        self.fail_submissions = fail;
    }

    /// All fills confirmed so far, in submission order
    pub fn fills(&self) -> &[FillConfirmation] {
        &self.fills
    }

    fn next_child_id(&mut self) -> OrderId {
        self.child_counter += 1;
        OrderId(format!("mock-{}", self.child_counter))
    }
}

#[async_trait]
impl BrokerAdapter for MockBroker {
    async fn place_child_order(
        &mut self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
        limit_price: Option<f64>,
    ) -> Result<FillConfirmation, ExecutionError> {
        if self.fail_submissions {
            return Err(ExecutionError::AdapterError(
                "mock broker rejected child order".to_string(),
            ));
        }

        let price = match limit_price {
            Some(limit) => limit,
            None => {
                let provider = self.market_data.read().await;
                provider.current_price(symbol).await?
            }
        };

        let fill = FillConfirmation {
            child_order_id: self.next_child_id(),
            symbol: symbol.to_string(),
            side,
            quantity,
            price,
            timestamp: Utc::now().timestamp_millis(),
        };

        self.fills.push(fill.clone());
        Ok(fill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_broker_fills_market_at_mark_price() {
        let mut market_data = MockMarketData::new();
        market_data.set_price("BTCUSDT", 42000.0);
        let market_data: Arc<RwLock<dyn MarketDataProvider>> = Arc::new(RwLock::new(market_data));

        let mut broker = MockBroker::new(market_data);
        let fill = broker
            .place_child_order("BTCUSDT", OrderSide::Buy, 0.5, None)
            .await
            .unwrap();

        assert_eq!(fill.price, 42000.0);
        assert_eq!(fill.quantity, 0.5);
        assert_eq!(broker.fills().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_broker_fills_limit_at_limit_price() {
        let market_data: Arc<RwLock<dyn MarketDataProvider>> =
            Arc::new(RwLock::new(MockMarketData::new()));

        let mut broker = MockBroker::new(market_data);
        let fill = broker
            .place_child_order("BTCUSDT", OrderSide::Sell, 1.0, Some(51000.0))
            .await
            .unwrap();

        assert_eq!(fill.price, 51000.0);
    }

    #[tokio::test]
    async fn test_mock_broker_failure_injection() {
        let market_data: Arc<RwLock<dyn MarketDataProvider>> =
            Arc::new(RwLock::new(MockMarketData::new()));

        let mut broker = MockBroker::new(market_data);
        broker.set_fail_submissions(true);

        let result = broker
            .place_child_order("BTCUSDT", OrderSide::Buy, 1.0, None)
            .await;

        assert!(matches!(result, Err(ExecutionError::AdapterError(_))));
        assert!(broker.fills().is_empty());
    }
}
