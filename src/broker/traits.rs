use async_trait::async_trait;
use mockall::automock;

use crate::error::ExecutionError;
use crate::models::market_data::MarketData;
use crate::models::order::{OrderId, OrderSide};

/// Confirmation returned by the broker for a filled child order.
#[derive(Debug, Clone)]
pub struct FillConfirmation {
    pub child_order_id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub price: f64,
    pub timestamp: i64,
}

/// The `BrokerAdapter` trait defines the outbound boundary to the execution venue.
/// It will be implemented by real venue connectors and mock implementations.
///
/// Contract: the engine issues exactly one call per child order (one per slice or
/// triggered leg), so submission is idempotent from the venue's point of view.
/// A successful return is a fill confirmation at the returned price; an error
/// means no fill occurred and the caller may retry or cancel.
#[automock]
#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    /// Submit a child order. `limit_price` of `None` means a market order.
    async fn place_child_order(
        &mut self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
        limit_price: Option<f64>,
    ) -> Result<FillConfirmation, ExecutionError>;
}

/// Market-data collaborator used for mark prices and volume profiles.
#[automock]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Get the current mark price for a symbol
    async fn current_price(&self, symbol: &str) -> Result<f64, ExecutionError>;

    /// Get historical bars covering the trailing window for a symbol
    async fn historical_bars(
        &self,
        symbol: &str,
        window_minutes: u64,
    ) -> Result<Vec<MarketData>, ExecutionError>;
}
