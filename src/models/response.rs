use serde::{Deserialize, Serialize};

use crate::models::order::{ExecutionStatus, OrderId, OrderSide, StrategyType};
use crate::models::strategy_order::{
    BracketOrder, IcebergOrder, StopLossOrder, TrailingStopOrder, TwapOrder, VwapOrder,
};

/// 호출자에게 반환되는 주문 응답
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order_id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub strategy_type: StrategyType,
    pub status: ExecutionStatus,
    pub total_quantity: f64,
    pub filled_quantity: f64,
    pub average_price: Option<f64>,
    pub created_at: i64,
}

impl OrderResponse {
    pub fn new(
        order_id: OrderId,
        symbol: impl Into<String>,
        side: OrderSide,
        strategy_type: StrategyType,
        status: ExecutionStatus,
        total_quantity: f64,
        created_at: i64,
    ) -> Self {
        OrderResponse {
            order_id,
            symbol: symbol.into(),
            side,
            strategy_type,
            status,
            total_quantity,
            filled_quantity: 0.0,
            average_price: None,
            created_at,
        }
    }

    pub fn with_filled_quantity(mut self, filled_quantity: f64) -> Self {
        self.filled_quantity = filled_quantity;
        self
    }

    pub fn with_average_price(mut self, average_price: Option<f64>) -> Self {
        self.average_price = average_price;
        self
    }

    pub fn from_stop_loss(order: &StopLossOrder) -> Self {
        let filled = if order.status == ExecutionStatus::Filled {
            order.total_quantity
        } else {
            0.0
        };

        OrderResponse::new(
            order.order_id.clone(),
            order.symbol.clone(),
            order.side.clone(),
            StrategyType::StopLoss,
            order.status,
            order.total_quantity,
            order.created_at,
        )
        .with_filled_quantity(filled)
        .with_average_price(order.fill_price)
    }

    pub fn from_trailing_stop(order: &TrailingStopOrder) -> Self {
        let filled = if order.status == ExecutionStatus::Filled {
            order.total_quantity
        } else {
            0.0
        };

        OrderResponse::new(
            order.order_id.clone(),
            order.symbol.clone(),
            order.side.clone(),
            StrategyType::TrailingStop,
            order.status,
            order.total_quantity,
            order.created_at,
        )
        .with_filled_quantity(filled)
        .with_average_price(order.fill_price)
    }

    pub fn from_bracket(order: &BracketOrder) -> Self {
        let filled = if order.status == ExecutionStatus::Filled {
            order.total_quantity
        } else {
            0.0
        };

        OrderResponse::new(
            order.order_id.clone(),
            order.symbol.clone(),
            order.side.clone(),
            StrategyType::Bracket,
            order.status,
            order.total_quantity,
            order.created_at,
        )
        .with_filled_quantity(filled)
        .with_average_price(order.exit_fill_price.or(order.entry_fill_price))
    }

    pub fn from_iceberg(order: &IcebergOrder) -> Self {
        OrderResponse::new(
            order.order_id.clone(),
            order.symbol.clone(),
            order.side.clone(),
            StrategyType::Iceberg,
            order.status,
            order.total_quantity,
            order.created_at,
        )
        .with_filled_quantity(order.filled_quantity)
        .with_average_price(order.limit_price)
    }

    pub fn from_twap(order: &TwapOrder) -> Self {
        OrderResponse::new(
            order.order_id.clone(),
            order.symbol.clone(),
            order.side.clone(),
            StrategyType::Twap,
            order.status,
            order.total_quantity,
            order.created_at,
        )
        .with_filled_quantity(order.filled_quantity)
        .with_average_price(order.average_price)
    }

    pub fn from_vwap(order: &VwapOrder) -> Self {
        OrderResponse::new(
            order.order_id.clone(),
            order.symbol.clone(),
            order.side.clone(),
            StrategyType::Vwap,
            order.status,
            order.total_quantity,
            order.created_at,
        )
        .with_filled_quantity(order.filled_quantity)
        .with_average_price(order.average_price)
    }
}
