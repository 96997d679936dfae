/**
* filename : trailing_stop_engine
* author : HAMA
* date: 2025. 5. 13.
* description:
**/

use std::sync::Arc;
use tokio::sync::RwLock;

use async_trait::async_trait;

use crate::broker::traits::BrokerAdapter;
use crate::config::EngineConfig;
use crate::core::registry::OrderRegistry;
use crate::core::ExecutionStrategy;
use crate::error::ExecutionError;
use crate::models::order::{
  ExecutionStatus, ModifyRequest, OrderId, OrderRequest, OrderSide, StrategyParams, StrategyType,
  ValidationResult,
};
use crate::models::response::OrderResponse;
use crate::models::strategy_order::TrailingStopOrder;
use crate::utils::logging;
use crate::utils::math::round_to_tick;

/// Trailing Stop 주문 엔진
///
/// 유리한 방향의 극값을 추적하며 스탑 가격을 끌어올린다.
/// 스탑 가격은 항상 새 극값에서만 재계산되고 역방향으로는 움직이지 않는다
pub struct TrailingStopEngine {
  /// 브로커 어댑터
  broker: Arc<RwLock<dyn BrokerAdapter>>,
  /// 주문 저장소
  orders: Arc<OrderRegistry<TrailingStopOrder>>,
  /// 가격 최소 단위
  price_tick_size: f64,
}

impl TrailingStopEngine {
  pub fn new(broker: Arc<RwLock<dyn BrokerAdapter>>, config: &EngineConfig) -> Self {
    TrailingStopEngine {
      broker,
      orders: Arc::new(OrderRegistry::new()),
      price_tick_size: config.price_tick_size,
    }
  }

  /// 현재 추적 상태 조회 (극값, 스탑 가격)
  pub async fn tracking_state(
    &self,
    order_id: &OrderId,
  ) -> Result<(Option<f64>, Option<f64>), ExecutionError> {
    let entry = self
      .orders
      .get(order_id)
      .await
      .ok_or_else(|| ExecutionError::OrderNotFound(order_id.clone()))?;
    let order = entry.lock().await;

    Ok((order.extreme_price, order.current_stop_price))
  }

  /// 극값 기준으로 스탑 가격 계산 (매도는 아래로, 매수는 위로)
  fn stop_from_extreme(&self, order: &TrailingStopOrder, extreme: f64) -> f64 {
    let distance = order.trail_distance(extreme);

    let stop = match order.side {
      OrderSide::Sell => extreme - distance,
      OrderSide::Buy => extreme + distance,
    };

    round_to_tick(stop, self.price_tick_size)
  }
}

#[async_trait]
impl ExecutionStrategy for TrailingStopEngine {
  fn strategy_type(&self) -> StrategyType {
    StrategyType::TrailingStop
  }

  fn validate(&self, request: &OrderRequest) -> ValidationResult {
    let StrategyParams::TrailingStop {
      trail_amount,
      trail_percent,
    } = &request.params
    else {
      return ValidationResult::invalid("Parameters do not match TRAILING_STOP strategy");
    };

    if request.symbol.is_empty() {
      return ValidationResult::invalid("Symbol must not be empty");
    }

    if request.quantity <= 0.0 {
      return ValidationResult::invalid("Order quantity must be positive");
    }

    match (trail_amount, trail_percent) {
      (None, None) => {
        return ValidationResult::invalid("Either trail amount or trail percent is required")
      }
      (Some(_), Some(_)) => {
        return ValidationResult::invalid("Specify either trail amount or trail percent, not both")
      }
      (Some(amount), None) if *amount <= 0.0 => {
        return ValidationResult::invalid("Trail amount must be positive")
      }
      (None, Some(percent)) if *percent <= 0.0 => {
        return ValidationResult::invalid("Trail percent must be positive")
      }
      _ => {}
    }

    ValidationResult::ok()
  }

  async fn execute(&self, request: OrderRequest) -> Result<OrderResponse, ExecutionError> {
    let validation = self.validate(&request);
    if !validation.is_valid() {
      return Err(ExecutionError::InvalidParameter(
        validation.error_message.unwrap_or_default(),
      ));
    }

    let StrategyParams::TrailingStop {
      trail_amount,
      trail_percent,
    } = request.params
    else {
      return Err(ExecutionError::InvalidParameter(
        "Parameters do not match TRAILING_STOP strategy".to_string(),
      ));
    };

    let order_id = OrderId::generate();
    let order = TrailingStopOrder::new(
      order_id.clone(),
      request.symbol,
      request.side,
      request.quantity,
      trail_amount,
      trail_percent,
    );

    logging::log_order_created(
      &order_id.0,
      &self.strategy_type().to_string(),
      &order.symbol,
      &order.side.to_string(),
      order.total_quantity,
    );

    let response = OrderResponse::from_trailing_stop(&order);
    self.orders.insert(order_id, order).await;

    Ok(response)
  }

  async fn on_price_update(&self, order_id: &OrderId, price: f64) -> Result<bool, ExecutionError> {
    let entry = self
      .orders
      .get(order_id)
      .await
      .ok_or_else(|| ExecutionError::OrderNotFound(order_id.clone()))?;
    let mut order = entry.lock().await;

    if order.status.is_terminal() {
      return Ok(false);
    }

    let Some(extreme) = order.extreme_price else {
      // 첫 틱: 추적 초기화만 하고 트리거는 평가하지 않는다
      let stop = self.stop_from_extreme(&order, price);
      order.extreme_price = Some(price);
      order.current_stop_price = Some(stop);
      return Ok(false);
    };

    let improved = match order.side {
      OrderSide::Sell => price > extreme,
      OrderSide::Buy => price < extreme,
    };

    if improved {
      // 극값 갱신 틱에서는 스탑만 전진시킨다
      let stop = self.stop_from_extreme(&order, price);
      order.extreme_price = Some(price);
      order.current_stop_price = Some(stop);
      return Ok(false);
    }

    let Some(stop_price) = order.current_stop_price else {
      return Ok(false);
    };

    let stop_hit = match order.side {
      OrderSide::Sell => price <= stop_price,
      OrderSide::Buy => price >= stop_price,
    };

    if !stop_hit {
      return Ok(false);
    }

    // 시장가 청산. 어댑터 실패 시 추적 상태는 그대로 남는다
    let fill = {
      let mut broker = self.broker.write().await;
      broker
        .place_child_order(&order.symbol, order.side.clone(), order.total_quantity, None)
        .await?
    };

    order.status = ExecutionStatus::Filled;
    order.fill_price = Some(fill.price);
    logging::log_order_filled(&order.order_id.0, &order.symbol, order.total_quantity, fill.price);

    Ok(true)
  }

  async fn cancel(&self, order_id: &OrderId) -> Result<OrderResponse, ExecutionError> {
    let entry = self
      .orders
      .get(order_id)
      .await
      .ok_or_else(|| ExecutionError::OrderNotFound(order_id.clone()))?;
    let mut order = entry.lock().await;

    if order.status.is_terminal() {
      return Err(ExecutionError::InvalidState(format!(
        "Order {} is already terminal",
        order_id
      )));
    }

    order.status = ExecutionStatus::Cancelled;
    logging::log_order_cancelled(&order.order_id.0);

    Ok(OrderResponse::from_trailing_stop(&order))
  }

  async fn modify(
    &self,
    order_id: &OrderId,
    request: ModifyRequest,
  ) -> Result<OrderResponse, ExecutionError> {
    let entry = self
      .orders
      .get(order_id)
      .await
      .ok_or_else(|| ExecutionError::OrderNotFound(order_id.clone()))?;
    let mut order = entry.lock().await;

    if order.status != ExecutionStatus::Pending {
      return Err(ExecutionError::InvalidState(format!(
        "Order {} can only be modified while pending",
        order_id
      )));
    }

    if let Some(quantity) = request.quantity {
      if quantity <= 0.0 {
        return Err(ExecutionError::InvalidParameter(
          "Order quantity must be positive".to_string(),
        ));
      }
      order.total_quantity = quantity;
    }

    match (request.trail_amount, request.trail_percent) {
      (Some(_), Some(_)) => {
        return Err(ExecutionError::InvalidParameter(
          "Specify either trail amount or trail percent, not both".to_string(),
        ));
      }
      (Some(amount), None) => {
        if amount <= 0.0 {
          return Err(ExecutionError::InvalidParameter(
            "Trail amount must be positive".to_string(),
          ));
        }
        order.trail_amount = Some(amount);
        order.trail_percent = None;
      }
      (None, Some(percent)) => {
        if percent <= 0.0 {
          return Err(ExecutionError::InvalidParameter(
            "Trail percent must be positive".to_string(),
          ));
        }
        order.trail_amount = None;
        order.trail_percent = Some(percent);
      }
      (None, None) => {}
    }

    // 새 트레일 간격은 기존 극값에서만 재계산한다
    if let Some(extreme) = order.extreme_price {
      let stop = self.stop_from_extreme(&order, extreme);
      order.current_stop_price = Some(stop);
    }

    Ok(OrderResponse::from_trailing_stop(&order))
  }

  async fn order_status(&self, order_id: &OrderId) -> Result<OrderResponse, ExecutionError> {
    let entry = self
      .orders
      .get(order_id)
      .await
      .ok_or_else(|| ExecutionError::OrderNotFound(order_id.clone()))?;
    let order = entry.lock().await;

    Ok(OrderResponse::from_trailing_stop(&order))
  }
}
