/**
* filename : stop_loss_engine
* author : HAMA
* date: 2025. 5. 13.
* description:
**/

use std::sync::Arc;
use tokio::sync::RwLock;

use async_trait::async_trait;

use crate::broker::traits::BrokerAdapter;
use crate::core::registry::OrderRegistry;
use crate::core::ExecutionStrategy;
use crate::error::ExecutionError;
use crate::models::order::{
  ExecutionStatus, ModifyRequest, OrderId, OrderRequest, OrderSide, StrategyParams, StrategyType,
  ValidationResult,
};
use crate::models::response::OrderResponse;
use crate::models::strategy_order::StopLossOrder;
use crate::utils::logging;

/// Stop-Loss 주문 엔진
///
/// 가격 틱마다 스탑 조건을 재평가하고, 트리거 시 시장가 청산을 실행한다
pub struct StopLossEngine {
  /// 브로커 어댑터
  broker: Arc<RwLock<dyn BrokerAdapter>>,
  /// 주문 저장소
  orders: Arc<OrderRegistry<StopLossOrder>>,
}

impl StopLossEngine {
  pub fn new(broker: Arc<RwLock<dyn BrokerAdapter>>) -> Self {
    StopLossEngine {
      broker,
      orders: Arc::new(OrderRegistry::new()),
    }
  }
}

#[async_trait]
impl ExecutionStrategy for StopLossEngine {
  fn strategy_type(&self) -> StrategyType {
    StrategyType::StopLoss
  }

  fn validate(&self, request: &OrderRequest) -> ValidationResult {
    let StrategyParams::StopLoss { stop_price } = &request.params else {
      return ValidationResult::invalid("Parameters do not match STOP_LOSS strategy");
    };

    if request.symbol.is_empty() {
      return ValidationResult::invalid("Symbol must not be empty");
    }

    if request.quantity <= 0.0 {
      return ValidationResult::invalid("Order quantity must be positive");
    }

    if *stop_price <= 0.0 {
      return ValidationResult::invalid("Stop price must be positive");
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

    let StrategyParams::StopLoss { stop_price } = request.params else {
      return Err(ExecutionError::InvalidParameter(
        "Parameters do not match STOP_LOSS strategy".to_string(),
      ));
    };

    let order_id = OrderId::generate();
    let order = StopLossOrder::new(
      order_id.clone(),
      request.symbol,
      request.side,
      request.quantity,
      stop_price,
    );

    logging::log_order_created(
      &order_id.0,
      &self.strategy_type().to_string(),
      &order.symbol,
      &order.side.to_string(),
      order.total_quantity,
    );

    let response = OrderResponse::from_stop_loss(&order);
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

    // 매도 스탑은 하향 돌파, 매수 스탑은 상향 돌파에서 트리거
    let triggered = match order.side {
      OrderSide::Sell => price <= order.stop_price,
      OrderSide::Buy => price >= order.stop_price,
    };

    if !triggered {
      return Ok(false);
    }

    // 시장가 청산. 어댑터 실패 시 주문은 Pending 상태로 남는다
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

    Ok(OrderResponse::from_stop_loss(&order))
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

    if let Some(stop_price) = request.stop_price {
      if stop_price <= 0.0 {
        return Err(ExecutionError::InvalidParameter(
          "Stop price must be positive".to_string(),
        ));
      }
      order.stop_price = stop_price;
    }

    Ok(OrderResponse::from_stop_loss(&order))
  }

  async fn order_status(&self, order_id: &OrderId) -> Result<OrderResponse, ExecutionError> {
    let entry = self
      .orders
      .get(order_id)
      .await
      .ok_or_else(|| ExecutionError::OrderNotFound(order_id.clone()))?;
    let order = entry.lock().await;

    Ok(OrderResponse::from_stop_loss(&order))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::broker::traits::{FillConfirmation, MockBrokerAdapter};

  fn sell_stop_request(stop_price: f64) -> OrderRequest {
    OrderRequest::new(
      "AAPL",
      OrderSide::Sell,
      100.0,
      StrategyParams::StopLoss { stop_price },
    )
  }

  #[tokio::test]
  async fn test_trigger_places_single_market_exit() {
    let mut mock = MockBrokerAdapter::new();
    mock
      .expect_place_child_order()
      .times(1)
      .returning(|symbol, side, quantity, _| {
        Ok(FillConfirmation {
          child_order_id: OrderId("child-1".to_string()),
          symbol: symbol.to_string(),
          side,
          quantity,
          price: 99.0,
          timestamp: 0,
        })
      });

    let broker: Arc<RwLock<dyn BrokerAdapter>> = Arc::new(RwLock::new(mock));
    let engine = StopLossEngine::new(broker);

    let response = engine.execute(sell_stop_request(100.0)).await.unwrap();

    assert!(!engine.on_price_update(&response.order_id, 105.0).await.unwrap());
    assert!(!engine.on_price_update(&response.order_id, 102.0).await.unwrap());
    assert!(engine.on_price_update(&response.order_id, 99.0).await.unwrap());

    let status = engine.order_status(&response.order_id).await.unwrap();
    assert_eq!(status.status, ExecutionStatus::Filled);
    assert_eq!(status.average_price, Some(99.0));
    assert_eq!(status.filled_quantity, 100.0);
  }

  #[tokio::test]
  async fn test_adapter_failure_leaves_order_pending() {
    let mut mock = MockBrokerAdapter::new();
    mock
      .expect_place_child_order()
      .times(1)
      .returning(|_, _, _, _| Err(ExecutionError::AdapterError("rejected".to_string())));

    let broker: Arc<RwLock<dyn BrokerAdapter>> = Arc::new(RwLock::new(mock));
    let engine = StopLossEngine::new(broker);

    let response = engine.execute(sell_stop_request(100.0)).await.unwrap();
    let result = engine.on_price_update(&response.order_id, 99.0).await;
    assert!(matches!(result, Err(ExecutionError::AdapterError(_))));

    // 실패한 트리거는 상태를 바꾸지 않는다. 재시도나 취소가 가능해야 한다
    let status = engine.order_status(&response.order_id).await.unwrap();
    assert_eq!(status.status, ExecutionStatus::Pending);
  }

  #[tokio::test]
  async fn test_unknown_order_is_not_found() {
    let broker: Arc<RwLock<dyn BrokerAdapter>> =
      Arc::new(RwLock::new(MockBrokerAdapter::new()));
    let engine = StopLossEngine::new(broker);

    let missing = OrderId("missing".to_string());
    let result = engine.on_price_update(&missing, 100.0).await;
    assert!(matches!(result, Err(ExecutionError::OrderNotFound(_))));
  }
}
