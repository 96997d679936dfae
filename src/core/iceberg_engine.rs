/**
* filename : iceberg_engine
* author : HAMA
* date: 2025. 5. 14.
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
use crate::models::strategy_order::{IcebergOrder, SliceState};
use crate::utils::logging;

/// Iceberg 주문 엔진
///
/// 전체 수량 중 노출 수량만큼만 자식 주문으로 내보내고,
/// 체결될 때마다 다음 노출 분량을 같은 지정가로 즉시 보충한다
pub struct IcebergEngine {
  /// 브로커 어댑터
  broker: Arc<RwLock<dyn BrokerAdapter>>,
  /// 주문 저장소
  orders: Arc<OrderRegistry<IcebergOrder>>,
}

impl IcebergEngine {
  pub fn new(broker: Arc<RwLock<dyn BrokerAdapter>>) -> Self {
    IcebergEngine {
      broker,
      orders: Arc::new(OrderRegistry::new()),
    }
  }

  /// 현재 슬라이스 진행 상태 조회 (작업 중 슬라이스 번호, 총 슬라이스 수)
  pub async fn slice_progress(
    &self,
    order_id: &OrderId,
  ) -> Result<(usize, usize), ExecutionError> {
    let entry = self
      .orders
      .get(order_id)
      .await
      .ok_or_else(|| ExecutionError::OrderNotFound(order_id.clone()))?;
    let order = entry.lock().await;

    Ok((order.current_slice_number, order.total_slices))
  }
}

#[async_trait]
impl ExecutionStrategy for IcebergEngine {
  fn strategy_type(&self) -> StrategyType {
    StrategyType::Iceberg
  }

  fn validate(&self, request: &OrderRequest) -> ValidationResult {
    let StrategyParams::Iceberg {
      display_quantity,
      limit_price,
    } = &request.params
    else {
      return ValidationResult::invalid("Parameters do not match ICEBERG strategy");
    };

    if request.symbol.is_empty() {
      return ValidationResult::invalid("Symbol must not be empty");
    }

    if request.quantity <= 0.0 {
      return ValidationResult::invalid("Order quantity must be positive");
    }

    if *display_quantity <= 0.0 {
      return ValidationResult::invalid("Display quantity must be positive");
    }

    if *display_quantity >= request.quantity {
      return ValidationResult::invalid("Display quantity must be less than total quantity");
    }

    if let Some(limit) = limit_price {
      if *limit <= 0.0 {
        return ValidationResult::invalid("Limit price must be positive");
      }
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

    let StrategyParams::Iceberg {
      display_quantity,
      limit_price,
    } = request.params
    else {
      return Err(ExecutionError::InvalidParameter(
        "Parameters do not match ICEBERG strategy".to_string(),
      ));
    };

    let order_id = OrderId::generate();
    let order = IcebergOrder::new(
      order_id.clone(),
      request.symbol,
      request.side,
      request.quantity,
      display_quantity,
      limit_price,
    );

    logging::log_order_created(
      &order_id.0,
      &self.strategy_type().to_string(),
      &order.symbol,
      &order.side.to_string(),
      order.total_quantity,
    );

    let response = OrderResponse::from_iceberg(&order);
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

    if order.iceberg_state != SliceState::Active {
      return Ok(false);
    }

    // 지정가 조건을 만족하는 틱에서 현재 노출 분량이 체결된다.
    // 시장가 아이스버그는 모든 틱에서 체결된다
    let fillable = match order.limit_price {
      None => true,
      Some(limit) => match order.side {
        OrderSide::Buy => price <= limit,
        OrderSide::Sell => price >= limit,
      },
    };

    if !fillable {
      return Ok(false);
    }

    let child_quantity = order.display_quantity.min(order.remaining_quantity());
    if child_quantity <= 0.0 {
      return Ok(false);
    }

    let fill = {
      let mut broker = self.broker.write().await;
      broker
        .place_child_order(&order.symbol, order.side.clone(), child_quantity, order.limit_price)
        .await?
    };

    order.filled_quantity += fill.quantity;
    logging::log_slice_executed(
      &order.order_id.0,
      order.current_slice_number,
      fill.quantity,
      fill.price,
    );

    if order.remaining_quantity() > 0.0 {
      // 다음 노출 분량을 같은 지정가로 즉시 내보낸다
      order.current_slice_number += 1;
    } else {
      order.iceberg_state = SliceState::Completed;
      order.status = ExecutionStatus::Completed;
      log::info!("Iceberg order completed: {}", order.order_id);
    }

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

    order.iceberg_state = SliceState::Cancelled;
    order.status = ExecutionStatus::Cancelled;
    logging::log_order_cancelled(&order.order_id.0);

    Ok(OrderResponse::from_iceberg(&order))
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

    if order.status.is_terminal() {
      return Err(ExecutionError::InvalidState(format!(
        "Order {} is already terminal",
        order_id
      )));
    }

    if let Some(display_quantity) = request.display_quantity {
      if display_quantity <= 0.0 {
        return Err(ExecutionError::InvalidParameter(
          "Display quantity must be positive".to_string(),
        ));
      }

      // 새 노출 수량은 남은 수량보다 작아야 한다
      if display_quantity >= order.remaining_quantity() {
        return Err(ExecutionError::InvalidParameter(
          "Display quantity must be less than remaining quantity".to_string(),
        ));
      }

      order.display_quantity = display_quantity;

      // 아직 내보내지 않은 슬라이스에만 적용되므로 총 슬라이스 수를 다시 계산한다
      let remaining_slices = (order.remaining_quantity() / display_quantity).ceil() as usize;
      order.total_slices = order.current_slice_number - 1 + remaining_slices;
    }

    if let Some(limit_price) = request.limit_price {
      if limit_price <= 0.0 {
        return Err(ExecutionError::InvalidParameter(
          "Limit price must be positive".to_string(),
        ));
      }
      order.limit_price = Some(limit_price);
    }

    Ok(OrderResponse::from_iceberg(&order))
  }

  async fn order_status(&self, order_id: &OrderId) -> Result<OrderResponse, ExecutionError> {
    let entry = self
      .orders
      .get(order_id)
      .await
      .ok_or_else(|| ExecutionError::OrderNotFound(order_id.clone()))?;
    let order = entry.lock().await;

    Ok(OrderResponse::from_iceberg(&order))
  }
}
