/**
* filename : twap_engine
* author : HAMA
* date: 2025. 5. 15.
* description:
**/

use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;

use async_trait::async_trait;

use crate::broker::traits::BrokerAdapter;
use crate::config::EngineConfig;
use crate::core::registry::OrderRegistry;
use crate::core::scheduler::SliceScheduler;
use crate::core::ExecutionStrategy;
use crate::error::ExecutionError;
use crate::models::order::{
  ExecutionStatus, ModifyRequest, OrderId, OrderRequest, StrategyParams, StrategyType,
  ValidationResult,
};
use crate::models::response::OrderResponse;
use crate::models::strategy_order::{SliceExecution, SliceState, TwapOrder};
use crate::utils::logging;
use crate::utils::math::{ceil_to_step, weighted_average_price};

/// TWAP 주문 엔진
///
/// 실행 시점에 슬라이스 계획을 확정하고, 각 슬라이스를
/// `i * interval` 지연으로 예약해 시장가로 실행한다
pub struct TwapEngine {
  /// 브로커 어댑터
  broker: Arc<RwLock<dyn BrokerAdapter>>,
  /// 주문 저장소
  orders: Arc<OrderRegistry<TwapOrder>>,
  /// 슬라이스 스케줄러
  scheduler: Arc<SliceScheduler>,
  /// 수량 최소 단위
  quantity_step: f64,
}

impl TwapEngine {
  pub fn new(
    broker: Arc<RwLock<dyn BrokerAdapter>>,
    scheduler: Arc<SliceScheduler>,
    config: &EngineConfig,
  ) -> Self {
    TwapEngine {
      broker,
      orders: Arc::new(OrderRegistry::new()),
      scheduler,
      quantity_step: config.quantity_step,
    }
  }

  /// 확정된 슬라이스 계획 조회
  pub async fn planned_slices(&self, order_id: &OrderId) -> Result<Vec<f64>, ExecutionError> {
    let entry = self
      .orders
      .get(order_id)
      .await
      .ok_or_else(|| ExecutionError::OrderNotFound(order_id.clone()))?;
    let order = entry.lock().await;

    Ok(order.slice_plan.clone())
  }

  /// 슬라이스별 계획 수량. 마지막 슬라이스가 나머지를 흡수해
  /// 합계는 정확히 총 수량이 된다
  fn build_slice_plan(total_quantity: f64, num_slices: usize, slice_size: f64) -> Vec<f64> {
    let mut plan = Vec::with_capacity(num_slices);
    let mut remaining = total_quantity;

    for i in 0..num_slices {
      let quantity = if i == num_slices - 1 {
        remaining
      } else {
        slice_size.min(remaining)
      };

      plan.push(quantity);
      remaining -= quantity;
    }

    plan
  }

  /// 예약된 슬라이스 하나를 실행한다
  async fn run_slice(
    orders: Arc<OrderRegistry<TwapOrder>>,
    broker: Arc<RwLock<dyn BrokerAdapter>>,
    order_id: OrderId,
    slice_number: usize,
    quantity: f64,
  ) {
    let Some(entry) = orders.get(&order_id).await else {
      return;
    };
    let mut order = entry.lock().await;

    // 취소된 주문의 잔류 콜백은 아무것도 변경하지 않는다
    if order.twap_state != SliceState::Active {
      return;
    }

    if quantity > 0.0 {
      let fill = {
        let mut broker = broker.write().await;
        broker
          .place_child_order(&order.symbol, order.side.clone(), quantity, None)
          .await
      };

      let fill = match fill {
        Ok(fill) => fill,
        Err(e) => {
          // 실패한 슬라이스는 미실행으로 남는다. 주문은 취소 가능 상태 유지
          log::error!(
            "Failed to execute TWAP slice {} for {}: {}",
            slice_number,
            order.order_id,
            e
          );
          return;
        }
      };

      order.executions.push(SliceExecution {
        slice_number,
        quantity: fill.quantity,
        execution_price: fill.price,
        execution_time: fill.timestamp,
      });
      order.filled_quantity += fill.quantity;
      logging::log_slice_executed(&order.order_id.0, slice_number, fill.quantity, fill.price);
    }

    order.executed_slices += 1;

    if order.executed_slices == order.total_slices {
      order.twap_state = SliceState::Completed;
      order.status = ExecutionStatus::Completed;

      let prices: Vec<f64> = order.executions.iter().map(|e| e.execution_price).collect();
      let quantities: Vec<f64> = order.executions.iter().map(|e| e.quantity).collect();
      order.average_price = weighted_average_price(&prices, &quantities);

      log::info!("TWAP order completed: {}", order.order_id);
    }
  }
}

#[async_trait]
impl ExecutionStrategy for TwapEngine {
  fn strategy_type(&self) -> StrategyType {
    StrategyType::Twap
  }

  fn validate(&self, request: &OrderRequest) -> ValidationResult {
    let StrategyParams::Twap {
      time_window_minutes,
      slice_interval_seconds,
    } = &request.params
    else {
      return ValidationResult::invalid("Parameters do not match TWAP strategy");
    };

    if request.symbol.is_empty() {
      return ValidationResult::invalid("Symbol must not be empty");
    }

    if request.quantity <= 0.0 {
      return ValidationResult::invalid("Order quantity must be positive");
    }

    if *time_window_minutes == 0 {
      return ValidationResult::invalid("Time window must be positive");
    }

    if *slice_interval_seconds == 0 {
      return ValidationResult::invalid("Slice interval must be positive");
    }

    if *slice_interval_seconds >= time_window_minutes * 60 {
      return ValidationResult::invalid("Slice interval must be shorter than the time window");
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

    let StrategyParams::Twap {
      time_window_minutes,
      slice_interval_seconds,
    } = request.params
    else {
      return Err(ExecutionError::InvalidParameter(
        "Parameters do not match TWAP strategy".to_string(),
      ));
    };

    // 예약 전에 슬라이스 계획을 확정한다
    let window_seconds = time_window_minutes * 60;
    let num_slices = std::cmp::max(1, (window_seconds / slice_interval_seconds) as usize);
    let slice_size = ceil_to_step(request.quantity / num_slices as f64, self.quantity_step);
    let slice_plan = Self::build_slice_plan(request.quantity, num_slices, slice_size);

    let order_id = OrderId::generate();
    let order = TwapOrder::new(
      order_id.clone(),
      request.symbol,
      request.side,
      request.quantity,
      slice_size,
      slice_interval_seconds,
      slice_plan.clone(),
    );

    logging::log_order_created(
      &order_id.0,
      &self.strategy_type().to_string(),
      &order.symbol,
      &order.side.to_string(),
      order.total_quantity,
    );

    let response = OrderResponse::from_twap(&order);
    self.orders.insert(order_id.clone(), order).await;

    for (i, quantity) in slice_plan.iter().enumerate() {
      let delay = Duration::from_secs(i as u64 * slice_interval_seconds);
      let task = Self::run_slice(
        self.orders.clone(),
        self.broker.clone(),
        order_id.clone(),
        i + 1,
        *quantity,
      );

      self.scheduler.schedule(&order_id, delay, Box::pin(task)).await;
    }

    Ok(response)
  }

  async fn cancel(&self, order_id: &OrderId) -> Result<OrderResponse, ExecutionError> {
    let entry = self
      .orders
      .get(order_id)
      .await
      .ok_or_else(|| ExecutionError::OrderNotFound(order_id.clone()))?;

    let response = {
      let mut order = entry.lock().await;

      if order.status.is_terminal() {
        return Err(ExecutionError::InvalidState(format!(
          "Order {} is already terminal",
          order_id
        )));
      }

      order.twap_state = SliceState::Cancelled;
      order.status = ExecutionStatus::Cancelled;
      logging::log_order_cancelled(&order.order_id.0);

      OrderResponse::from_twap(&order)
    };

    // 미발화 슬라이스는 중단하고, 발화 중인 콜백은 상태 확인으로 무효화된다
    self.scheduler.cancel_order(order_id).await;

    Ok(response)
  }

  async fn modify(
    &self,
    order_id: &OrderId,
    _request: ModifyRequest,
  ) -> Result<OrderResponse, ExecutionError> {
    if !self.orders.contains(order_id).await {
      return Err(ExecutionError::OrderNotFound(order_id.clone()));
    }

    // 예약이 시작된 뒤에는 수정을 지원하지 않는다
    Err(ExecutionError::InvalidState(format!(
      "TWAP order {} cannot be modified after scheduling has begun",
      order_id
    )))
  }

  async fn order_status(&self, order_id: &OrderId) -> Result<OrderResponse, ExecutionError> {
    let entry = self
      .orders
      .get(order_id)
      .await
      .ok_or_else(|| ExecutionError::OrderNotFound(order_id.clone()))?;
    let order = entry.lock().await;

    Ok(OrderResponse::from_twap(&order))
  }
}
