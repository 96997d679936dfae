/**
* filename : bracket_engine
* author : HAMA
* date: 2025. 5. 14.
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
  ExecutionStatus, ModifyRequest, OrderId, OrderRequest, OrderSide, StrategyParams, StrategyType,
  ValidationResult,
};
use crate::models::response::OrderResponse;
use crate::models::strategy_order::{BracketOrder, BracketState};
use crate::utils::logging;

/// Bracket (OCO) 주문 엔진
///
/// 진입 체결 후 익절/손절 두 다리를 동시에 평가한다.
/// 한 다리가 체결되는 순간 반대 다리는 암묵적으로 취소된다
pub struct BracketEngine {
  /// 브로커 어댑터
  broker: Arc<RwLock<dyn BrokerAdapter>>,
  /// 주문 저장소
  orders: Arc<OrderRegistry<BracketOrder>>,
  /// 진입 만료 콜백용 스케줄러
  scheduler: Arc<SliceScheduler>,
  /// 진입 미체결 만료 (초). None이면 취소 전까지 유효
  entry_expiry_secs: Option<u64>,
}

/// 진입가 대비 익절/손절 가격 순서 검사
fn bracket_prices_valid(
  side: &OrderSide,
  entry_price: Option<f64>,
  profit_target: f64,
  stop_price: f64,
) -> Result<(), String> {
  if profit_target <= 0.0 {
    return Err("Profit target must be positive".to_string());
  }

  if stop_price <= 0.0 {
    return Err("Stop price must be positive".to_string());
  }

  // 시장가 진입은 진입가를 모르므로 순서 검사를 건너뛴다
  let Some(entry) = entry_price else {
    return Ok(());
  };

  if entry <= 0.0 {
    return Err("Entry price must be positive".to_string());
  }

  match side {
    OrderSide::Buy => {
      if profit_target <= entry {
        return Err("Profit target must be above entry price for BUY brackets".to_string());
      }
      if stop_price >= entry {
        return Err("Stop price must be below entry price for BUY brackets".to_string());
      }
    }
    OrderSide::Sell => {
      if profit_target >= entry {
        return Err("Profit target must be below entry price for SELL brackets".to_string());
      }
      if stop_price <= entry {
        return Err("Stop price must be above entry price for SELL brackets".to_string());
      }
    }
  }

  Ok(())
}

impl BracketEngine {
  pub fn new(
    broker: Arc<RwLock<dyn BrokerAdapter>>,
    scheduler: Arc<SliceScheduler>,
    config: &EngineConfig,
  ) -> Self {
    BracketEngine {
      broker,
      orders: Arc::new(OrderRegistry::new()),
      scheduler,
      entry_expiry_secs: config.bracket_entry_expiry_secs,
    }
  }

  /// 현재 브라켓 상태 조회
  pub async fn bracket_state(&self, order_id: &OrderId) -> Result<BracketState, ExecutionError> {
    let entry = self
      .orders
      .get(order_id)
      .await
      .ok_or_else(|| ExecutionError::OrderNotFound(order_id.clone()))?;
    let order = entry.lock().await;

    Ok(order.bracket_state)
  }

  /// 진입이 계속 미체결이면 만료 시점에 브라켓을 취소한다
  async fn schedule_entry_expiry(&self, order_id: &OrderId, expiry_secs: u64) {
    let orders = self.orders.clone();
    let expire_id = order_id.clone();

    let callback = Box::pin(async move {
      let Some(entry) = orders.get(&expire_id).await else {
        return;
      };
      let mut order = entry.lock().await;

      if order.bracket_state != BracketState::Pending {
        return;
      }

      order.bracket_state = BracketState::Cancelled;
      order.status = ExecutionStatus::Cancelled;
      log::info!("Bracket entry expired without fill: {}", expire_id);
    });

    self
      .scheduler
      .schedule(order_id, Duration::from_secs(expiry_secs), callback)
      .await;
  }
}

#[async_trait]
impl ExecutionStrategy for BracketEngine {
  fn strategy_type(&self) -> StrategyType {
    StrategyType::Bracket
  }

  fn validate(&self, request: &OrderRequest) -> ValidationResult {
    let StrategyParams::Bracket {
      entry_price,
      profit_target,
      stop_price,
    } = &request.params
    else {
      return ValidationResult::invalid("Parameters do not match BRACKET strategy");
    };

    if request.symbol.is_empty() {
      return ValidationResult::invalid("Symbol must not be empty");
    }

    if request.quantity <= 0.0 {
      return ValidationResult::invalid("Order quantity must be positive");
    }

    if let Err(message) =
      bracket_prices_valid(&request.side, *entry_price, *profit_target, *stop_price)
    {
      return ValidationResult::invalid(message);
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

    let StrategyParams::Bracket {
      entry_price,
      profit_target,
      stop_price,
    } = request.params
    else {
      return Err(ExecutionError::InvalidParameter(
        "Parameters do not match BRACKET strategy".to_string(),
      ));
    };

    let order_id = OrderId::generate();
    let order = BracketOrder::new(
      order_id.clone(),
      request.symbol,
      request.side,
      request.quantity,
      entry_price,
      profit_target,
      stop_price,
    );

    logging::log_order_created(
      &order_id.0,
      &self.strategy_type().to_string(),
      &order.symbol,
      &order.side.to_string(),
      order.total_quantity,
    );

    let response = OrderResponse::from_bracket(&order);
    self.orders.insert(order_id.clone(), order).await;

    if let Some(expiry_secs) = self.entry_expiry_secs {
      self.schedule_entry_expiry(&order_id, expiry_secs).await;
    }

    Ok(response)
  }

  async fn on_price_update(&self, order_id: &OrderId, price: f64) -> Result<bool, ExecutionError> {
    let entry = self
      .orders
      .get(order_id)
      .await
      .ok_or_else(|| ExecutionError::OrderNotFound(order_id.clone()))?;
    let mut order = entry.lock().await;

    match order.bracket_state {
      BracketState::Pending => {
        // 시장가 진입은 첫 틱에서, 지정가 진입은 유리한 돌파에서 체결
        let entry_hit = match order.entry_price {
          None => true,
          Some(entry_limit) => match order.side {
            OrderSide::Buy => price <= entry_limit,
            OrderSide::Sell => price >= entry_limit,
          },
        };

        if !entry_hit {
          return Ok(false);
        }

        let fill = {
          let mut broker = self.broker.write().await;
          broker
            .place_child_order(
              &order.symbol,
              order.side.clone(),
              order.total_quantity,
              order.entry_price,
            )
            .await?
        };

        order.bracket_state = BracketState::Active;
        order.status = ExecutionStatus::Active;
        order.entry_fill_price = Some(fill.price);
        log::info!("Bracket entry filled: {} at {}", order.order_id, fill.price);

        Ok(true)
      }
      BracketState::Active => {
        let profit_hit = match order.side {
          OrderSide::Buy => price >= order.profit_target,
          OrderSide::Sell => price <= order.profit_target,
        };

        let stop_hit = match order.side {
          OrderSide::Buy => price <= order.stop_price,
          OrderSide::Sell => price >= order.stop_price,
        };

        let next_state = if profit_hit {
          BracketState::ProfitFilled
        } else if stop_hit {
          BracketState::StopFilled
        } else {
          return Ok(false);
        };

        // 청산 다리는 반대 방향 시장가. 체결 순간 반대 다리는 소멸한다 (OCO)
        let exit_side = order.side.opposite();
        let fill = {
          let mut broker = self.broker.write().await;
          broker
            .place_child_order(&order.symbol, exit_side, order.total_quantity, None)
            .await?
        };

        order.bracket_state = next_state;
        order.status = ExecutionStatus::Filled;
        order.exit_fill_price = Some(fill.price);
        logging::log_order_filled(&order.order_id.0, &order.symbol, order.total_quantity, fill.price);

        Ok(true)
      }
      _ => Ok(false),
    }
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

    order.bracket_state = BracketState::Cancelled;
    order.status = ExecutionStatus::Cancelled;
    logging::log_order_cancelled(&order.order_id.0);

    self.scheduler.cancel_order(order_id).await;

    Ok(OrderResponse::from_bracket(&order))
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

    // 활성/종결 브라켓 수정은 허용하지 않는다
    if order.bracket_state != BracketState::Pending {
      return Err(ExecutionError::InvalidState(format!(
        "Bracket {} can only be modified while pending",
        order_id
      )));
    }

    let quantity = request.quantity.unwrap_or(order.total_quantity);
    if quantity <= 0.0 {
      return Err(ExecutionError::InvalidParameter(
        "Order quantity must be positive".to_string(),
      ));
    }

    let entry_price = request.entry_price.or(order.entry_price);
    let profit_target = request.profit_target.unwrap_or(order.profit_target);
    let stop_price = request.stop_price.unwrap_or(order.stop_price);

    bracket_prices_valid(&order.side, entry_price, profit_target, stop_price)
      .map_err(ExecutionError::InvalidParameter)?;

    order.total_quantity = quantity;
    order.entry_price = entry_price;
    order.profit_target = profit_target;
    order.stop_price = stop_price;

    Ok(OrderResponse::from_bracket(&order))
  }

  async fn order_status(&self, order_id: &OrderId) -> Result<OrderResponse, ExecutionError> {
    let entry = self
      .orders
      .get(order_id)
      .await
      .ok_or_else(|| ExecutionError::OrderNotFound(order_id.clone()))?;
    let order = entry.lock().await;

    Ok(OrderResponse::from_bracket(&order))
  }
}
