/**
* filename : vwap_engine
* author : HAMA
* date: 2025. 5. 15.
* description:
**/

use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;

use async_trait::async_trait;

use crate::broker::traits::{BrokerAdapter, MarketDataProvider};
use crate::config::EngineConfig;
use crate::core::registry::OrderRegistry;
use crate::core::scheduler::SliceScheduler;
use crate::core::ExecutionStrategy;
use crate::error::ExecutionError;
use crate::models::market_data::MarketData;
use crate::models::order::{
  ExecutionStatus, ModifyRequest, OrderId, OrderRequest, StrategyParams, StrategyType,
  ValidationResult,
};
use crate::models::response::OrderResponse;
use crate::models::strategy_order::{SliceExecution, SliceState, VwapOrder, VwapSlice};
use crate::utils::logging;
use crate::utils::math::{ceil_to_step, weighted_average_price};

/// VWAP 주문 엔진
///
/// 과거 거래량 분포로 기간별 비중을 만들고, 비중에 비례한
/// 슬라이스를 기간 시작 오프셋에 예약한다. 실행과 완료 처리는
/// TWAP과 같고 벤치마크만 거래량 가중이다
pub struct VwapEngine {
  /// 브로커 어댑터
  broker: Arc<RwLock<dyn BrokerAdapter>>,
  /// 거래량 프로필용 시장 데이터 제공자
  market_data: Arc<RwLock<dyn MarketDataProvider>>,
  /// 주문 저장소
  orders: Arc<OrderRegistry<VwapOrder>>,
  /// 슬라이스 스케줄러
  scheduler: Arc<SliceScheduler>,
  /// 프로필 기간 수
  profile_periods: usize,
  /// 수량 최소 단위
  quantity_step: f64,
}

/// 과거 데이터가 없을 때 쓰는 고정 U자형 장중 거래량 곡선
fn u_shaped_profile(periods: usize) -> Vec<f64> {
  if periods == 0 {
    return Vec::new();
  }

  if periods == 1 {
    return vec![1.0];
  }

  let mid = (periods - 1) as f64 / 2.0;
  let weights: Vec<f64> = (0..periods)
    .map(|i| {
      let distance = (i as f64 - mid) / mid;
      1.0 + 2.0 * distance * distance
    })
    .collect();

  let total: f64 = weights.iter().sum();
  weights.iter().map(|w| w / total).collect()
}

/// 바 이력을 기간별로 묶어 거래량 비중 계산
fn calculate_volume_profile(bars: &[MarketData], periods: usize) -> Vec<f64> {
  if bars.is_empty() || periods == 0 {
    return u_shaped_profile(periods);
  }

  let total_volume: f64 = bars.iter().map(|b| b.volume).sum();
  if total_volume == 0.0 {
    return u_shaped_profile(periods);
  }

  let period_len = std::cmp::max(1, bars.len() / periods);
  let mut profile = Vec::with_capacity(periods);

  for i in 0..periods {
    let start_idx = std::cmp::min(i * period_len, bars.len());
    let end_idx = if i == periods - 1 {
      bars.len()
    } else {
      std::cmp::min((i + 1) * period_len, bars.len())
    };

    let period_volume: f64 = bars[start_idx..end_idx].iter().map(|b| b.volume).sum();
    profile.push(period_volume / total_volume);
  }

  profile
}

impl VwapEngine {
  pub fn new(
    broker: Arc<RwLock<dyn BrokerAdapter>>,
    market_data: Arc<RwLock<dyn MarketDataProvider>>,
    scheduler: Arc<SliceScheduler>,
    config: &EngineConfig,
  ) -> Self {
    VwapEngine {
      broker,
      market_data,
      orders: Arc::new(OrderRegistry::new()),
      scheduler,
      profile_periods: config.vwap_profile_periods,
      quantity_step: config.quantity_step,
    }
  }

  /// 확정된 슬라이스 할당 조회
  pub async fn planned_slices(&self, order_id: &OrderId) -> Result<Vec<VwapSlice>, ExecutionError> {
    let entry = self
      .orders
      .get(order_id)
      .await
      .ok_or_else(|| ExecutionError::OrderNotFound(order_id.clone()))?;
    let order = entry.lock().await;

    Ok(order.slices.clone())
  }

  /// 심볼의 거래량 프로필 조회. 이력이 없으면 U자형 곡선을 쓴다
  async fn volume_profile(&self, symbol: &str, window_minutes: u64) -> Vec<f64> {
    let bars = {
      let provider = self.market_data.read().await;
      provider.historical_bars(symbol, window_minutes).await
    };

    match bars {
      Ok(bars) => calculate_volume_profile(&bars, self.profile_periods),
      Err(e) => {
        log::warn!("Failed to load volume history for {}: {}", symbol, e);
        u_shaped_profile(self.profile_periods)
      }
    }
  }

  /// 기간 비중에 비례한 슬라이스 할당. 마지막 슬라이스가
  /// 나머지를 흡수해 합계는 정확히 총 수량이 된다
  fn build_slices(
    &self,
    total_quantity: f64,
    profile: &[f64],
    period_seconds: u64,
  ) -> Vec<VwapSlice> {
    let mut slices = Vec::with_capacity(profile.len());
    let mut remaining = total_quantity;

    for (i, pct) in profile.iter().enumerate() {
      let quantity = if i == profile.len() - 1 {
        remaining
      } else {
        ceil_to_step(total_quantity * pct, self.quantity_step).min(remaining)
      };

      slices.push(VwapSlice {
        slice_number: i + 1,
        quantity,
        delay_seconds: i as u64 * period_seconds,
        volume_percentage: *pct,
      });
      remaining -= quantity;
    }

    slices
  }

  /// 예약된 슬라이스 하나를 실행한다
  async fn run_slice(
    orders: Arc<OrderRegistry<VwapOrder>>,
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
    if order.vwap_state != SliceState::Active {
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
          log::error!(
            "Failed to execute VWAP slice {} for {}: {}",
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
      order.vwap_state = SliceState::Completed;
      order.status = ExecutionStatus::Completed;

      let prices: Vec<f64> = order.executions.iter().map(|e| e.execution_price).collect();
      let quantities: Vec<f64> = order.executions.iter().map(|e| e.quantity).collect();
      order.average_price = weighted_average_price(&prices, &quantities);

      log::info!("VWAP order completed: {}", order.order_id);
    }
  }
}

#[async_trait]
impl ExecutionStrategy for VwapEngine {
  fn strategy_type(&self) -> StrategyType {
    StrategyType::Vwap
  }

  fn validate(&self, request: &OrderRequest) -> ValidationResult {
    let StrategyParams::Vwap {
      time_window_minutes,
      participation_rate,
    } = &request.params
    else {
      return ValidationResult::invalid("Parameters do not match VWAP strategy");
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

    if let Some(rate) = participation_rate {
      if *rate <= 0.0 || *rate > 100.0 {
        return ValidationResult::invalid("Participation rate must be in (0, 100]");
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

    let StrategyParams::Vwap {
      time_window_minutes,
      participation_rate,
    } = request.params
    else {
      return Err(ExecutionError::InvalidParameter(
        "Parameters do not match VWAP strategy".to_string(),
      ));
    };

    // 예약 전에 거래량 프로필과 슬라이스 할당을 확정한다
    let profile = self.volume_profile(&request.symbol, time_window_minutes).await;
    let window_seconds = time_window_minutes * 60;
    let period_seconds = window_seconds / std::cmp::max(1, profile.len() as u64);
    let slices = self.build_slices(request.quantity, &profile, period_seconds);

    let order_id = OrderId::generate();
    let order = VwapOrder::new(
      order_id.clone(),
      request.symbol,
      request.side,
      request.quantity,
      participation_rate,
      slices.clone(),
    );

    logging::log_order_created(
      &order_id.0,
      &self.strategy_type().to_string(),
      &order.symbol,
      &order.side.to_string(),
      order.total_quantity,
    );

    let response = OrderResponse::from_vwap(&order);
    self.orders.insert(order_id.clone(), order).await;

    for slice in &slices {
      let delay = Duration::from_secs(slice.delay_seconds);
      let task = Self::run_slice(
        self.orders.clone(),
        self.broker.clone(),
        order_id.clone(),
        slice.slice_number,
        slice.quantity,
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

      order.vwap_state = SliceState::Cancelled;
      order.status = ExecutionStatus::Cancelled;
      logging::log_order_cancelled(&order.order_id.0);

      OrderResponse::from_vwap(&order)
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
      "VWAP order {} cannot be modified after scheduling has begun",
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

    Ok(OrderResponse::from_vwap(&order))
  }
}
