/**
* filename : router
* author : HAMA
* date: 2025. 5. 16.
* description:
**/

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::broker::traits::{BrokerAdapter, MarketDataProvider};
use crate::config::Config;
use crate::core::bracket_engine::BracketEngine;
use crate::core::iceberg_engine::IcebergEngine;
use crate::core::scheduler::SliceScheduler;
use crate::core::stop_loss_engine::StopLossEngine;
use crate::core::trailing_stop_engine::TrailingStopEngine;
use crate::core::twap_engine::TwapEngine;
use crate::core::vwap_engine::VwapEngine;
use crate::core::ExecutionStrategy;
use crate::error::ExecutionError;
use crate::models::order::{
  ModifyRequest, OrderId, OrderRequest, StrategyType, ValidationResult,
};
use crate::models::response::OrderResponse;

/// 전략 라우터 - 전략 유형별 엔진 디스패치
///
/// 여섯 엔진 전부를 소유하며 매핑은 전체적이고 고정이다.
/// 주문 ID만으로 들어오는 호출은 실행 시점에 기록한
/// 주문-전략 인덱스로 라우팅한다
pub struct StrategyRouter {
  stop_loss: Arc<StopLossEngine>,
  trailing_stop: Arc<TrailingStopEngine>,
  bracket: Arc<BracketEngine>,
  iceberg: Arc<IcebergEngine>,
  twap: Arc<TwapEngine>,
  vwap: Arc<VwapEngine>,
  order_index: RwLock<HashMap<OrderId, StrategyType>>,
}

impl StrategyRouter {
  pub fn new(
    broker: Arc<RwLock<dyn BrokerAdapter>>,
    market_data: Arc<RwLock<dyn MarketDataProvider>>,
    config: &Config,
  ) -> Self {
    let scheduler = Arc::new(SliceScheduler::new());

    StrategyRouter {
      stop_loss: Arc::new(StopLossEngine::new(broker.clone())),
      trailing_stop: Arc::new(TrailingStopEngine::new(broker.clone(), &config.engine)),
      bracket: Arc::new(BracketEngine::new(
        broker.clone(),
        scheduler.clone(),
        &config.engine,
      )),
      iceberg: Arc::new(IcebergEngine::new(broker.clone())),
      twap: Arc::new(TwapEngine::new(
        broker.clone(),
        scheduler.clone(),
        &config.engine,
      )),
      vwap: Arc::new(VwapEngine::new(broker, market_data, scheduler, &config.engine)),
      order_index: RwLock::new(HashMap::new()),
    }
  }

  /// 전략 유형에 해당하는 엔진 (닫힌 집합이므로 매핑은 전체적)
  pub fn engine_for(&self, strategy_type: StrategyType) -> Arc<dyn ExecutionStrategy> {
    match strategy_type {
      StrategyType::StopLoss => self.stop_loss.clone(),
      StrategyType::TrailingStop => self.trailing_stop.clone(),
      StrategyType::Bracket => self.bracket.clone(),
      StrategyType::Iceberg => self.iceberg.clone(),
      StrategyType::Twap => self.twap.clone(),
      StrategyType::Vwap => self.vwap.clone(),
    }
  }

  pub fn validate(&self, request: &OrderRequest) -> ValidationResult {
    self.engine_for(request.strategy_type()).validate(request)
  }

  pub async fn execute(&self, request: OrderRequest) -> Result<OrderResponse, ExecutionError> {
    let engine = self.engine_for(request.strategy_type());
    let response = engine.execute(request).await?;

    self
      .order_index
      .write()
      .await
      .insert(response.order_id.clone(), response.strategy_type);

    Ok(response)
  }

  pub async fn on_price_update(
    &self,
    order_id: &OrderId,
    price: f64,
  ) -> Result<bool, ExecutionError> {
    let engine = self.engine_of_order(order_id).await?;
    engine.on_price_update(order_id, price).await
  }

  pub async fn cancel(&self, order_id: &OrderId) -> Result<OrderResponse, ExecutionError> {
    let engine = self.engine_of_order(order_id).await?;
    engine.cancel(order_id).await
  }

  pub async fn modify(
    &self,
    order_id: &OrderId,
    request: ModifyRequest,
  ) -> Result<OrderResponse, ExecutionError> {
    let engine = self.engine_of_order(order_id).await?;
    engine.modify(order_id, request).await
  }

  pub async fn order_status(&self, order_id: &OrderId) -> Result<OrderResponse, ExecutionError> {
    let engine = self.engine_of_order(order_id).await?;
    engine.order_status(order_id).await
  }

  async fn engine_of_order(
    &self,
    order_id: &OrderId,
  ) -> Result<Arc<dyn ExecutionStrategy>, ExecutionError> {
    let strategy_type = self
      .order_index
      .read()
      .await
      .get(order_id)
      .copied()
      .ok_or_else(|| ExecutionError::OrderNotFound(order_id.clone()))?;

    Ok(self.engine_for(strategy_type))
  }
}
