//! Bracket (OCO) 엔진 테스트
//!
//! 진입 체결, 익절/손절 다리 평가, OCO 종결, 진입 만료 확인

use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;

use rstest::rstest;

use xExec::broker::mocks::{MockBroker, MockMarketData};
use xExec::broker::traits::{BrokerAdapter, MarketDataProvider};
use xExec::config::Config;
use xExec::core::{BracketEngine, ExecutionStrategy, SliceScheduler};
use xExec::models::order::{
  ExecutionStatus, ModifyRequest, OrderRequest, OrderSide, StrategyParams,
};
use xExec::models::strategy_order::BracketState;
use xExec::ExecutionError;

fn setup_with_config(config: &Config) -> (Arc<RwLock<MockMarketData>>, BracketEngine) {
  let market = Arc::new(RwLock::new(MockMarketData::new()));
  let market_dyn: Arc<RwLock<dyn MarketDataProvider>> = market.clone();
  let broker: Arc<RwLock<dyn BrokerAdapter>> =
    Arc::new(RwLock::new(MockBroker::new(market_dyn)));
  let scheduler = Arc::new(SliceScheduler::new());

  (market, BracketEngine::new(broker, scheduler, &config.engine))
}

fn setup() -> (Arc<RwLock<MockMarketData>>, BracketEngine) {
  setup_with_config(&Config::default())
}

fn buy_bracket(entry: Option<f64>, profit: f64, stop: f64) -> OrderRequest {
  OrderRequest::new(
    "AAPL",
    OrderSide::Buy,
    100.0,
    StrategyParams::Bracket {
      entry_price: entry,
      profit_target: profit,
      stop_price: stop,
    },
  )
}

#[tokio::test]
async fn test_buy_bracket_profit_leg_wins() {
  // 진입 100, 익절 110, 손절 95. 체결 후 틱 [105, 111] → PROFIT_FILLED
  let (market, engine) = setup();
  market.write().await.set_price("AAPL", 111.0);

  let response = engine.execute(buy_bracket(Some(100.0), 110.0, 95.0)).await.unwrap();
  let id = &response.order_id;
  assert_eq!(engine.bracket_state(id).await.unwrap(), BracketState::Pending);

  // 지정가 100 진입: 100 이하 틱에서 체결
  assert!(engine.on_price_update(id, 100.0).await.unwrap());
  assert_eq!(engine.bracket_state(id).await.unwrap(), BracketState::Active);

  let status = engine.order_status(id).await.unwrap();
  assert_eq!(status.status, ExecutionStatus::Active);

  assert!(!engine.on_price_update(id, 105.0).await.unwrap());
  assert!(engine.on_price_update(id, 111.0).await.unwrap());

  // 익절 다리 체결, 손절 다리는 암묵적으로 취소 (추가 평가 없음)
  assert_eq!(engine.bracket_state(id).await.unwrap(), BracketState::ProfitFilled);
  let status = engine.order_status(id).await.unwrap();
  assert_eq!(status.status, ExecutionStatus::Filled);
  assert_eq!(status.filled_quantity, 100.0);

  // 종결 후 손절가 틱에도 변화 없음
  assert!(!engine.on_price_update(id, 90.0).await.unwrap());
  assert_eq!(engine.bracket_state(id).await.unwrap(), BracketState::ProfitFilled);
}

#[tokio::test]
async fn test_buy_bracket_stop_leg_wins() {
  let (market, engine) = setup();
  market.write().await.set_price("AAPL", 94.0);

  let response = engine.execute(buy_bracket(Some(100.0), 110.0, 95.0)).await.unwrap();
  let id = &response.order_id;

  assert!(engine.on_price_update(id, 99.0).await.unwrap());
  assert!(!engine.on_price_update(id, 104.0).await.unwrap());
  assert!(engine.on_price_update(id, 94.0).await.unwrap());

  assert_eq!(engine.bracket_state(id).await.unwrap(), BracketState::StopFilled);
}

#[tokio::test]
async fn test_market_entry_fills_on_first_tick() {
  let (market, engine) = setup();
  market.write().await.set_price("AAPL", 102.0);

  let response = engine.execute(buy_bracket(None, 110.0, 95.0)).await.unwrap();
  let id = &response.order_id;

  assert!(engine.on_price_update(id, 102.0).await.unwrap());
  assert_eq!(engine.bracket_state(id).await.unwrap(), BracketState::Active);
}

#[tokio::test]
async fn test_sell_bracket_sides_are_mirrored() {
  // 숏 브라켓: 손절 105 > 진입 100 > 익절 90
  let (market, engine) = setup();
  market.write().await.set_price("AAPL", 90.0);

  let request = OrderRequest::new(
    "AAPL",
    OrderSide::Sell,
    100.0,
    StrategyParams::Bracket {
      entry_price: Some(100.0),
      profit_target: 90.0,
      stop_price: 105.0,
    },
  );
  let response = engine.execute(request).await.unwrap();
  let id = &response.order_id;

  // 매도 진입은 100 이상 틱에서 체결
  assert!(engine.on_price_update(id, 100.5).await.unwrap());
  assert!(!engine.on_price_update(id, 95.0).await.unwrap());
  assert!(engine.on_price_update(id, 90.0).await.unwrap());

  assert_eq!(engine.bracket_state(id).await.unwrap(), BracketState::ProfitFilled);
}

#[tokio::test]
async fn test_modify_rejected_after_activation() {
  let (_market, engine) = setup();

  let response = engine.execute(buy_bracket(Some(100.0), 110.0, 95.0)).await.unwrap();
  let id = &response.order_id;

  // Pending 동안 가격 수정 허용 (순서 불변식 재검사 포함)
  let modified = engine
    .modify(id, ModifyRequest::new().with_profit_target(120.0))
    .await
    .unwrap();
  assert_eq!(modified.status, ExecutionStatus::Pending);

  let bad = engine
    .modify(id, ModifyRequest::new().with_profit_target(90.0))
    .await;
  assert!(matches!(bad, Err(ExecutionError::InvalidParameter(_))));

  // 활성화 후 수정은 InvalidState
  engine.on_price_update(id, 100.0).await.unwrap();
  let result = engine
    .modify(id, ModifyRequest::new().with_profit_target(130.0))
    .await;
  assert!(matches!(result, Err(ExecutionError::InvalidState(_))));
}

#[tokio::test(start_paused = true)]
async fn test_entry_expiry_cancels_pending_bracket() {
  // 진입 만료 60초 설정: 미체결 브라켓은 만료 시점에 취소된다
  let mut config = Config::default();
  config.engine.bracket_entry_expiry_secs = Some(60);
  let (_market, engine) = setup_with_config(&config);

  let response = engine.execute(buy_bracket(Some(100.0), 110.0, 95.0)).await.unwrap();
  let id = &response.order_id;

  tokio::time::sleep(Duration::from_secs(61)).await;

  assert_eq!(engine.bracket_state(id).await.unwrap(), BracketState::Cancelled);
  let status = engine.order_status(id).await.unwrap();
  assert_eq!(status.status, ExecutionStatus::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_entry_expiry_leaves_active_bracket_alone() {
  let mut config = Config::default();
  config.engine.bracket_entry_expiry_secs = Some(60);
  let (_market, engine) = setup_with_config(&config);

  let response = engine.execute(buy_bracket(Some(100.0), 110.0, 95.0)).await.unwrap();
  let id = &response.order_id;

  // 만료 전에 진입 체결
  engine.on_price_update(id, 100.0).await.unwrap();
  tokio::time::sleep(Duration::from_secs(120)).await;

  assert_eq!(engine.bracket_state(id).await.unwrap(), BracketState::Active);
}

#[rstest]
#[case(Some(100.0), 110.0, 95.0, true)]
#[case(Some(100.0), 90.0, 95.0, false)] // 익절이 진입 아래
#[case(Some(100.0), 110.0, 105.0, false)] // 손절이 진입 위
#[case(Some(100.0), 0.0, 95.0, false)]
#[case(Some(100.0), 110.0, -5.0, false)]
#[case(None, 110.0, 95.0, true)] // 시장가 진입은 순서 검사 생략
fn test_buy_bracket_validation(
  #[case] entry: Option<f64>,
  #[case] profit: f64,
  #[case] stop: f64,
  #[case] expected: bool,
) {
  let (_market, engine) = setup();
  let request = buy_bracket(entry, profit, stop);

  assert_eq!(engine.validate(&request).is_valid(), expected);
}
