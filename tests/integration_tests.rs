//! 통합 테스트
//!
//! 라우터 디스패치, 오류 분류, 어댑터 실패 후 재시도 확인

use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;

use xExec::broker::mocks::{MockBroker, MockMarketData};
use xExec::broker::traits::{BrokerAdapter, MarketDataProvider};
use xExec::config::Config;
use xExec::core::StrategyRouter;
use xExec::models::order::{
  ExecutionStatus, ModifyRequest, OrderId, OrderRequest, OrderSide, StrategyParams, StrategyType,
};
use xExec::utils::logging;
use xExec::ExecutionError;

fn setup() -> (Arc<RwLock<MockMarketData>>, Arc<RwLock<MockBroker>>, StrategyRouter) {
  let _ = logging::init();

  let market = Arc::new(RwLock::new(MockMarketData::new()));
  let market_dyn: Arc<RwLock<dyn MarketDataProvider>> = market.clone();
  let broker = Arc::new(RwLock::new(MockBroker::new(market_dyn.clone())));
  let broker_dyn: Arc<RwLock<dyn BrokerAdapter>> = broker.clone();

  let router = StrategyRouter::new(broker_dyn, market_dyn, &Config::default());
  (market, broker, router)
}

#[tokio::test(start_paused = true)]
async fn test_router_dispatches_every_strategy_type() {
  let (market, _broker, router) = setup();
  market.write().await.set_price("AAPL", 100.0);
  market.write().await.set_history("AAPL", Vec::new());

  let requests = vec![
    OrderRequest::new("AAPL", OrderSide::Sell, 10.0, StrategyParams::StopLoss { stop_price: 90.0 }),
    OrderRequest::new(
      "AAPL",
      OrderSide::Sell,
      10.0,
      StrategyParams::TrailingStop { trail_amount: Some(5.0), trail_percent: None },
    ),
    OrderRequest::new(
      "AAPL",
      OrderSide::Buy,
      10.0,
      StrategyParams::Bracket { entry_price: Some(95.0), profit_target: 105.0, stop_price: 90.0 },
    ),
    OrderRequest::new(
      "AAPL",
      OrderSide::Buy,
      10.0,
      StrategyParams::Iceberg { display_quantity: 2.0, limit_price: Some(99.0) },
    ),
    OrderRequest::new(
      "AAPL",
      OrderSide::Buy,
      10.0,
      StrategyParams::Twap { time_window_minutes: 10, slice_interval_seconds: 120 },
    ),
    OrderRequest::new(
      "AAPL",
      OrderSide::Buy,
      10.0,
      StrategyParams::Vwap { time_window_minutes: 10, participation_rate: None },
    ),
  ];

  let expected = [
    StrategyType::StopLoss,
    StrategyType::TrailingStop,
    StrategyType::Bracket,
    StrategyType::Iceberg,
    StrategyType::Twap,
    StrategyType::Vwap,
  ];

  for (request, strategy_type) in requests.into_iter().zip(expected) {
    assert!(router.validate(&request).is_valid());

    let response = router.execute(request).await.unwrap();
    assert_eq!(response.strategy_type, strategy_type);

    // 실행 직후 상태 조회는 같은 엔진으로 라우팅된다
    let status = router.order_status(&response.order_id).await.unwrap();
    assert_eq!(status.strategy_type, strategy_type);
    assert!(status.filled_quantity <= status.total_quantity);
  }
}

#[tokio::test]
async fn test_router_price_updates_reach_owning_engine() {
  let (market, _broker, router) = setup();
  market.write().await.set_price("AAPL", 89.0);

  let stop = router
    .execute(OrderRequest::new(
      "AAPL",
      OrderSide::Sell,
      10.0,
      StrategyParams::StopLoss { stop_price: 90.0 },
    ))
    .await
    .unwrap();

  let iceberg = router
    .execute(OrderRequest::new(
      "AAPL",
      OrderSide::Buy,
      10.0,
      StrategyParams::Iceberg { display_quantity: 4.0, limit_price: Some(88.0) },
    ))
    .await
    .unwrap();

  // 같은 틱 가격이라도 주문별로 독립 평가된다
  assert!(router.on_price_update(&stop.order_id, 89.0).await.unwrap());
  assert!(!router.on_price_update(&iceberg.order_id, 89.0).await.unwrap());
  assert!(router.on_price_update(&iceberg.order_id, 87.0).await.unwrap());

  assert_eq!(
    router.order_status(&stop.order_id).await.unwrap().status,
    ExecutionStatus::Filled
  );
  assert_eq!(
    router.order_status(&iceberg.order_id).await.unwrap().filled_quantity,
    4.0
  );
}

#[tokio::test]
async fn test_unknown_order_id_is_typed_not_found() {
  let (_market, _broker, router) = setup();
  let missing = OrderId("no-such-order".to_string());

  assert!(matches!(
    router.on_price_update(&missing, 100.0).await,
    Err(ExecutionError::OrderNotFound(_))
  ));
  assert!(matches!(
    router.cancel(&missing).await,
    Err(ExecutionError::OrderNotFound(_))
  ));
  assert!(matches!(
    router.modify(&missing, ModifyRequest::new()).await,
    Err(ExecutionError::OrderNotFound(_))
  ));
  assert!(matches!(
    router.order_status(&missing).await,
    Err(ExecutionError::OrderNotFound(_))
  ));
}

#[tokio::test]
async fn test_validation_failures_are_values_not_errors() {
  let (_market, _broker, router) = setup();

  let bad = OrderRequest::new(
    "AAPL",
    OrderSide::Buy,
    10.0,
    StrategyParams::Twap { time_window_minutes: 1, slice_interval_seconds: 60 },
  );

  let result = router.validate(&bad);
  assert!(!result.is_valid());
  assert!(result.error_message.is_some());

  // 검증을 건너뛰고 실행하면 타입 있는 오류가 된다
  let executed = router.execute(bad).await;
  assert!(matches!(executed, Err(ExecutionError::InvalidParameter(_))));
}

#[tokio::test]
async fn test_adapter_failure_then_retry_succeeds() {
  // 트리거 시점 어댑터 거부 → 주문은 일관된 이전 상태 유지 → 재시도 성공
  let (market, broker, router) = setup();
  market.write().await.set_price("AAPL", 89.0);

  let stop = router
    .execute(OrderRequest::new(
      "AAPL",
      OrderSide::Sell,
      10.0,
      StrategyParams::StopLoss { stop_price: 90.0 },
    ))
    .await
    .unwrap();

  broker.write().await.set_fail_submissions(true);
  let result = router.on_price_update(&stop.order_id, 89.0).await;
  assert!(matches!(result, Err(ExecutionError::AdapterError(_))));
  assert_eq!(
    router.order_status(&stop.order_id).await.unwrap().status,
    ExecutionStatus::Pending
  );

  broker.write().await.set_fail_submissions(false);
  assert!(router.on_price_update(&stop.order_id, 89.0).await.unwrap());
  assert_eq!(
    router.order_status(&stop.order_id).await.unwrap().status,
    ExecutionStatus::Filled
  );
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_order_stays_queryable_until_discarded() {
  let (market, _broker, router) = setup();
  market.write().await.set_price("AAPL", 100.0);

  let twap = router
    .execute(OrderRequest::new(
      "AAPL",
      OrderSide::Buy,
      100.0,
      StrategyParams::Twap { time_window_minutes: 10, slice_interval_seconds: 120 },
    ))
    .await
    .unwrap();

  tokio::time::sleep(Duration::from_secs(130)).await;
  router.cancel(&twap.order_id).await.unwrap();

  // 종결 주문은 폐기 전까지 조회 가능하고, 거듭 취소는 거부된다
  let status = router.order_status(&twap.order_id).await.unwrap();
  assert_eq!(status.status, ExecutionStatus::Cancelled);
  assert!(matches!(
    router.cancel(&twap.order_id).await,
    Err(ExecutionError::InvalidState(_))
  ));
}
