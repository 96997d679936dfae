//! 주문 실행 알고리즘의 핵심 구현체

pub mod bracket_engine;
pub mod iceberg_engine;
pub mod registry;
pub mod router;
pub mod scheduler;
pub mod stop_loss_engine;
pub mod trailing_stop_engine;
pub mod twap_engine;
pub mod vwap_engine;

use async_trait::async_trait;

use crate::error::ExecutionError;
use crate::models::order::{ModifyRequest, OrderId, OrderRequest, StrategyType, ValidationResult};
use crate::models::response::OrderResponse;

/// 주문 실행 전략 인터페이스
///
/// 여섯 개 엔진이 구현하는 닫힌 집합이다. 상위 디스패처는
/// StrategyType으로 엔진을 선택해 모든 엔진을 동일하게 다룬다.
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    /// 이 엔진이 담당하는 전략 유형
    fn strategy_type(&self) -> StrategyType;

    /// 주문 요청 검증 (순수 함수, 부수 효과 없음)
    fn validate(&self, request: &OrderRequest) -> ValidationResult;

    /// 주문 실행 시작 (상태 등록, 필요 시 슬라이스 예약)
    async fn execute(&self, request: OrderRequest) -> Result<OrderResponse, ExecutionError>;

    /// 가격 틱 처리. 트리거 발생 시 true 반환
    ///
    /// 시간 기반 전략은 기본 구현 그대로 항상 false를 반환한다
    async fn on_price_update(
        &self,
        order_id: &OrderId,
        price: f64,
    ) -> Result<bool, ExecutionError> {
        let _ = (order_id, price);
        Ok(false)
    }

    /// 주문 취소
    async fn cancel(&self, order_id: &OrderId) -> Result<OrderResponse, ExecutionError>;

    /// 주문 수정
    async fn modify(
        &self,
        order_id: &OrderId,
        request: ModifyRequest,
    ) -> Result<OrderResponse, ExecutionError>;

    /// 현재 주문 상태 스냅샷 조회
    async fn order_status(&self, order_id: &OrderId) -> Result<OrderResponse, ExecutionError>;
}

// 핵심 타입 재노출
pub use bracket_engine::BracketEngine;
pub use iceberg_engine::IcebergEngine;
pub use registry::OrderRegistry;
pub use router::StrategyRouter;
pub use scheduler::SliceScheduler;
pub use stop_loss_engine::StopLossEngine;
pub use trailing_stop_engine::TrailingStopEngine;
pub use twap_engine::TwapEngine;
pub use vwap_engine::VwapEngine;
