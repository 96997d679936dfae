//! 주문 실행 엔진 라이브러리
//!
//! 대량/조건부 주문을 예약되거나 가격으로 트리거되는 자식 체결로
//! 변환하는 실행 전략(스탑로스, 트레일링 스탑, 브라켓, 아이스버그,
//! TWAP, VWAP)을 제공합니다.

pub mod broker;
pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod utils;

// 핵심 타입 재노출
pub use crate::broker::traits::{BrokerAdapter, FillConfirmation, MarketDataProvider};
pub use crate::config::Config;
pub use crate::core::{ExecutionStrategy, StrategyRouter};
pub use crate::error::ExecutionError;
pub use crate::models::order::{
    ExecutionStatus, ModifyRequest, OrderId, OrderRequest, OrderSide, StrategyParams, StrategyType,
    ValidationResult,
};
pub use crate::models::response::OrderResponse;

/// 버전 정보
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 결과 타입 별칭
pub type Result<T> = std::result::Result<T, ExecutionError>;
