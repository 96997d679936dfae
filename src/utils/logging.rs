//! 로깅 유틸리티
//!
//! 로그 초기화 및 주문 생명주기 로그 함수 제공

use env_logger::Builder;
use log::LevelFilter;
use std::env;

use crate::error::ExecutionError;

/// 로깅 시스템 초기화
pub fn init() -> Result<(), ExecutionError> {
    let mut builder = Builder::from_default_env();

    // RUST_LOG 환경변수 확인
    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    // 로그 레벨 파싱
    let level_filter = match log_level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    };

    builder
      .filter_level(level_filter)
      .format_timestamp_millis()
      .try_init()
      .map_err(|e| ExecutionError::ConfigError(format!("Failed to initialize logger: {}", e)))?;

    log::info!("로깅 시스템 초기화 완료: 레벨 = {}", log_level);

    Ok(())
}

/// 주문 등록 로그
pub fn log_order_created(order_id: &str, strategy: &str, symbol: &str, side: &str, quantity: f64) {
    log::info!("주문 등록: {} - 전략: {} - 심볼: {} - 방향: {} - 수량: {}",
               order_id, strategy, symbol, side, quantity);
}

/// 주문 취소 로그
pub fn log_order_cancelled(order_id: &str) {
    log::info!("주문 취소: {}", order_id);
}

/// 주문 체결 로그
pub fn log_order_filled(order_id: &str, symbol: &str, quantity: f64, price: f64) {
    log::info!("주문 체결: {} - 심볼: {} - 수량: {} - 가격: {}",
               order_id, symbol, quantity, price);
}

/// 슬라이스 체결 로그
pub fn log_slice_executed(order_id: &str, slice_number: usize, quantity: f64, price: f64) {
    log::info!("슬라이스 체결: {} - 번호: {} - 수량: {} - 가격: {}",
               order_id, slice_number, quantity, price);
}

/// 오류 로그
pub fn log_error(context: &str, error: &ExecutionError) {
    log::error!("오류 발생 - {}: {}", context, error);
}
