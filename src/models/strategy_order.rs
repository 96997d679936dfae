use serde::{Deserialize, Serialize};

use crate::models::order::{ExecutionStatus, OrderId, OrderSide};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum BracketState {
    Pending,
    Active,
    ProfitFilled,
    StopFilled,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum SliceState {
    Active,
    Completed,
    Cancelled,
}

/// 체결된 슬라이스 기록 (추가 전용 감사 내역)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceExecution {
    pub slice_number: usize,
    pub quantity: f64,
    pub execution_price: f64,
    pub execution_time: i64,
}

/// 사전 계산된 VWAP 슬라이스 할당
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VwapSlice {
    pub slice_number: usize,
    pub quantity: f64,
    pub delay_seconds: u64,
    pub volume_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopLossOrder {
    pub order_id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub total_quantity: f64,
    pub stop_price: f64,
    pub fill_price: Option<f64>,
    pub status: ExecutionStatus,
    pub created_at: i64,
}

impl StopLossOrder {
    pub fn new(
        order_id: OrderId,
        symbol: impl Into<String>,
        side: OrderSide,
        total_quantity: f64,
        stop_price: f64,
    ) -> Self {
        StopLossOrder {
            order_id,
            symbol: symbol.into(),
            side,
            total_quantity,
            stop_price,
            fill_price: None,
            status: ExecutionStatus::Pending,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailingStopOrder {
    pub order_id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub total_quantity: f64,
    pub trail_amount: Option<f64>,
    pub trail_percent: Option<f64>,
    /// 첫 틱 이전에는 None
    pub current_stop_price: Option<f64>,
    /// 매도는 최고가, 매수는 최저가 추적. 첫 틱 이전에는 None
    pub extreme_price: Option<f64>,
    pub fill_price: Option<f64>,
    pub status: ExecutionStatus,
    pub created_at: i64,
}

impl TrailingStopOrder {
    pub fn new(
        order_id: OrderId,
        symbol: impl Into<String>,
        side: OrderSide,
        total_quantity: f64,
        trail_amount: Option<f64>,
        trail_percent: Option<f64>,
    ) -> Self {
        TrailingStopOrder {
            order_id,
            symbol: symbol.into(),
            side,
            total_quantity,
            trail_amount,
            trail_percent,
            current_stop_price: None,
            extreme_price: None,
            fill_price: None,
            status: ExecutionStatus::Pending,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// 극값 기준 트레일 간격
    pub fn trail_distance(&self, extreme: f64) -> f64 {
        self.trail_percent
            .map(|p| extreme * p / 100.0)
            .or(self.trail_amount)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BracketOrder {
    pub order_id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub total_quantity: f64,
    /// None이면 시장가 진입
    pub entry_price: Option<f64>,
    pub profit_target: f64,
    pub stop_price: f64,
    pub bracket_state: BracketState,
    pub entry_fill_price: Option<f64>,
    pub exit_fill_price: Option<f64>,
    pub status: ExecutionStatus,
    pub created_at: i64,
}

impl BracketOrder {
    pub fn new(
        order_id: OrderId,
        symbol: impl Into<String>,
        side: OrderSide,
        total_quantity: f64,
        entry_price: Option<f64>,
        profit_target: f64,
        stop_price: f64,
    ) -> Self {
        BracketOrder {
            order_id,
            symbol: symbol.into(),
            side,
            total_quantity,
            entry_price,
            profit_target,
            stop_price,
            bracket_state: BracketState::Pending,
            entry_fill_price: None,
            exit_fill_price: None,
            status: ExecutionStatus::Pending,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcebergOrder {
    pub order_id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub total_quantity: f64,
    pub display_quantity: f64,
    /// None이면 시장가 아이스버그 (모든 틱에서 체결)
    pub limit_price: Option<f64>,
    pub filled_quantity: f64,
    /// 현재 작업 중인 슬라이스 번호 (1부터 시작)
    pub current_slice_number: usize,
    pub total_slices: usize,
    pub iceberg_state: SliceState,
    pub status: ExecutionStatus,
    pub created_at: i64,
}

impl IcebergOrder {
    pub fn new(
        order_id: OrderId,
        symbol: impl Into<String>,
        side: OrderSide,
        total_quantity: f64,
        display_quantity: f64,
        limit_price: Option<f64>,
    ) -> Self {
        let total_slices = (total_quantity / display_quantity).ceil() as usize;

        IcebergOrder {
            order_id,
            symbol: symbol.into(),
            side,
            total_quantity,
            display_quantity,
            limit_price,
            filled_quantity: 0.0,
            current_slice_number: 1,
            total_slices,
            iceberg_state: SliceState::Active,
            status: ExecutionStatus::Active,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn remaining_quantity(&self) -> f64 {
        self.total_quantity - self.filled_quantity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwapOrder {
    pub order_id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub total_quantity: f64,
    pub slice_size: f64,
    pub total_slices: usize,
    pub executed_slices: usize,
    pub filled_quantity: f64,
    pub slice_interval_seconds: u64,
    /// 슬라이스별 계획 수량 (합계는 정확히 total_quantity)
    pub slice_plan: Vec<f64>,
    pub executions: Vec<SliceExecution>,
    pub average_price: Option<f64>,
    pub twap_state: SliceState,
    pub status: ExecutionStatus,
    pub created_at: i64,
}

impl TwapOrder {
    pub fn new(
        order_id: OrderId,
        symbol: impl Into<String>,
        side: OrderSide,
        total_quantity: f64,
        slice_size: f64,
        slice_interval_seconds: u64,
        slice_plan: Vec<f64>,
    ) -> Self {
        let total_slices = slice_plan.len();

        TwapOrder {
            order_id,
            symbol: symbol.into(),
            side,
            total_quantity,
            slice_size,
            total_slices,
            executed_slices: 0,
            filled_quantity: 0.0,
            slice_interval_seconds,
            slice_plan,
            executions: Vec::new(),
            average_price: None,
            twap_state: SliceState::Active,
            status: ExecutionStatus::Active,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VwapOrder {
    pub order_id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub total_quantity: f64,
    pub total_slices: usize,
    pub executed_slices: usize,
    pub filled_quantity: f64,
    pub participation_rate: Option<f64>,
    /// 거래량 프로필 기반 사전 할당
    pub slices: Vec<VwapSlice>,
    pub executions: Vec<SliceExecution>,
    pub average_price: Option<f64>,
    pub vwap_state: SliceState,
    pub status: ExecutionStatus,
    pub created_at: i64,
}

impl VwapOrder {
    pub fn new(
        order_id: OrderId,
        symbol: impl Into<String>,
        side: OrderSide,
        total_quantity: f64,
        participation_rate: Option<f64>,
        slices: Vec<VwapSlice>,
    ) -> Self {
        let total_slices = slices.len();

        VwapOrder {
            order_id,
            symbol: symbol.into(),
            side,
            total_quantity,
            total_slices,
            executed_slices: 0,
            filled_quantity: 0.0,
            participation_rate,
            slices,
            executions: Vec::new(),
            average_price: None,
            vwap_state: SliceState::Active,
            status: ExecutionStatus::Active,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}
