use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, Eq, Hash, PartialEq)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn generate() -> Self {
        OrderId(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(&self) -> OrderSide {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, Hash, PartialEq)]
pub enum StrategyType {
    StopLoss,
    TrailingStop,
    Bracket,
    Iceberg,
    Twap,
    Vwap,
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyType::StopLoss => write!(f, "STOP_LOSS"),
            StrategyType::TrailingStop => write!(f, "TRAILING_STOP"),
            StrategyType::Bracket => write!(f, "BRACKET"),
            StrategyType::Iceberg => write!(f, "ICEBERG"),
            StrategyType::Twap => write!(f, "TWAP"),
            StrategyType::Vwap => write!(f, "VWAP"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum ExecutionStatus {
    Pending,
    Active,
    Filled,
    Completed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Filled | ExecutionStatus::Completed | ExecutionStatus::Cancelled
        )
    }
}

/// 전략별 주문 파라미터. 변형이 전략 유형을 결정한다 (닫힌 집합)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StrategyParams {
    StopLoss {
        stop_price: f64,
    },
    TrailingStop {
        trail_amount: Option<f64>,
        trail_percent: Option<f64>,
    },
    Bracket {
        entry_price: Option<f64>,
        profit_target: f64,
        stop_price: f64,
    },
    Iceberg {
        display_quantity: f64,
        limit_price: Option<f64>,
    },
    Twap {
        time_window_minutes: u64,
        slice_interval_seconds: u64,
    },
    Vwap {
        time_window_minutes: u64,
        participation_rate: Option<f64>,
    },
}

impl StrategyParams {
    pub fn strategy_type(&self) -> StrategyType {
        match self {
            StrategyParams::StopLoss { .. } => StrategyType::StopLoss,
            StrategyParams::TrailingStop { .. } => StrategyType::TrailingStop,
            StrategyParams::Bracket { .. } => StrategyType::Bracket,
            StrategyParams::Iceberg { .. } => StrategyType::Iceberg,
            StrategyParams::Twap { .. } => StrategyType::Twap,
            StrategyParams::Vwap { .. } => StrategyType::Vwap,
        }
    }
}

/// 상위 주문 요청. 제출 이후 불변
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub params: StrategyParams,
}

impl OrderRequest {
    pub fn new(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: f64,
        params: StrategyParams,
    ) -> Self {
        OrderRequest {
            symbol: symbol.into(),
            side,
            quantity,
            params,
        }
    }

    pub fn strategy_type(&self) -> StrategyType {
        self.params.strategy_type()
    }
}

/// 주문 수정 요청. 전략별로 지원하는 필드만 사용된다
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModifyRequest {
    pub quantity: Option<f64>,
    pub stop_price: Option<f64>,
    pub display_quantity: Option<f64>,
    pub limit_price: Option<f64>,
    pub trail_amount: Option<f64>,
    pub trail_percent: Option<f64>,
    pub entry_price: Option<f64>,
    pub profit_target: Option<f64>,
}

impl ModifyRequest {
    pub fn new() -> Self {
        ModifyRequest::default()
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_stop_price(mut self, stop_price: f64) -> Self {
        self.stop_price = Some(stop_price);
        self
    }

    pub fn with_display_quantity(mut self, display_quantity: f64) -> Self {
        self.display_quantity = Some(display_quantity);
        self
    }

    pub fn with_limit_price(mut self, limit_price: f64) -> Self {
        self.limit_price = Some(limit_price);
        self
    }

    pub fn with_trail_amount(mut self, trail_amount: f64) -> Self {
        self.trail_amount = Some(trail_amount);
        self
    }

    pub fn with_trail_percent(mut self, trail_percent: f64) -> Self {
        self.trail_percent = Some(trail_percent);
        self
    }

    pub fn with_entry_price(mut self, entry_price: f64) -> Self {
        self.entry_price = Some(entry_price);
        self
    }

    pub fn with_profit_target(mut self, profit_target: f64) -> Self {
        self.profit_target = Some(profit_target);
        self
    }
}

/// 검증 결과. 오류가 아닌 값으로 반환된다
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub error_message: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        ValidationResult {
            valid: true,
            error_message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ValidationResult {
            valid: false,
            error_message: Some(message.into()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}
