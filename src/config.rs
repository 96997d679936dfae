/**
* filename : config
* author : HAMA
* date: 2025. 5. 12.
* description:
**/

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::ExecutionError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub engine: EngineConfig,
    pub broker: BrokerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 가격 최소 단위 (트레일링 스탑 가격 반올림에 사용)
    pub price_tick_size: f64,
    /// 수량 최소 단위 (슬라이스 크기 올림에 사용)
    pub quantity_step: f64,
    /// VWAP 거래량 프로필 기간 수
    pub vwap_profile_periods: usize,
    /// 브라켓 진입 미체결 만료 (초). None이면 취소 전까지 유효
    pub bracket_entry_expiry_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub name: String,
    pub use_mock: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub fn load() -> Result<Self, ExecutionError> {
        // Try to load from config.json
        let config_path = Path::new("config.json");

        if config_path.exists() {
            let mut file = File::open(config_path)
                .map_err(|e| ExecutionError::ConfigError(format!("Failed to open config file: {}", e)))?;

            let mut contents = String::new();
            file.read_to_string(&mut contents)
                .map_err(|e| ExecutionError::ConfigError(format!("Failed to read config file: {}", e)))?;

            let mut cfg: Config = serde_json::from_str(&contents)
                .map_err(|e| ExecutionError::ConfigError(format!("Failed to parse config file: {}", e)))?;
            // environment overrides
            cfg.apply_env_overrides();
            Ok(cfg)
        } else {
            // Return default configuration
            let mut cfg = Config::default();
            cfg.apply_env_overrides();
            Ok(cfg)
        }
    }

    /// Apply environment variable overrides for runtime fields
    fn apply_env_overrides(&mut self) {
        use std::env;
        if let Ok(v) = env::var("USE_MOCK") {
            let lower = v.to_lowercase();
            if ["1", "true", "yes"].contains(&lower.as_str()) { self.broker.use_mock = true; }
            if ["0", "false", "no"].contains(&lower.as_str()) { self.broker.use_mock = false; }
        }
        if let Ok(v) = env::var("PRICE_TICK_SIZE") {
            if let Ok(tick) = v.parse::<f64>() { if tick > 0.0 { self.engine.price_tick_size = tick; } }
        }
        if let Ok(v) = env::var("QUANTITY_STEP") {
            if let Ok(step) = v.parse::<f64>() { if step > 0.0 { self.engine.quantity_step = step; } }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            engine: EngineConfig {
                price_tick_size: 0.01,
                quantity_step: 1.0,
                vwap_profile_periods: 10,
                bracket_entry_expiry_secs: None,
            },
            broker: BrokerConfig {
                name: "Mock".to_string(),
                use_mock: true,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
            },
        }
    }
}
