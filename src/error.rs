/**
* filename : error
* author : HAMA
* date: 2025. 5. 12.
* description:
**/

use thiserror::Error;

use crate::models::order::OrderId;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Adapter error: {0}")]
    AdapterError(String),

    #[error("Data not found: {0}")]
    DataNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
