// src/domain/errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Request error: {0}")]
    Request(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Unexpected response shape: {0}")]
    Shape(String),
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Request error: {0}")]
    Request(String),

    #[error("API error: {0}")]
    Api(String),
}

// Result type aliases for convenience
pub type AppResult<T> = Result<T, AppError>;
pub type BrokerResult<T> = Result<T, BrokerError>;
pub type NotifyResult<T> = Result<T, NotifyError>;
