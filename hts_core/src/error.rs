use thiserror::Error;

use crate::price::Interval;

/// Why a historical bar fetch produced nothing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("no data for {symbol} ({interval})")]
    NoData { symbol: String, interval: Interval },
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Parse(String),
    #[error("fetch already in flight for {symbol}")]
    InFlight { symbol: String },
}

/// Bad user input on a manual order. Nothing touched the ledger.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("order price is empty")]
    EmptyPrice,
    #[error("order price is not a number: {0:?}")]
    NotNumeric(String),
    #[error("order price must be > 0 (got {0})")]
    NonPositive(f64),
}

/// Business-rule refusal of a well-formed order.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TradeRejection {
    #[error("insufficient balance: need {required:.2}, have {available:.2}")]
    InsufficientBalance { required: f64, available: f64 },
    #[error("no holdings of {symbol} to sell")]
    NoHoldings { symbol: String },
    #[error("no market price yet")]
    NoMarketPrice,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
    #[error("invalid order: {0}")]
    Validation(#[from] ValidationError),
    #[error("rejected: {0}")]
    Rejected(#[from] TradeRejection),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse: {0}")]
    Parse(#[from] serde_json::Error),
}
