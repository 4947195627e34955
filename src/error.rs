use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::json;

use crate::models::{InvalidTransition, OrderStatus};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A compare-and-set on an order status or account version did not match.
    #[error("write conflict: {0}")]
    Conflict(String),

    #[error("db error: {0}")]
    Backend(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    #[error("insufficient shares of {symbol}: need {needed}, hold {held}")]
    InsufficientShares { symbol: String, needed: i64, held: i64 },

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("quote unavailable for {0}")]
    QuoteUnavailable(String),

    #[error("amount {requested} exceeds realized profit {available}")]
    ExceedsRealizedProfit { requested: Decimal, available: Decimal },

    #[error("amount {requested} exceeds cash balance {available}")]
    ExceedsBalance { requested: Decimal, available: Decimal },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => EngineError::InvalidState(msg),
            other => EngineError::Store(other),
        }
    }
}

impl From<InvalidTransition> for EngineError {
    fn from(e: InvalidTransition) -> Self {
        EngineError::InvalidState(e.to_string())
    }
}

impl EngineError {
    pub fn not_pending(status: OrderStatus) -> Self {
        EngineError::InvalidState(format!("order is {status}, only pending orders can change"))
    }

    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidAmount(_) => "InvalidAmount",
            EngineError::InsufficientFunds { .. } => "InsufficientFunds",
            EngineError::InsufficientShares { .. } => "InsufficientShares",
            EngineError::NotFound(_) => "NotFound",
            EngineError::InvalidState(_) => "InvalidState",
            EngineError::QuoteUnavailable(_) => "QuoteUnavailable",
            EngineError::ExceedsRealizedProfit { .. } => "ExceedsRealizedProfit",
            EngineError::ExceedsBalance { .. } => "ExceedsBalance",
            EngineError::Store(_) => "StoreError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            EngineError::InvalidAmount(_)
            | EngineError::InsufficientFunds { .. }
            | EngineError::InsufficientShares { .. }
            | EngineError::ExceedsRealizedProfit { .. }
            | EngineError::ExceedsBalance { .. } => StatusCode::BAD_REQUEST,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::InvalidState(_) => StatusCode::CONFLICT,
            EngineError::QuoteUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        if let EngineError::Store(e) = &self {
            tracing::error!("store failure: {}", e);
        }
        let body = json!({ "error": self.code(), "message": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}
