use axum::{
    extract::rejection::JsonRejection,
    response::{IntoResponse, Response},
};

use crate::error::EngineError;

pub mod home_controller;
pub mod order_controller;
pub mod portfolio_controller;
pub mod leaderboard_controller;
pub mod realtime_controller;

/// Malformed or non-numeric bodies are reported the same way as non-positive amounts.
fn bad_body(rejection: JsonRejection) -> Response {
    EngineError::InvalidAmount(rejection.body_text()).into_response()
}
