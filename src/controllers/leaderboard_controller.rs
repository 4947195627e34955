use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{services::leaderboard_service, AppState};

// GET /api/leaderboard (public)
pub async fn get_leaderboard(State(state): State<AppState>) -> Response {
    match leaderboard_service::leaderboard(&state).await {
        Ok(board) => (StatusCode::OK, Json(board)).into_response(),
        Err(e) => e.into_response(),
    }
}
