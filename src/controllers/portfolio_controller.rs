use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    models::CurrentUser,
    services::{account_service, trading_service},
    AppState,
};

use super::bad_body;
use crate::auth::unauthorized;

#[derive(Deserialize)]
pub struct TradeBody {
    pub symbol: String,
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct FundsBody {
    pub amount: Decimal,
}

fn ok_json<T: serde::Serialize>(res: Result<T, crate::error::EngineError>) -> Response {
    match res {
        Ok(v) => (StatusCode::OK, Json(v)).into_response(),
        Err(e) => e.into_response(),
    }
}

// GET /api/portfolio
pub async fn get_portfolio(State(state): State<AppState>, user: Option<Extension<CurrentUser>>) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };
    ok_json(account_service::sync_name(&state, u.id, &u.name).await)
}

// POST /api/portfolio/buy
pub async fn post_buy(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    body: Result<Json<TradeBody>, JsonRejection>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rej) => return bad_body(rej),
    };
    ok_json(trading_service::buy_now(&state, u.id, &body.symbol, body.quantity).await)
}

// POST /api/portfolio/sell
pub async fn post_sell(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    body: Result<Json<TradeBody>, JsonRejection>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rej) => return bad_body(rej),
    };
    ok_json(trading_service::sell_now(&state, u.id, &body.symbol, body.quantity).await)
}

// POST /api/portfolio/add-funds
pub async fn post_add_funds(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    body: Result<Json<FundsBody>, JsonRejection>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rej) => return bad_body(rej),
    };
    ok_json(account_service::add_funds(&state, u.id, body.amount).await)
}

// POST /api/portfolio/withdraw-funds
pub async fn post_withdraw_funds(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    body: Result<Json<FundsBody>, JsonRejection>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rej) => return bad_body(rej),
    };
    ok_json(account_service::withdraw_funds(&state, u.id, body.amount).await)
}
