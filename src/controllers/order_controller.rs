use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::EngineError,
    models::{CurrentUser, Side},
    services::order_service::{self, NewOrder},
    AppState,
};

use super::bad_body;
use crate::auth::unauthorized;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderBody {
    pub symbol: String,
    #[serde(default)]
    pub display_name: String,
    pub side: Side,
    pub quantity: i64,
    pub limit_price: Decimal,
}

// POST /api/orders
pub async fn post_order(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    body: Result<Json<PlaceOrderBody>, JsonRejection>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rej) => return bad_body(rej),
    };

    let req = NewOrder {
        symbol: body.symbol,
        display_name: body.display_name,
        side: body.side,
        quantity: body.quantity,
        limit_price: body.limit_price,
    };

    match order_service::place_order(&state, u.id, req).await {
        Ok(placed) => (StatusCode::CREATED, Json(placed)).into_response(),
        Err(e) => e.into_response(),
    }
}

// GET /api/orders
pub async fn get_pending_orders(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    match order_service::list_pending_orders(&state, u.id).await {
        Ok(orders) => (StatusCode::OK, Json(orders)).into_response(),
        Err(e) => e.into_response(),
    }
}

// DELETE /api/orders/:id
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };
    let Ok(order_id) = ObjectId::parse_str(id.trim()) else {
        return EngineError::NotFound(format!("order {id}")).into_response();
    };

    match order_service::cancel_order(&state, u.id, order_id).await {
        Ok(acc) => (StatusCode::OK, Json(json!({ "portfolio": acc }))).into_response(),
        Err(e) => e.into_response(),
    }
}
