use axum::{
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use mongodb::bson::oid::ObjectId;
use serde_json::json;

use crate::models::CurrentUser;

/// Identity is established upstream; the gateway forwards the user id
/// (ObjectId hex) and an optional display name.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub fn current_user(headers: &HeaderMap) -> Option<CurrentUser> {
    let id = ObjectId::parse_str(header_str(headers, USER_ID_HEADER)?).ok()?;
    let name = header_str(headers, USER_NAME_HEADER).unwrap_or_default().to_string();
    Some(CurrentUser { id, name })
}

pub async fn inject_current_user(mut req: Request<axum::body::Body>, next: Next) -> Response {
    if let Some(user) = current_user(req.headers()) {
        // Store user in request extensions so handlers can access it
        req.extensions_mut().insert(user);
    }
    next.run(req).await
}

fn is_public_path(path: &str) -> bool {
    path == "/health" || path == "/api/leaderboard" || path == "/events"
}

pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    if is_public_path(req.uri().path()) || req.extensions().get::<CurrentUser>().is_some() {
        return next.run(req).await;
    }

    unauthorized()
}

/// The JSON 401 returned whenever a request carries no usable identity.
pub fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Unauthorized", "message": "missing or invalid x-user-id" })),
    )
        .into_response()
}
