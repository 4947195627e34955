mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use common::harness;
use http_body_util::BodyExt;
use mongodb::bson::oid::ObjectId;
use papermarket::{auth::{USER_ID_HEADER, USER_NAME_HEADER}, routes};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn response_json(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

fn json_request(method: &str, uri: &str, user: Option<ObjectId>, body: Value) -> Request<Body> {
    let mut req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(id) = user {
        req = req.header(USER_ID_HEADER, id.to_hex()).header(USER_NAME_HEADER, "tester");
    }
    req.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, user: Option<ObjectId>) -> Request<Body> {
    let mut req = Request::builder().method("GET").uri(uri);
    if let Some(id) = user {
        req = req.header(USER_ID_HEADER, id.to_hex());
    }
    req.body(Body::empty()).unwrap()
}

fn app(starting_balance: i64) -> (Router, common::Harness) {
    let h = harness(starting_balance);
    (routes::app(h.state.clone()), h)
}

#[tokio::test]
async fn orders_require_identity() {
    let (app, _h) = app(1000);

    let res = app
        .oneshot(json_request("POST", "/api/orders", None, json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response_json(res).await["error"], "Unauthorized");
}

#[tokio::test]
async fn place_list_and_cancel_order() {
    let (app, _h) = app(1000);
    let user = ObjectId::new();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/orders",
            Some(user),
            json!({ "symbol": "aapl", "displayName": "Apple Inc", "side": "buy", "quantity": 10, "limitPrice": 50 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = response_json(res).await;
    assert_eq!(body["order"]["status"], "pending");
    assert_eq!(body["order"]["symbol"], "AAPL");
    assert_eq!(body["portfolio"]["cash_balance"], "500");
    assert_eq!(body["portfolio"]["reserved_balance"], "500");
    let order_id = body["order"]["_id"]["$oid"].as_str().unwrap().to_string();

    let res = app.clone().oneshot(get("/api/orders", Some(user))).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(response_json(res).await.as_array().map(|a| a.len()), Some(1));

    let uri = format!("/api/orders/{order_id}");
    let res = app
        .clone()
        .oneshot(json_request("DELETE", &uri, Some(user), json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(response_json(res).await["portfolio"]["cash_balance"], "1000");

    let res = app
        .oneshot(json_request("DELETE", &uri, Some(user), json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(response_json(res).await["error"], "InvalidState");
}

#[tokio::test]
async fn insufficient_funds_is_a_bad_request() {
    let (app, _h) = app(100);
    let user = ObjectId::new();

    let res = app
        .oneshot(json_request(
            "POST",
            "/api/orders",
            Some(user),
            json!({ "symbol": "AAPL", "side": "buy", "quantity": 10, "limitPrice": "50.25" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(res).await["error"], "InsufficientFunds");
}

#[tokio::test]
async fn malformed_amounts_are_invalid_amount() {
    let (app, _h) = app(1000);
    let user = ObjectId::new();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/portfolio/withdraw-funds",
            Some(user),
            json!({ "amount": "lots" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(res).await["error"], "InvalidAmount");

    let res = app
        .oneshot(json_request(
            "POST",
            "/api/portfolio/add-funds",
            Some(user),
            json!({ "amount": -5 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(res).await["error"], "InvalidAmount");
}

#[tokio::test]
async fn cancelling_unknown_order_is_not_found() {
    let (app, _h) = app(1000);
    let user = ObjectId::new();

    for id in ["not-an-id".to_string(), ObjectId::new().to_hex()] {
        let res = app
            .clone()
            .oneshot(json_request("DELETE", &format!("/api/orders/{id}"), Some(user), json!({})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn market_buy_without_quote_is_service_unavailable() {
    let (app, _h) = app(1000);
    let user = ObjectId::new();

    let res = app
        .oneshot(json_request(
            "POST",
            "/api/portfolio/buy",
            Some(user),
            json!({ "symbol": "AAPL", "quantity": 1 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response_json(res).await["error"], "QuoteUnavailable");
}

#[tokio::test]
async fn market_buy_and_portfolio_read() {
    let (app, h) = app(1000);
    let user = ObjectId::new();
    h.quotes.set("MSFT", 25);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/portfolio/buy",
            Some(user),
            json!({ "symbol": "MSFT", "quantity": 4 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let mut req = get("/api/portfolio", Some(user));
    req.headers_mut().insert(USER_NAME_HEADER, "Grace".parse().unwrap());
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = response_json(res).await;
    assert_eq!(body["name"], "Grace");
    assert_eq!(body["cash_balance"], "900");
    assert_eq!(body["holdings"][0]["symbol"], "MSFT");
    assert_eq!(body["holdings"][0]["quantity"], 4);
    assert_eq!(body["transactions"][0]["type"], "buy");
}

#[tokio::test]
async fn leaderboard_is_public() {
    let (app, h) = app(1000);
    papermarket::services::account_service::sync_name(&h.state, ObjectId::new(), "ada")
        .await
        .unwrap();

    let res = app.oneshot(get("/api/leaderboard", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = response_json(res).await;
    assert_eq!(body[0]["name"], "ada");
    assert_eq!(body[0]["netWorth"], "1000");
}

#[tokio::test]
async fn health_is_public() {
    let (app, _h) = app(1000);
    let res = app.oneshot(get("/health", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
