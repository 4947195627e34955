use axum::{Router, routing::{get, post}};

use crate::{AppState, controllers::portfolio_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/portfolio", get(portfolio_controller::get_portfolio))
        .route("/api/portfolio/buy", post(portfolio_controller::post_buy))
        .route("/api/portfolio/sell", post(portfolio_controller::post_sell))
        .route("/api/portfolio/add-funds", post(portfolio_controller::post_add_funds))
        .route("/api/portfolio/withdraw-funds", post(portfolio_controller::post_withdraw_funds))
}
