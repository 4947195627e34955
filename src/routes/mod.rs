use axum::Router;
use axum::middleware::from_fn;

use crate::{AppState, controllers::home_controller};

pub mod home_routes;
pub mod order_routes;
pub mod portfolio_routes;
pub mod leaderboard_routes;
pub mod realtime_routes;

pub fn app(state: AppState) -> Router {
    let router = Router::<AppState>::new();

    let router = home_routes::add_routes(router);
    let router = order_routes::add_routes(router);
    let router = portfolio_routes::add_routes(router);
    let router = leaderboard_routes::add_routes(router);
    let router = realtime_routes::add_routes(router);

    router
        .fallback(home_controller::not_found)
        .layer(from_fn(crate::auth::require_auth))
        .layer(from_fn(crate::auth::inject_current_user))
        .with_state(state)
}
