use axum::{Router, routing::{delete, get}};

use crate::{AppState, controllers::order_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/api/orders",
            get(order_controller::get_pending_orders).post(order_controller::post_order),
        )
        .route("/api/orders/:id", delete(order_controller::delete_order))
}
