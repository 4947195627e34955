use axum::{Router, routing::get};

use crate::{AppState, controllers::leaderboard_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/api/leaderboard", get(leaderboard_controller::get_leaderboard))
}
