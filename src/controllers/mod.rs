mod auth;
mod game;
mod points;
mod rooms;
mod utils;

use crate::AppState;

use axum::{http::StatusCode, routing::get, Router};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    let router = auth::add_routes(router);
    let router = rooms::add_routes(router);
    let router = game::add_routes(router);
    let router = points::add_routes(router);

    return router.route("/health", get(|| async { StatusCode::NO_CONTENT }));
}
