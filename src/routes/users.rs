use axum::{Router, routing::{get, post}, middleware};
use crate::state::AppState;
use crate::handlers::user;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(user::get_profile).put(user::update_profile))
        .route("/settings", get(user::get_settings).put(user::update_settings))
        .route("/export-data", post(user::export_data))
        .route_layer(middleware::from_fn(require_auth))
}
