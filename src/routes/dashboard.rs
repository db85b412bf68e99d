use axum::{Router, routing::get, middleware};
use crate::state::AppState;
use crate::handlers::dashboard;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard::index))
        .route("/dashboard/overview", get(dashboard::overview))
        .route("/dashboard/unpaid-commissions", get(dashboard::unpaid_commissions))
        .route("/dashboard/monthly-stats", get(dashboard::monthly_stats))
        .route("/dashboard/history", get(dashboard::history))
        .route_layer(middleware::from_fn(require_auth))
}
