use axum::{Router, routing::get, middleware};
use crate::state::AppState;
use crate::handlers::expense;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/expenses",
            get(expense::list_expenses).post(expense::create_expense),
        )
        .route(
            "/expenses/{id}",
            get(expense::get_expense)
                .put(expense::update_expense)
                .delete(expense::delete_expense),
        )
        .route_layer(middleware::from_fn(require_auth))
}
