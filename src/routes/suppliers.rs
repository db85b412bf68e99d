use axum::{Router, routing::get, middleware};
use crate::state::AppState;
use crate::handlers::supplier;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/suppliers",
            get(supplier::list_suppliers).post(supplier::create_supplier),
        )
        .route(
            "/suppliers/{id}",
            get(supplier::get_supplier)
                .put(supplier::update_supplier)
                .delete(supplier::delete_supplier),
        )
        .route_layer(middleware::from_fn(require_auth))
}
