use axum::{Router, routing::{delete, get, post}, middleware};
use crate::state::AppState;
use crate::handlers::auth;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    let open = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password));

    let protected = Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/change-password", post(auth::change_password))
        .route("/delete-account", delete(auth::delete_account))
        .layer(middleware::from_fn(require_auth));

    open.merge(protected)
}
