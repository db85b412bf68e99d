pub mod auth;
pub mod dashboard;
pub mod expenses;
pub mod sales;
pub mod suppliers;
pub mod users;

use axum::Router;
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(auth::routes())
        .merge(users::routes())
        .merge(suppliers::routes())
        .merge(sales::routes())
        .merge(expenses::routes())
        .merge(dashboard::routes())
}
