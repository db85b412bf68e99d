use axum::{Router, routing::{get, patch, post}, middleware};
use crate::state::AppState;
use crate::handlers::sale;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sales", get(sale::list_sales).post(sale::create_sale))
        // literal segments win over {id} captures, so the bulk routes never shadow
        .route(
            "/sales/mark-multiple-commissions-paid",
            post(sale::mark_multiple_commissions_paid),
        )
        .route(
            "/sales/supplier/{supplier_id}/mark-commissions-paid",
            patch(sale::mark_supplier_commissions_paid),
        )
        .route(
            "/sales/{id}",
            get(sale::get_sale).put(sale::update_sale).delete(sale::delete_sale),
        )
        .route(
            "/sales/{id}/mark-commission-paid",
            patch(sale::mark_commission_paid),
        )
        .route_layer(middleware::from_fn(require_auth))
}
