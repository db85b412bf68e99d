use axum::{extract::{Path, Query, State}, Extension, Json};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use sqlx::PgPool;
use std::collections::HashMap;

use crate::dtos::sale::{
    CreateSaleRequest, MarkMultipleRequest, MarkPaidResponse, SaleResponse, UpdateSaleRequest,
};
use crate::error::{AppError, ValidationErrors};
use crate::middleware::auth::AuthContext;
use crate::models::sale::SaleWithSupplierRow;
use crate::response::{ApiResponse, PaginatedResponse};
use crate::state::AppState;

pub(crate) const SALE_SELECT: &str =
    "SELECT s.id, s.user_id, s.supplier_id, s.product_name, \
     (s.price)::FLOAT8 AS price, s.quantity, (s.commission)::FLOAT8 AS commission, \
     s.feedback, s.commission_paid, s.sale_date, s.created_at, s.updated_at, \
     sup.name AS supplier_name, sup.email AS supplier_email, sup.phone AS supplier_phone \
     FROM sales s LEFT JOIN suppliers sup ON s.supplier_id = sup.id";

/// Positional bind values for dynamically assembled filter SQL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Bind {
    I32(i32),
    I64(i64),
    Bool(bool),
    Date(NaiveDate),
}

#[derive(Debug, Default)]
pub(crate) struct SaleFilters {
    pub month: Option<i32>,
    pub year: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub supplier_id: Option<i64>,
    pub commission_paid: Option<bool>,
}

impl SaleFilters {
    fn from_params(params: &HashMap<String, String>) -> Self {
        Self {
            month: params.get("month").and_then(|s| s.parse().ok()),
            year: params.get("year").and_then(|s| s.parse().ok()),
            start_date: params.get("start_date").and_then(|s| s.parse().ok()),
            end_date: params.get("end_date").and_then(|s| s.parse().ok()),
            supplier_id: params.get("supplier_id").and_then(|s| s.parse().ok()),
            commission_paid: params
                .get("commission_paid")
                .map(|s| matches!(s.as_str(), "1" | "true")),
        }
    }
}

/// Append filter conditions numbered from `next`. Month/year and date-range
/// filters compose as independent AND conditions when both are supplied.
pub(crate) fn sale_filter_clause(filters: &SaleFilters, mut next: usize) -> (String, Vec<Bind>, usize) {
    let mut sql = String::new();
    let mut binds = Vec::new();

    if let (Some(month), Some(year)) = (filters.month, filters.year) {
        sql.push_str(&format!(
            " AND EXTRACT(MONTH FROM s.sale_date)::INT = ${} AND EXTRACT(YEAR FROM s.sale_date)::INT = ${}",
            next, next + 1
        ));
        binds.push(Bind::I32(month));
        binds.push(Bind::I32(year));
        next += 2;
    }
    if let (Some(start), Some(end)) = (filters.start_date, filters.end_date) {
        sql.push_str(&format!(" AND s.sale_date BETWEEN ${} AND ${}", next, next + 1));
        binds.push(Bind::Date(start));
        binds.push(Bind::Date(end));
        next += 2;
    }
    if let Some(supplier_id) = filters.supplier_id {
        sql.push_str(&format!(" AND s.supplier_id = ${next}"));
        binds.push(Bind::I64(supplier_id));
        next += 1;
    }
    if let Some(paid) = filters.commission_paid {
        sql.push_str(&format!(" AND s.commission_paid = ${next}"));
        binds.push(Bind::Bool(paid));
        next += 1;
    }

    (sql, binds, next)
}

pub async fn list_sales(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let filters = SaleFilters::from_params(&params);
    let (clause, binds, next) = sale_filter_clause(&filters, 2);
    let where_sql = format!(" WHERE s.user_id = $1{clause}");
    let order_sql = " ORDER BY s.sale_date DESC, s.id DESC";

    let per_page = params.get("per_page").filter(|v| v.as_str() != "all");
    if let Some(per_page) = per_page {
        let per_page: i64 = per_page.parse::<i64>().unwrap_or(15).max(1);
        let page: i64 = params
            .get("page")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1)
            .max(1);

        let count_sql = format!("SELECT COUNT(*) FROM sales s{where_sql}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(auth.user_id);
        for b in &binds {
            count_query = match *b {
                Bind::I32(v) => count_query.bind(v),
                Bind::I64(v) => count_query.bind(v),
                Bind::Bool(v) => count_query.bind(v),
                Bind::Date(v) => count_query.bind(v),
            };
        }
        let total = count_query.fetch_one(&db_pool).await?;

        let rows_sql = format!(
            "{SALE_SELECT}{where_sql}{order_sql} LIMIT ${} OFFSET ${}",
            next,
            next + 1
        );
        let mut rows_query = sqlx::query_as::<_, SaleWithSupplierRow>(&rows_sql).bind(auth.user_id);
        for b in &binds {
            rows_query = match *b {
                Bind::I32(v) => rows_query.bind(v),
                Bind::I64(v) => rows_query.bind(v),
                Bind::Bool(v) => rows_query.bind(v),
                Bind::Date(v) => rows_query.bind(v),
            };
        }
        let rows = rows_query
            .bind(per_page)
            .bind((page - 1) * per_page)
            .fetch_all(&db_pool)
            .await?;

        let sales: Vec<SaleResponse> = rows.into_iter().map(SaleResponse::from).collect();
        return Ok(Json(PaginatedResponse::new(sales, page, per_page, total)).into_response());
    }

    let rows_sql = format!("{SALE_SELECT}{where_sql}{order_sql}");
    let mut rows_query = sqlx::query_as::<_, SaleWithSupplierRow>(&rows_sql).bind(auth.user_id);
    for b in &binds {
        rows_query = match *b {
            Bind::I32(v) => rows_query.bind(v),
            Bind::I64(v) => rows_query.bind(v),
            Bind::Bool(v) => rows_query.bind(v),
            Bind::Date(v) => rows_query.bind(v),
        };
    }
    let rows = rows_query.fetch_all(&db_pool).await?;

    let sales: Vec<SaleResponse> = rows.into_iter().map(SaleResponse::from).collect();
    Ok(Json(ApiResponse::data(sales)).into_response())
}

pub async fn create_sale(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateSaleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SaleResponse>>), AppError> {
    let mut errors = ValidationErrors::new();
    match payload.product_name.as_deref() {
        Some(name) if !name.trim().is_empty() && name.len() <= 255 => {}
        Some(_) => errors.add("product_name", "The product name must be between 1 and 255 characters"),
        None => errors.add("product_name", "The product name field is required"),
    }
    match payload.price {
        Some(price) if price >= 0.0 => {}
        Some(_) => errors.add("price", "The price must be at least 0"),
        None => errors.add("price", "The price field is required"),
    }
    match payload.quantity {
        Some(quantity) if quantity >= 1 => {}
        Some(_) => errors.add("quantity", "The quantity must be at least 1"),
        None => errors.add("quantity", "The quantity field is required"),
    }
    match payload.commission {
        Some(commission) if commission >= 0.0 => {}
        Some(_) => errors.add("commission", "The commission must be at least 0"),
        None => errors.add("commission", "The commission field is required"),
    }
    if payload.sale_date.is_none() {
        errors.add("sale_date", "The sale date field is required");
    }
    if let Some(supplier_id) = payload.supplier_id {
        if !supplier_owned(&db_pool, supplier_id, auth.user_id).await? {
            errors.add("supplier_id", "The selected supplier is invalid");
        }
    }
    errors.into_result()?;

    let sale_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO sales (user_id, supplier_id, product_name, price, quantity, commission, \
         feedback, commission_paid, sale_date) \
         VALUES ($1, $2, $3, $4::FLOAT8, $5, $6::FLOAT8, $7, $8, $9) \
         RETURNING id",
    )
    .bind(auth.user_id)
    .bind(payload.supplier_id)
    .bind(payload.product_name.unwrap_or_default())
    .bind(payload.price.unwrap_or_default())
    .bind(payload.quantity.unwrap_or_default())
    .bind(payload.commission.unwrap_or_default())
    .bind(payload.feedback)
    .bind(payload.commission_paid.unwrap_or(false))
    .bind(payload.sale_date)
    .fetch_one(&db_pool)
    .await?;

    let sale = fetch_sale_for_user(&db_pool, sale_id, auth.user_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::message_data("Sale created successfully", sale)),
    ))
}

pub async fn get_sale(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<SaleResponse>>, AppError> {
    let sale = fetch_sale_for_user(&db_pool, id, auth.user_id).await?;
    Ok(Json(ApiResponse::data(sale)))
}

pub async fn update_sale(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateSaleRequest>,
) -> Result<Json<ApiResponse<SaleResponse>>, AppError> {
    let mut errors = ValidationErrors::new();
    if let Some(name) = payload.product_name.as_deref() {
        if name.trim().is_empty() || name.len() > 255 {
            errors.add("product_name", "The product name must be between 1 and 255 characters");
        }
    }
    if payload.price.map_or(false, |p| p < 0.0) {
        errors.add("price", "The price must be at least 0");
    }
    if payload.quantity.map_or(false, |q| q < 1) {
        errors.add("quantity", "The quantity must be at least 1");
    }
    if payload.commission.map_or(false, |c| c < 0.0) {
        errors.add("commission", "The commission must be at least 0");
    }
    if let Some(Some(supplier_id)) = payload.supplier_id {
        if !supplier_owned(&db_pool, supplier_id, auth.user_id).await? {
            errors.add("supplier_id", "The selected supplier is invalid");
        }
    }
    errors.into_result()?;

    // Absent fields keep their column value; nullable fields clear on an
    // explicit null.
    let set_supplier = payload.supplier_id.is_some();
    let supplier_id = payload.supplier_id.flatten();
    let set_feedback = payload.feedback.is_some();
    let feedback = payload.feedback.flatten();

    let result = sqlx::query(
        "UPDATE sales SET \
         product_name = COALESCE($3, product_name), \
         price = COALESCE($4::FLOAT8, price), \
         quantity = COALESCE($5, quantity), \
         commission = COALESCE($6::FLOAT8, commission), \
         supplier_id = CASE WHEN $7 THEN $8 ELSE supplier_id END, \
         feedback = CASE WHEN $9 THEN $10 ELSE feedback END, \
         commission_paid = COALESCE($11, commission_paid), \
         sale_date = COALESCE($12, sale_date), \
         updated_at = NOW() \
         WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(auth.user_id)
    .bind(payload.product_name)
    .bind(payload.price)
    .bind(payload.quantity)
    .bind(payload.commission)
    .bind(set_supplier)
    .bind(supplier_id)
    .bind(set_feedback)
    .bind(feedback)
    .bind(payload.commission_paid)
    .bind(payload.sale_date)
    .execute(&db_pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Sale not found"));
    }

    let sale = fetch_sale_for_user(&db_pool, id, auth.user_id).await?;
    Ok(Json(ApiResponse::message_data("Sale updated successfully", sale)))
}

pub async fn delete_sale(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let result = sqlx::query("DELETE FROM sales WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(auth.user_id)
        .execute(&db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Sale not found"));
    }

    Ok(Json(ApiResponse::message("Sale deleted successfully")))
}

/// Idempotent: marking an already-paid commission succeeds and changes nothing.
pub async fn mark_commission_paid(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<SaleResponse>>, AppError> {
    let result = sqlx::query(
        "UPDATE sales SET commission_paid = TRUE, updated_at = NOW() \
         WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(auth.user_id)
    .execute(&db_pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Sale not found"));
    }

    let sale = fetch_sale_for_user(&db_pool, id, auth.user_id).await?;
    Ok(Json(ApiResponse::message_data("Commission marked as paid", sale)))
}

pub async fn mark_multiple_commissions_paid(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<MarkMultipleRequest>,
) -> Result<Json<MarkPaidResponse>, AppError> {
    let sale_ids = match payload.sale_ids {
        Some(ids) if !ids.is_empty() => ids,
        _ => return Err(AppError::validation("sale_ids", "The sale_ids field is required")),
    };

    // Ids not owned by the caller (or not existing at all) are silently
    // dropped by the WHERE clause; the count reflects rows matched.
    let result = sqlx::query(
        "UPDATE sales SET commission_paid = TRUE, updated_at = NOW() \
         WHERE user_id = $1 AND id = ANY($2)",
    )
    .bind(auth.user_id)
    .bind(&sale_ids)
    .execute(&db_pool)
    .await?;

    let updated = result.rows_affected();
    Ok(Json(MarkPaidResponse {
        success: true,
        message: format!("Marked {updated} commission(s) as paid"),
        updated_count: updated,
    }))
}

pub async fn mark_supplier_commissions_paid(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(supplier_id): Path<String>,
) -> Result<Json<MarkPaidResponse>, AppError> {
    let scope = parse_supplier_scope(&supplier_id)?;

    if let Some(supplier_id) = scope {
        if !supplier_owned(&db_pool, supplier_id, auth.user_id).await? {
            return Err(AppError::not_found("Supplier not found"));
        }
    }

    let result = match scope {
        Some(supplier_id) => {
            sqlx::query(
                "UPDATE sales SET commission_paid = TRUE, updated_at = NOW() \
                 WHERE user_id = $1 AND supplier_id = $2 AND commission_paid = FALSE",
            )
            .bind(auth.user_id)
            .bind(supplier_id)
            .execute(&db_pool)
            .await?
        }
        None => {
            sqlx::query(
                "UPDATE sales SET commission_paid = TRUE, updated_at = NOW() \
                 WHERE user_id = $1 AND supplier_id IS NULL AND commission_paid = FALSE",
            )
            .bind(auth.user_id)
            .execute(&db_pool)
            .await?
        }
    };

    let updated = result.rows_affected();
    Ok(Json(MarkPaidResponse {
        success: true,
        message: format!("Marked {updated} commission(s) as paid for this supplier"),
        updated_count: updated,
    }))
}

/// The path segment is a supplier id, or the sentinels "null"/"0" meaning
/// sales with no supplier assigned.
pub(crate) fn parse_supplier_scope(raw: &str) -> Result<Option<i64>, AppError> {
    match raw {
        "null" | "0" => Ok(None),
        other => other
            .parse::<i64>()
            .map(Some)
            .map_err(|_| AppError::not_found("Supplier not found")),
    }
}

pub(crate) async fn supplier_owned(
    db_pool: &PgPool,
    supplier_id: i64,
    user_id: i64,
) -> Result<bool, AppError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1 AND user_id = $2)",
    )
    .bind(supplier_id)
    .bind(user_id)
    .fetch_one(db_pool)
    .await?;
    Ok(exists)
}

// Ownership is part of the lookup so a foreign sale is indistinguishable
// from a missing one.
pub(crate) async fn fetch_sale_for_user(
    db_pool: &PgPool,
    id: i64,
    user_id: i64,
) -> Result<SaleResponse, AppError> {
    let sql = format!("{SALE_SELECT} WHERE s.id = $1 AND s.user_id = $2");
    let row = sqlx::query_as::<_, SaleWithSupplierRow>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("Sale not found"))?;
    Ok(SaleResponse::from(row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supplier_scope_sentinels() {
        assert_eq!(parse_supplier_scope("null").unwrap(), None);
        assert_eq!(parse_supplier_scope("0").unwrap(), None);
        assert_eq!(parse_supplier_scope("17").unwrap(), Some(17));
        assert!(matches!(
            parse_supplier_scope("acme"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn month_and_range_filters_compose() {
        let filters = SaleFilters {
            month: Some(1),
            year: Some(2025),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 5),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 20),
            ..Default::default()
        };
        let (sql, binds, next) = sale_filter_clause(&filters, 2);
        assert!(sql.contains("EXTRACT(MONTH FROM s.sale_date)::INT = $2"));
        assert!(sql.contains("EXTRACT(YEAR FROM s.sale_date)::INT = $3"));
        assert!(sql.contains("s.sale_date BETWEEN $4 AND $5"));
        assert_eq!(binds.len(), 4);
        assert_eq!(next, 6);
    }

    #[test]
    fn month_without_year_is_ignored() {
        let filters = SaleFilters { month: Some(3), ..Default::default() };
        let (sql, binds, next) = sale_filter_clause(&filters, 2);
        assert!(sql.is_empty());
        assert!(binds.is_empty());
        assert_eq!(next, 2);
    }

    #[test]
    fn supplier_and_paid_filters_number_sequentially() {
        let filters = SaleFilters {
            supplier_id: Some(9),
            commission_paid: Some(false),
            ..Default::default()
        };
        let (sql, binds, _) = sale_filter_clause(&filters, 2);
        assert!(sql.contains("s.supplier_id = $2"));
        assert!(sql.contains("s.commission_paid = $3"));
        assert_eq!(binds, vec![Bind::I64(9), Bind::Bool(false)]);
    }
}
