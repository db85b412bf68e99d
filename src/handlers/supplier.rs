use axum::{extract::{Path, Query, State}, Extension, Json};
use axum::http::StatusCode;
use sqlx::PgPool;
use std::collections::HashMap;

use crate::dtos::sale::SaleResponse;
use crate::dtos::supplier::{CreateSupplierRequest, SupplierWithSales, UpdateSupplierRequest};
use crate::error::{AppError, ValidationErrors};
use crate::middleware::auth::AuthContext;
use crate::models::sale::SaleWithSupplierRow;
use crate::models::supplier::Supplier;
use crate::response::ApiResponse;
use crate::state::AppState;

use super::sale::SALE_SELECT;

const SUPPLIER_SELECT: &str =
    "SELECT id, user_id, name, email, phone, address, notes, is_active, created_at, updated_at \
     FROM suppliers";

pub async fn list_suppliers(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ApiResponse<Vec<Supplier>>>, AppError> {
    let active = params
        .get("active")
        .map(|s| matches!(s.as_str(), "1" | "true"));

    let suppliers = match active {
        Some(active) => {
            let sql = format!("{SUPPLIER_SELECT} WHERE user_id = $1 AND is_active = $2 ORDER BY name");
            sqlx::query_as::<_, Supplier>(&sql)
                .bind(auth.user_id)
                .bind(active)
                .fetch_all(&db_pool)
                .await?
        }
        None => {
            let sql = format!("{SUPPLIER_SELECT} WHERE user_id = $1 ORDER BY name");
            sqlx::query_as::<_, Supplier>(&sql)
                .bind(auth.user_id)
                .fetch_all(&db_pool)
                .await?
        }
    };

    Ok(Json(ApiResponse::data(suppliers)))
}

pub async fn create_supplier(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateSupplierRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Supplier>>), AppError> {
    let mut errors = ValidationErrors::new();
    match payload.name.as_deref() {
        Some(name) if !name.trim().is_empty() && name.len() <= 255 => {}
        Some(_) => errors.add("name", "The name must be between 1 and 255 characters"),
        None => errors.add("name", "The name field is required"),
    }
    if payload.email.as_deref().map_or(false, |e| !e.is_empty() && !e.contains('@')) {
        errors.add("email", "The email must be a valid email address");
    }
    if payload.phone.as_deref().map_or(false, |p| p.len() > 20) {
        errors.add("phone", "The phone must be at most 20 characters");
    }
    errors.into_result()?;

    let supplier = sqlx::query_as::<_, Supplier>(
        "INSERT INTO suppliers (user_id, name, email, phone, address, notes, is_active) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING id, user_id, name, email, phone, address, notes, is_active, \
         created_at, updated_at",
    )
        .bind(auth.user_id)
        .bind(payload.name.unwrap_or_default())
        .bind(payload.email)
        .bind(payload.phone)
        .bind(payload.address)
        .bind(payload.notes)
        .bind(payload.is_active.unwrap_or(true))
        .fetch_one(&db_pool)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::message_data("Supplier created successfully", supplier)),
    ))
}

pub async fn get_supplier(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<SupplierWithSales>>, AppError> {
    let supplier = fetch_supplier_for_user(&db_pool, id, auth.user_id).await?;

    let sql = format!("{SALE_SELECT} WHERE s.supplier_id = $1 AND s.user_id = $2 ORDER BY s.sale_date DESC");
    let sales: Vec<SaleResponse> = sqlx::query_as::<_, SaleWithSupplierRow>(&sql)
        .bind(id)
        .bind(auth.user_id)
        .fetch_all(&db_pool)
        .await?
        .into_iter()
        .map(SaleResponse::from)
        .collect();

    Ok(Json(ApiResponse::data(SupplierWithSales { supplier, sales })))
}

pub async fn update_supplier(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateSupplierRequest>,
) -> Result<Json<ApiResponse<Supplier>>, AppError> {
    let mut errors = ValidationErrors::new();
    if let Some(name) = payload.name.as_deref() {
        if name.trim().is_empty() || name.len() > 255 {
            errors.add("name", "The name must be between 1 and 255 characters");
        }
    }
    errors.into_result()?;

    let set_email = payload.email.is_some();
    let email = payload.email.flatten();
    let set_phone = payload.phone.is_some();
    let phone = payload.phone.flatten();
    let set_address = payload.address.is_some();
    let address = payload.address.flatten();
    let set_notes = payload.notes.is_some();
    let notes = payload.notes.flatten();

    let result = sqlx::query(
        "UPDATE suppliers SET \
         name = COALESCE($3, name), \
         email = CASE WHEN $4 THEN $5 ELSE email END, \
         phone = CASE WHEN $6 THEN $7 ELSE phone END, \
         address = CASE WHEN $8 THEN $9 ELSE address END, \
         notes = CASE WHEN $10 THEN $11 ELSE notes END, \
         is_active = COALESCE($12, is_active), \
         updated_at = NOW() \
         WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(auth.user_id)
    .bind(payload.name)
    .bind(set_email)
    .bind(email)
    .bind(set_phone)
    .bind(phone)
    .bind(set_address)
    .bind(address)
    .bind(set_notes)
    .bind(notes)
    .bind(payload.is_active)
    .execute(&db_pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Supplier not found"));
    }

    let supplier = fetch_supplier_for_user(&db_pool, id, auth.user_id).await?;
    Ok(Json(ApiResponse::message_data("Supplier updated successfully", supplier)))
}

pub async fn delete_supplier(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let result = sqlx::query("DELETE FROM suppliers WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(auth.user_id)
        .execute(&db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Supplier not found"));
    }

    Ok(Json(ApiResponse::message("Supplier deleted successfully")))
}

async fn fetch_supplier_for_user(
    db_pool: &PgPool,
    id: i64,
    user_id: i64,
) -> Result<Supplier, AppError> {
    let sql = format!("{SUPPLIER_SELECT} WHERE id = $1 AND user_id = $2");
    sqlx::query_as::<_, Supplier>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("Supplier not found"))
}
