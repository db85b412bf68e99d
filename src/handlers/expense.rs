use axum::{extract::{Path, Query, State}, Extension, Json};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use sqlx::PgPool;
use std::collections::HashMap;

use crate::dtos::expense::{CreateExpenseRequest, UpdateExpenseRequest};
use crate::error::{AppError, ValidationErrors};
use crate::middleware::auth::AuthContext;
use crate::models::expense::Expense;
use crate::response::{ApiResponse, PaginatedResponse};
use crate::state::AppState;

use super::sale::Bind;

const EXPENSE_SELECT: &str =
    "SELECT id, user_id, title, (amount)::FLOAT8 AS amount, description, expense_date, \
     created_at, updated_at FROM expenses";

fn expense_filter_clause(
    month: Option<i32>,
    year: Option<i32>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    mut next: usize,
) -> (String, Vec<Bind>, usize) {
    let mut sql = String::new();
    let mut binds = Vec::new();

    if let (Some(month), Some(year)) = (month, year) {
        sql.push_str(&format!(
            " AND EXTRACT(MONTH FROM expense_date)::INT = ${} AND EXTRACT(YEAR FROM expense_date)::INT = ${}",
            next, next + 1
        ));
        binds.push(Bind::I32(month));
        binds.push(Bind::I32(year));
        next += 2;
    }
    if let (Some(start), Some(end)) = (start_date, end_date) {
        sql.push_str(&format!(" AND expense_date BETWEEN ${} AND ${}", next, next + 1));
        binds.push(Bind::Date(start));
        binds.push(Bind::Date(end));
        next += 2;
    }

    (sql, binds, next)
}

pub async fn list_expenses(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let month = params.get("month").and_then(|s| s.parse().ok());
    let year = params.get("year").and_then(|s| s.parse().ok());
    let start_date = params.get("start_date").and_then(|s| s.parse().ok());
    let end_date = params.get("end_date").and_then(|s| s.parse().ok());

    let (clause, binds, next) = expense_filter_clause(month, year, start_date, end_date, 2);
    let where_sql = format!(" WHERE user_id = $1{clause}");
    let order_sql = " ORDER BY expense_date DESC, id DESC";

    let per_page = params.get("per_page").filter(|v| v.as_str() != "all");
    if let Some(per_page) = per_page {
        let per_page: i64 = per_page.parse::<i64>().unwrap_or(15).max(1);
        let page: i64 = params
            .get("page")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1)
            .max(1);

        let count_sql = format!("SELECT COUNT(*) FROM expenses{where_sql}");
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
            "{EXPENSE_SELECT}{where_sql}{order_sql} LIMIT ${} OFFSET ${}",
            next,
            next + 1
        );
        let mut rows_query = sqlx::query_as::<_, Expense>(&rows_sql).bind(auth.user_id);
        for b in &binds {
            rows_query = match *b {
                Bind::I32(v) => rows_query.bind(v),
                Bind::I64(v) => rows_query.bind(v),
                Bind::Bool(v) => rows_query.bind(v),
                Bind::Date(v) => rows_query.bind(v),
            };
        }
        let expenses = rows_query
            .bind(per_page)
            .bind((page - 1) * per_page)
            .fetch_all(&db_pool)
            .await?;

        return Ok(Json(PaginatedResponse::new(expenses, page, per_page, total)).into_response());
    }

    let rows_sql = format!("{EXPENSE_SELECT}{where_sql}{order_sql}");
    let mut rows_query = sqlx::query_as::<_, Expense>(&rows_sql).bind(auth.user_id);
    for b in &binds {
        rows_query = match *b {
            Bind::I32(v) => rows_query.bind(v),
            Bind::I64(v) => rows_query.bind(v),
            Bind::Bool(v) => rows_query.bind(v),
            Bind::Date(v) => rows_query.bind(v),
        };
    }
    let expenses = rows_query.fetch_all(&db_pool).await?;

    Ok(Json(ApiResponse::data(expenses)).into_response())
}

pub async fn create_expense(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Expense>>), AppError> {
    let mut errors = ValidationErrors::new();
    match payload.title.as_deref() {
        Some(title) if !title.trim().is_empty() && title.len() <= 255 => {}
        Some(_) => errors.add("title", "The title must be between 1 and 255 characters"),
        None => errors.add("title", "The title field is required"),
    }
    match payload.amount {
        Some(amount) if amount >= 0.0 => {}
        Some(_) => errors.add("amount", "The amount must be at least 0"),
        None => errors.add("amount", "The amount field is required"),
    }
    if payload.expense_date.is_none() {
        errors.add("expense_date", "The expense date field is required");
    }
    errors.into_result()?;

    let expense = sqlx::query_as::<_, Expense>(
        "INSERT INTO expenses (user_id, title, amount, description, expense_date) \
         VALUES ($1, $2, $3::FLOAT8, $4, $5) \
         RETURNING id, user_id, title, (amount)::FLOAT8 AS amount, description, expense_date, \
         created_at, updated_at",
    )
        .bind(auth.user_id)
        .bind(payload.title.unwrap_or_default())
        .bind(payload.amount.unwrap_or_default())
        .bind(payload.description)
        .bind(payload.expense_date)
        .fetch_one(&db_pool)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::message_data("Expense created successfully", expense)),
    ))
}

pub async fn get_expense(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Expense>>, AppError> {
    let expense = fetch_expense_for_user(&db_pool, id, auth.user_id).await?;
    Ok(Json(ApiResponse::data(expense)))
}

pub async fn update_expense(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExpenseRequest>,
) -> Result<Json<ApiResponse<Expense>>, AppError> {
    let mut errors = ValidationErrors::new();
    if let Some(title) = payload.title.as_deref() {
        if title.trim().is_empty() || title.len() > 255 {
            errors.add("title", "The title must be between 1 and 255 characters");
        }
    }
    if payload.amount.map_or(false, |a| a < 0.0) {
        errors.add("amount", "The amount must be at least 0");
    }
    errors.into_result()?;

    let set_description = payload.description.is_some();
    let description = payload.description.flatten();

    let result = sqlx::query(
        "UPDATE expenses SET \
         title = COALESCE($3, title), \
         amount = COALESCE($4::FLOAT8, amount), \
         description = CASE WHEN $5 THEN $6 ELSE description END, \
         expense_date = COALESCE($7, expense_date), \
         updated_at = NOW() \
         WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(auth.user_id)
    .bind(payload.title)
    .bind(payload.amount)
    .bind(set_description)
    .bind(description)
    .bind(payload.expense_date)
    .execute(&db_pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Expense not found"));
    }

    let expense = fetch_expense_for_user(&db_pool, id, auth.user_id).await?;
    Ok(Json(ApiResponse::message_data("Expense updated successfully", expense)))
}

pub async fn delete_expense(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let result = sqlx::query("DELETE FROM expenses WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(auth.user_id)
        .execute(&db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Expense not found"));
    }

    Ok(Json(ApiResponse::message("Expense deleted successfully")))
}

async fn fetch_expense_for_user(
    db_pool: &PgPool,
    id: i64,
    user_id: i64,
) -> Result<Expense, AppError> {
    let sql = format!("{EXPENSE_SELECT} WHERE id = $1 AND user_id = $2");
    sqlx::query_as::<_, Expense>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("Expense not found"))
}
