use axum::{extract::State, Extension, Json};
use chrono::Utc;
use serde_json::{json, Map, Value};
use sqlx::PgPool;

use crate::dtos::sale::SaleResponse;
use crate::dtos::setting::SettingValue;
use crate::dtos::user::{ExportDataRequest, UpdateProfileRequest};
use crate::error::{AppError, ValidationErrors};
use crate::mailer;
use crate::middleware::auth::AuthContext;
use crate::models::expense::Expense;
use crate::models::sale::SaleWithSupplierRow;
use crate::models::setting::SettingRow;
use crate::models::user::User;
use crate::response::ApiResponse;
use crate::state::AppState;

use super::sale::SALE_SELECT;

pub async fn get_profile(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let user = super::auth::fetch_user(&db_pool, auth.user_id).await?;
    let settings = settings_map(&db_pool, auth.user_id).await?;

    Ok(Json(ApiResponse::data(json!({
        "user": user,
        "settings": settings,
    }))))
}

pub async fn update_profile(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let mut errors = ValidationErrors::new();
    if let Some(first_name) = &payload.first_name {
        if first_name.trim().is_empty() {
            errors.add("first_name", "The first name field must not be empty.");
        }
    }
    if let Some(last_name) = &payload.last_name {
        if last_name.trim().is_empty() {
            errors.add("last_name", "The last name field must not be empty.");
        }
    }
    if let Some(email) = &payload.email {
        if !email.contains('@') {
            errors.add("email", "The email field must be a valid email address.");
        }
    }
    errors.into_result()?;

    let result = sqlx::query_as::<_, User>(
        "UPDATE users SET \
         first_name = COALESCE($1, first_name), \
         last_name = COALESCE($2, last_name), \
         email = COALESCE($3, email), \
         phone_number = COALESCE($4, phone_number), \
         name = COALESCE($1, first_name) || ' ' || COALESCE($2, last_name), \
         updated_at = NOW() \
         WHERE id = $5 \
         RETURNING id, name, first_name, last_name, email, phone_number, password_hash, \
         is_premium, premium_expires_at, theme, is_active, created_at, updated_at",
    )
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.email)
    .bind(&payload.phone_number)
    .bind(auth.user_id)
    .fetch_optional(&db_pool)
    .await;

    let user = match result {
        Ok(Some(user)) => user,
        Ok(None) => return Err(AppError::not_found("User not found")),
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
            let field = if db_err.constraint().is_some_and(|c| c.contains("phone")) {
                "phone_number"
            } else {
                "email"
            };
            return Err(AppError::validation(field, "This value is already taken."));
        }
        Err(err) => return Err(err.into()),
    };

    Ok(Json(ApiResponse::message_data(
        "Profile updated successfully",
        json!({ "user": user }),
    )))
}

pub async fn get_settings(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ApiResponse<Map<String, Value>>>, AppError> {
    let settings = settings_map(&db_pool, auth.user_id).await?;
    Ok(Json(ApiResponse::data(settings)))
}

/// Upserts every key in the body; value types are inferred at write time and
/// round-tripped through TEXT storage.
pub async fn update_settings(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<Json<ApiResponse<Map<String, Value>>>, AppError> {
    for (key, value) in &payload {
        let setting = SettingValue::classify(value);
        sqlx::query(
            "INSERT INTO user_settings (user_id, key, value, type, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, NOW(), NOW()) \
             ON CONFLICT (user_id, key) \
             DO UPDATE SET value = $3, type = $4, updated_at = NOW()",
        )
        .bind(auth.user_id)
        .bind(key)
        .bind(setting.stored())
        .bind(setting.kind())
        .execute(&db_pool)
        .await?;
    }

    let settings = settings_map(&db_pool, auth.user_id).await?;
    Ok(Json(ApiResponse::message_data(
        "Settings updated successfully",
        settings,
    )))
}

/// Premium-gated export of sales and expenses over a date range. The
/// notification email is attempted inline; its failure is reported in the
/// payload, never as a request failure.
pub async fn export_data(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<ExportDataRequest>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let user = super::auth::fetch_user(&db_pool, auth.user_id).await?;
    if !user.is_premium_active() {
        return Err(AppError::forbidden("Premium subscription required for data export"));
    }

    let mut errors = ValidationErrors::new();
    if payload.start_date.is_none() {
        errors.add("start_date", "The start date field is required.");
    }
    if payload.end_date.is_none() {
        errors.add("end_date", "The end date field is required.");
    }
    if let (Some(start), Some(end)) = (payload.start_date, payload.end_date) {
        if start > end {
            errors.add("end_date", "The end date must be on or after the start date.");
        }
    }
    errors.into_result()?;

    let start = payload.start_date.unwrap_or_default();
    let end = payload.end_date.unwrap_or_default();
    let include_sales = payload.include_sales.unwrap_or(true);
    let include_expenses = payload.include_expenses.unwrap_or(true);

    let mut export = Map::new();
    if include_sales {
        let rows = sqlx::query_as::<_, SaleWithSupplierRow>(&format!(
            "{SALE_SELECT} WHERE s.user_id = $1 AND s.sale_date BETWEEN $2 AND $3 \
             ORDER BY s.sale_date ASC"
        ))
        .bind(auth.user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&db_pool)
        .await?;
        let sales: Vec<SaleResponse> = rows.into_iter().map(SaleResponse::from).collect();
        export.insert("sales".to_string(), to_json(&sales)?);
    }
    if include_expenses {
        let expenses = sqlx::query_as::<_, Expense>(
            "SELECT id, user_id, title, (amount)::FLOAT8 AS amount, description, expense_date, \
             created_at, updated_at FROM expenses \
             WHERE user_id = $1 AND expense_date BETWEEN $2 AND $3 \
             ORDER BY expense_date ASC",
        )
        .bind(auth.user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&db_pool)
        .await?;
        export.insert("expenses".to_string(), to_json(&expenses)?);
    }

    let generated_at = Utc::now();
    let filename = format!(
        "data_export_{}_{}",
        auth.user_id,
        generated_at.format("%Y%m%d%H%M%S")
    );

    let email_sent = mailer::deliver(
        &user.email,
        "Your data export is ready",
        &format!(
            "Hi {}, your export covering {} to {} has been generated.",
            user.first_name, start, end
        ),
    )
    .await
    .is_ok();

    Ok(Json(ApiResponse::data(json!({
        "filename": filename,
        "generated_at": generated_at,
        "start_date": start,
        "end_date": end,
        "export": export,
        "email_sent": email_sent,
    }))))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::internal(e.to_string()))
}

async fn settings_map(db_pool: &PgPool, user_id: i64) -> Result<Map<String, Value>, AppError> {
    let rows = sqlx::query_as::<_, SettingRow>(
        "SELECT key, value, type FROM user_settings WHERE user_id = $1 ORDER BY key",
    )
    .bind(user_id)
    .fetch_all(db_pool)
    .await?;

    let mut settings = Map::new();
    for row in rows {
        settings.insert(row.key, SettingValue::revive(&row.kind, &row.value));
    }
    Ok(settings)
}
