use axum::{extract::State, Extension, Json};
use axum::http::StatusCode;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde_json::{json, Value};

use crate::auth::jwt::sign_token;
use crate::dtos::user::{
    AuthData, ChangePasswordRequest, DeleteAccountRequest, ForgotPasswordRequest, LoginRequest,
    RegisterRequest, ResetPasswordRequest,
};
use crate::error::{AppError, ValidationErrors};
use crate::mailer;
use crate::middleware::auth::AuthContext;
use crate::models::user::User;
use crate::response::ApiResponse;
use crate::state::AppState;

const USER_COLUMNS: &str = "id, name, first_name, last_name, email, phone_number, password_hash, \
     is_premium, premium_expires_at, theme, is_active, created_at, updated_at";

// Reset codes are emailed as 6 digits and expire quickly.
const RESET_CODE_TTL_MINUTES: i64 = 60;

pub async fn register(
    State(AppState { db_pool }): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthData>>), AppError> {
    let mut errors = ValidationErrors::new();
    check_required_name(&mut errors, "first_name", &payload.first_name);
    check_required_name(&mut errors, "last_name", &payload.last_name);
    match payload.email.as_deref() {
        Some(email) if looks_like_email(email) && email.len() <= 255 => {}
        Some(_) => errors.add("email", "The email must be a valid email address"),
        None => errors.add("email", "The email field is required"),
    }
    match payload.phone_number.as_deref() {
        Some(phone) if !phone.trim().is_empty() && phone.len() <= 20 => {}
        Some(_) => errors.add("phone_number", "The phone number must be at most 20 characters"),
        None => errors.add("phone_number", "The phone number field is required"),
    }
    check_password_pair(&mut errors, "password", &payload.password, &payload.password_confirmation);
    errors.into_result()?;

    let first_name = payload.first_name.unwrap_or_default();
    let last_name = payload.last_name.unwrap_or_default();
    let email = payload.email.unwrap_or_default();
    let phone_number = payload.phone_number.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    let password_hash = hash(&password, DEFAULT_COST)
        .map_err(|e| AppError::internal(format!("Hash error: {e}")))?;
    let name = format!("{first_name} {last_name}");

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (name, first_name, last_name, email, phone_number, password_hash) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(&name)
    .bind(&first_name)
    .bind(&last_name)
    .bind(&email)
    .bind(&phone_number)
    .bind(&password_hash)
    .fetch_one(&db_pool)
    .await
    .map_err(|e| {
        if let Some(db_err) = e.as_database_error() {
            if db_err.code().as_deref() == Some("23505") {
                let field = if db_err.constraint().map_or(false, |c| c.contains("phone")) {
                    "phone_number"
                } else {
                    "email"
                };
                return AppError::validation(field, format!("The {field} has already been taken"));
            }
        }
        AppError::Database(e)
    })?;

    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::internal("JWT secret not configured"))?;
    let token = sign_token(user.id, &user.email, &secret)?;

    tracing::info!(user_id = user.id, "New user registered");

    mailer::send_async(
        user.email.clone(),
        "Welcome to SalesPulse".to_string(),
        format!("Hello {}, your account is ready.", user.name),
    );
    let manager_email =
        std::env::var("MANAGER_EMAIL").unwrap_or_else(|_| "admin@salespulse.com".to_string());
    mailer::send_async(
        manager_email,
        "New user registration".to_string(),
        format!("{} ({}) just registered.", user.name, user.email),
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::message_data(
            "User registered successfully",
            AuthData { user, token, token_type: "Bearer" },
        )),
    ))
}

pub async fn login(
    State(AppState { db_pool }): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthData>>, AppError> {
    let mut errors = ValidationErrors::new();
    if payload.login.as_deref().map_or(true, |s| s.trim().is_empty()) {
        errors.add("login", "The login field is required");
    }
    if payload.password.as_deref().map_or(true, |s| s.is_empty()) {
        errors.add("password", "The password field is required");
    }
    errors.into_result()?;

    let login = payload.login.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    // The login field carries either an email address or a phone number.
    let column = if login.contains('@') { "email" } else { "phone_number" };
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE {column} = $1"
    ))
    .bind(&login)
    .fetch_optional(&db_pool)
    .await?
    .ok_or_else(|| AppError::unauthorized("Invalid credentials"))?;

    let ok = verify(&password, &user.password_hash)
        .map_err(|e| AppError::internal(format!("Password verify error: {e}")))?;
    if !ok {
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    if !user.is_active {
        return Err(AppError::forbidden("Account is deactivated"));
    }

    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::internal("JWT secret not configured"))?;
    let token = sign_token(user.id, &user.email, &secret)?;

    Ok(Json(ApiResponse::message_data(
        "Login successful",
        AuthData { user, token, token_type: "Bearer" },
    )))
}

// Tokens are stateless; the client discards its copy.
pub async fn logout() -> Json<ApiResponse<()>> {
    Json(ApiResponse::message("Logged out successfully"))
}

pub async fn me(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let user = fetch_user(&db_pool, auth.user_id).await?;
    Ok(Json(ApiResponse::data(json!({ "user": user }))))
}

pub async fn change_password(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let mut errors = ValidationErrors::new();
    if payload.current_password.as_deref().map_or(true, |s| s.is_empty()) {
        errors.add("current_password", "The current password field is required");
    }
    check_password_pair(
        &mut errors,
        "new_password",
        &payload.new_password,
        &payload.new_password_confirmation,
    );
    errors.into_result()?;

    let user = fetch_user(&db_pool, auth.user_id).await?;

    let current = payload.current_password.unwrap_or_default();
    let ok = verify(&current, &user.password_hash)
        .map_err(|e| AppError::internal(format!("Password verify error: {e}")))?;
    if !ok {
        return Err(AppError::bad_request("Current password is incorrect"));
    }

    let new_hash = hash(payload.new_password.unwrap_or_default(), DEFAULT_COST)
        .map_err(|e| AppError::internal(format!("Hash error: {e}")))?;
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
        .bind(user.id)
        .bind(&new_hash)
        .execute(&db_pool)
        .await?;

    mailer::send_async(
        user.email.clone(),
        "Your password was changed".to_string(),
        format!("Hello {}, your SalesPulse password was just changed.", user.name),
    );

    Ok(Json(ApiResponse::message("Password changed successfully")))
}

pub async fn delete_account(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<DeleteAccountRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    if payload.password.as_deref().map_or(true, |s| s.is_empty()) {
        return Err(AppError::validation("password", "The password field is required"));
    }

    let user = fetch_user(&db_pool, auth.user_id).await?;
    let ok = verify(payload.password.unwrap_or_default(), &user.password_hash)
        .map_err(|e| AppError::internal(format!("Password verify error: {e}")))?;
    if !ok {
        return Err(AppError::bad_request("Password is incorrect"));
    }

    mailer::send_async(
        user.email.clone(),
        "Your account has been deleted".to_string(),
        format!("Goodbye {}, your SalesPulse account and data were removed.", user.name),
    );

    // Suppliers, sales, expenses and settings go with the user (ON DELETE CASCADE).
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user.id)
        .execute(&db_pool)
        .await?;

    tracing::info!(user_id = user.id, "Account deleted");

    Ok(Json(ApiResponse::message("Account deleted successfully")))
}

pub async fn forgot_password(
    State(AppState { db_pool }): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let email = match payload.email.as_deref() {
        Some(e) if looks_like_email(e) => e.to_string(),
        _ => return Err(AppError::validation("email", "The email must be a valid email address")),
    };

    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(&email)
    .fetch_optional(&db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("No account found with that email address"))?;

    let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
    let code = format!("{code:06}");
    let token = hash(&code, DEFAULT_COST)
        .map_err(|e| AppError::internal(format!("Hash error: {e}")))?;

    sqlx::query(
        "INSERT INTO password_reset_tokens (email, token, created_at) VALUES ($1, $2, NOW()) \
         ON CONFLICT (email) DO UPDATE SET token = EXCLUDED.token, created_at = NOW()",
    )
    .bind(&email)
    .bind(&token)
    .execute(&db_pool)
    .await?;

    // Unlike the notification mails, a lost reset code is an actionable
    // failure for the caller.
    mailer::deliver(
        &user.email,
        "Your password reset code",
        &format!("Hello {}, your reset code is {code}. It expires in {RESET_CODE_TTL_MINUTES} minutes.", user.name),
    )
    .await
    .map_err(|_| AppError::internal("Failed to send reset email. Please try again later."))?;

    Ok(Json(ApiResponse::message("Password reset code sent to your email")))
}

pub async fn reset_password(
    State(AppState { db_pool }): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let mut errors = ValidationErrors::new();
    if payload.email.as_deref().map_or(true, |e| !looks_like_email(e)) {
        errors.add("email", "The email must be a valid email address");
    }
    if payload.code.as_deref().map_or(true, |c| c.is_empty()) {
        errors.add("code", "The code field is required");
    }
    check_password_pair(&mut errors, "password", &payload.password, &payload.password_confirmation);
    errors.into_result()?;

    let email = payload.email.unwrap_or_default();
    let code = payload.code.unwrap_or_default();

    let row = sqlx::query_as::<_, (String, DateTime<Utc>)>(
        "SELECT token, created_at FROM password_reset_tokens WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(&db_pool)
    .await?
    .ok_or_else(|| AppError::bad_request("Invalid reset code"))?;

    let (token, created_at) = row;
    if Utc::now() - created_at > Duration::minutes(RESET_CODE_TTL_MINUTES) {
        return Err(AppError::bad_request("Reset code has expired"));
    }
    let ok = verify(&code, &token)
        .map_err(|e| AppError::internal(format!("Code verify error: {e}")))?;
    if !ok {
        return Err(AppError::bad_request("Invalid reset code"));
    }

    let new_hash = hash(payload.password.unwrap_or_default(), DEFAULT_COST)
        .map_err(|e| AppError::internal(format!("Hash error: {e}")))?;
    let result = sqlx::query(
        "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE email = $1",
    )
    .bind(&email)
    .bind(&new_hash)
    .execute(&db_pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("No account found with that email address"));
    }

    sqlx::query("DELETE FROM password_reset_tokens WHERE email = $1")
        .bind(&email)
        .execute(&db_pool)
        .await?;

    mailer::send_async(
        email,
        "Your password was reset".to_string(),
        "Your SalesPulse password was reset successfully.".to_string(),
    );

    Ok(Json(ApiResponse::message("Password has been reset successfully")))
}

pub(crate) async fn fetch_user(db_pool: &sqlx::PgPool, user_id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| AppError::unauthorized("Account no longer exists"))
}

fn check_required_name(errors: &mut ValidationErrors, field: &str, value: &Option<String>) {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() && v.len() <= 255 => {}
        Some(_) => errors.add(field, format!("The {field} must be between 1 and 255 characters")),
        None => errors.add(field, format!("The {field} field is required")),
    }
}

fn check_password_pair(
    errors: &mut ValidationErrors,
    field: &str,
    password: &Option<String>,
    confirmation: &Option<String>,
) {
    match password.as_deref() {
        Some(p) if p.len() >= 8 => {
            if confirmation.as_deref() != Some(p) {
                errors.add(field, format!("The {field} confirmation does not match"));
            }
        }
        Some(_) => errors.add(field, format!("The {field} must be at least 8 characters")),
        None => errors.add(field, format!("The {field} field is required")),
    }
}

fn looks_like_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_check() {
        assert!(looks_like_email("jane@example.com"));
        assert!(!looks_like_email("janeexample.com"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("jane@com"));
        assert!(!looks_like_email("jane@.com"));
    }

    #[test]
    fn password_pair_rules() {
        let mut errors = ValidationErrors::new();
        check_password_pair(&mut errors, "password", &Some("short".into()), &Some("short".into()));
        assert!(!errors.is_empty());

        let mut errors = ValidationErrors::new();
        check_password_pair(
            &mut errors,
            "password",
            &Some("long enough".into()),
            &Some("but different".into()),
        );
        assert!(!errors.is_empty());

        let mut errors = ValidationErrors::new();
        check_password_pair(
            &mut errors,
            "password",
            &Some("long enough".into()),
            &Some("long enough".into()),
        );
        assert!(errors.is_empty());
    }
}
