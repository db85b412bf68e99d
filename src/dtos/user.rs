use serde::{Deserialize, Serialize};
use chrono::NaiveDate;

use crate::models::user::User;

// Required fields are Options so presence is checked by the validation layer
// and reported as field errors, not as a body-rejection.

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Email address or phone number.
    pub login: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct AuthData {
    pub user: User,
    pub token: String,
    pub token_type: &'static str,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub new_password_confirmation: Option<String>,
}

#[derive(Deserialize)]
pub struct DeleteAccountRequest {
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
    pub code: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Deserialize)]
pub struct ExportDataRequest {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub include_sales: Option<bool>,
    pub include_expenses: Option<bool>,
}
