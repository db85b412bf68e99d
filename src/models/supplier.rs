use serde::Serialize;
use chrono::{DateTime, Utc};

#[derive(sqlx::FromRow, Serialize)]
pub struct Supplier {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
