use serde::Serialize;
use chrono::{DateTime, NaiveDate, Utc};

#[derive(sqlx::FromRow, Serialize)]
pub struct Expense {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub amount: f64,
    pub description: Option<String>,
    pub expense_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
