use serde::Deserialize;
use chrono::NaiveDate;

#[derive(Deserialize)]
pub struct CreateExpenseRequest {
    pub title: Option<String>,
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub expense_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct UpdateExpenseRequest {
    pub title: Option<String>,
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub description: Option<Option<String>>,
    pub expense_date: Option<NaiveDate>,
}
