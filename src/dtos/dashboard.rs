use serde::{Deserialize, Serialize};
use chrono::NaiveDate;

use crate::dtos::sale::{SaleResponse, SupplierSummary};
use crate::models::expense::Expense;

#[derive(Deserialize)]
pub struct MonthQuery {
    pub month: Option<i32>,
    pub year: Option<i32>,
}

#[derive(Deserialize)]
pub struct YearQuery {
    pub year: Option<i32>,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub month: Option<i32>,
    pub year: Option<i32>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct Overview {
    pub total_sales: f64,
    pub total_expenses: f64,
    pub total_products: i64,
    pub commission_paid: f64,
    /// Running balance over all unpaid sales, deliberately not month-scoped.
    pub unpaid_commission: f64,
    pub net_profit: f64,
    pub month: i32,
    pub year: i32,
}

#[derive(Serialize)]
pub struct UnpaidProduct {
    pub id: i64,
    pub product_name: String,
    pub commission: f64,
    pub sale_date: NaiveDate,
    pub quantity: i32,
    pub price: f64,
    pub total_amount: f64,
}

#[derive(Serialize)]
pub struct UnpaidCommissionGroup {
    pub supplier_id: Option<i64>,
    pub supplier: Option<SupplierSummary>,
    pub supplier_name: String,
    pub total_commission: f64,
    pub sales_count: i64,
    pub products: Vec<UnpaidProduct>,
}

#[derive(Serialize)]
pub struct UnpaidCommissionsBlock {
    pub has_unpaid: bool,
    pub total_unpaid: f64,
    pub list: Vec<UnpaidCommissionGroup>,
}

#[derive(Serialize)]
pub struct DashboardData {
    pub overview: Overview,
    pub unpaid_commissions: UnpaidCommissionsBlock,
}

#[derive(Serialize)]
pub struct UnpaidCommissionsData {
    pub has_unpaid: bool,
    pub total_unpaid: f64,
    pub unpaid_commissions: Vec<UnpaidCommissionGroup>,
}

#[derive(Serialize)]
pub struct MonthlyStat {
    pub month: i32,
    pub month_name: &'static str,
    pub sales: f64,
    pub expenses: f64,
    pub profit: f64,
}

#[derive(Serialize)]
pub struct HistoryData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales: Option<Vec<SaleResponse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expenses: Option<Vec<Expense>>,
}
