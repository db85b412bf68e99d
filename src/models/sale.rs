use chrono::{DateTime, NaiveDate, Utc};

/// Sale joined with its optional supplier. Money columns are NUMERIC in the
/// database; every query selecting into this row casts them `::FLOAT8`.
#[derive(sqlx::FromRow)]
pub struct SaleWithSupplierRow {
    pub id: i64,
    pub user_id: i64,
    pub supplier_id: Option<i64>,
    pub product_name: String,
    pub price: f64,
    pub quantity: i32,
    pub commission: f64,
    pub feedback: Option<String>,
    pub commission_paid: bool,
    pub sale_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub supplier_name: Option<String>,
    pub supplier_email: Option<String>,
    pub supplier_phone: Option<String>,
}

/// Input rows for the unpaid-commission grouping: commission_paid = false,
/// commission > 0, ordered sale_date DESC.
#[derive(sqlx::FromRow)]
pub struct UnpaidSaleRow {
    pub id: i64,
    pub supplier_id: Option<i64>,
    pub supplier_name: Option<String>,
    pub supplier_email: Option<String>,
    pub supplier_phone: Option<String>,
    pub product_name: String,
    pub commission: f64,
    pub sale_date: NaiveDate,
    pub quantity: i32,
    pub price: f64,
}
