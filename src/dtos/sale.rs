use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};

use crate::models::sale::SaleWithSupplierRow;

#[derive(Deserialize)]
pub struct CreateSaleRequest {
    pub product_name: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i32>,
    pub commission: Option<f64>,
    pub supplier_id: Option<i64>,
    pub feedback: Option<String>,
    pub commission_paid: Option<bool>,
    pub sale_date: Option<NaiveDate>,
}

/// Partial update. Nullable columns use the double-Option pattern so an
/// absent field leaves the column alone while an explicit null clears it.
#[derive(Deserialize)]
pub struct UpdateSaleRequest {
    pub product_name: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i32>,
    pub commission: Option<f64>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub supplier_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub feedback: Option<Option<String>>,
    pub commission_paid: Option<bool>,
    pub sale_date: Option<NaiveDate>,
}

#[derive(Serialize, Clone)]
pub struct SupplierSummary {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Serialize)]
pub struct SaleResponse {
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
    pub total_amount: f64,
    pub supplier: Option<SupplierSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SaleWithSupplierRow> for SaleResponse {
    fn from(row: SaleWithSupplierRow) -> Self {
        let supplier = match (row.supplier_id, row.supplier_name) {
            (Some(id), Some(name)) => Some(SupplierSummary {
                id,
                name,
                email: row.supplier_email,
                phone: row.supplier_phone,
            }),
            _ => None,
        };
        Self {
            id: row.id,
            user_id: row.user_id,
            supplier_id: row.supplier_id,
            product_name: row.product_name,
            price: row.price,
            quantity: row.quantity,
            commission: row.commission,
            feedback: row.feedback,
            commission_paid: row.commission_paid,
            sale_date: row.sale_date,
            total_amount: row.price * row.quantity as f64,
            supplier,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Deserialize)]
pub struct MarkMultipleRequest {
    pub sale_ids: Option<Vec<i64>>,
}

/// Bulk mark-paid responses carry the count next to the envelope fields.
#[derive(Serialize)]
pub struct MarkPaidResponse {
    pub success: bool,
    pub message: String,
    pub updated_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(supplier_id: Option<i64>, supplier_name: Option<&str>) -> SaleWithSupplierRow {
        SaleWithSupplierRow {
            id: 1,
            user_id: 7,
            supplier_id,
            product_name: "Widget".into(),
            price: 12.5,
            quantity: 4,
            commission: 2.0,
            feedback: None,
            commission_paid: false,
            sale_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            supplier_name: supplier_name.map(String::from),
            supplier_email: None,
            supplier_phone: None,
        }
    }

    #[test]
    fn total_amount_is_price_times_quantity() {
        let resp = SaleResponse::from(row(None, None));
        assert_eq!(resp.total_amount, 50.0);
        assert!(resp.supplier.is_none());
    }

    #[test]
    fn supplier_summary_built_from_joined_columns() {
        let resp = SaleResponse::from(row(Some(3), Some("Acme")));
        let supplier = resp.supplier.unwrap();
        assert_eq!(supplier.id, 3);
        assert_eq!(supplier.name, "Acme");
    }

    #[test]
    fn update_request_distinguishes_absent_from_null() {
        let absent: UpdateSaleRequest = serde_json::from_str(r#"{"price": 9.0}"#).unwrap();
        assert!(absent.supplier_id.is_none());

        let cleared: UpdateSaleRequest = serde_json::from_str(r#"{"supplier_id": null}"#).unwrap();
        assert_eq!(cleared.supplier_id, Some(None));

        let set: UpdateSaleRequest = serde_json::from_str(r#"{"supplier_id": 5}"#).unwrap();
        assert_eq!(set.supplier_id, Some(Some(5)));
    }
}
