use serde::{Deserialize, Serialize};

use crate::dtos::sale::SaleResponse;
use crate::models::supplier::Supplier;

#[derive(Deserialize)]
pub struct CreateSupplierRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize)]
pub struct UpdateSupplierRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub notes: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// Supplier detail view with the supplier's own sales embedded.
#[derive(Serialize)]
pub struct SupplierWithSales {
    #[serde(flatten)]
    pub supplier: Supplier,
    pub sales: Vec<SaleResponse>,
}
