// src/response.rs
use serde::Serialize;

/// Uniform `{success, message?, data?}` envelope used by every endpoint.
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self { success: true, message: None, data: Some(data) }
    }

    pub fn message_data(message: impl Into<String>, data: T) -> Self {
        Self { success: true, message: Some(message.into()), data: Some(data) }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self { success: true, message: Some(message.into()), data: None }
    }
}

/// List envelope when the caller asks for `per_page`.
#[derive(Serialize)]
pub struct PaginatedResponse<T: Serialize> {
    pub success: bool,
    pub data: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Serialize)]
pub struct Pagination {
    pub current_page: i64,
    pub per_page: i64,
    pub total: i64,
    pub last_page: i64,
}

impl<T: Serialize> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, current_page: i64, per_page: i64, total: i64) -> Self {
        let last_page = if total == 0 { 1 } else { (total + per_page - 1) / per_page };
        Self {
            success: true,
            data,
            pagination: Pagination { current_page, per_page, total, last_page },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_only_envelope_omits_data() {
        let v = serde_json::to_value(ApiResponse::message("Expense deleted successfully")).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["message"], "Expense deleted successfully");
        assert!(v.get("data").is_none());
    }

    #[test]
    fn last_page_rounds_up() {
        let page = PaginatedResponse::new(vec![1, 2, 3], 1, 15, 31);
        assert_eq!(page.pagination.last_page, 3);
        let empty: PaginatedResponse<i32> = PaginatedResponse::new(vec![], 1, 15, 0);
        assert_eq!(empty.pagination.last_page, 1);
    }
}
