//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Standard response envelope for all API endpoints
///
/// Every endpoint responds with `{success, message?, data?}`; HTTP status
/// is 2xx exactly when `success` is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying data
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    /// Successful response carrying data and a human-readable message
    pub fn ok_with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    /// Successful response with a message only
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// Pagination parameters accepted by list endpoints
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default = "Pagination::default_page")]
    pub page: u32,
    #[serde(default = "Pagination::default_page_size")]
    pub page_size: u32,
}

impl Pagination {
    fn default_page() -> u32 {
        1
    }

    fn default_page_size() -> u32 {
        20
    }

    /// Row offset for the current page
    pub fn offset(&self) -> i64 {
        (self.page.max(1) as i64 - 1) * self.limit()
    }

    /// Row limit for the current page, clamped to a sane maximum
    pub fn limit(&self) -> i64 {
        self.page_size.clamp(1, 100) as i64
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
        }
    }
}

/// A page of results with the totals the client needs for paging
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData<T> {
    pub list: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> PageData<T> {
    pub fn new(list: Vec<T>, total: i64, pagination: Pagination) -> Self {
        Self {
            list,
            total,
            page: pagination.page.max(1),
            page_size: pagination.limit() as u32,
        }
    }
}

/// Derived stock status for a product, computed per read and never stored
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    Low,
    High,
    #[default]
    Normal,
}

impl StockStatus {
    /// Evaluate thresholds for the current quantity
    ///
    /// `low` is checked first so degenerate configurations
    /// (`min_stock >= max_stock`) still resolve deterministically.
    pub fn evaluate(stock_quantity: i32, min_stock: i32, max_stock: i32) -> Self {
        if stock_quantity <= min_stock {
            StockStatus::Low
        } else if stock_quantity >= max_stock {
            StockStatus::High
        } else {
            StockStatus::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Low => "low",
            StockStatus::High => "high",
            StockStatus::Normal => "normal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_status_thresholds() {
        assert_eq!(StockStatus::evaluate(5, 10, 100), StockStatus::Low);
        assert_eq!(StockStatus::evaluate(10, 10, 100), StockStatus::Low);
        assert_eq!(StockStatus::evaluate(100, 10, 100), StockStatus::High);
        assert_eq!(StockStatus::evaluate(150, 10, 100), StockStatus::High);
        assert_eq!(StockStatus::evaluate(50, 10, 100), StockStatus::Normal);
    }

    #[test]
    fn test_stock_status_degenerate_thresholds() {
        // min_stock >= max_stock: low wins when both conditions hold
        assert_eq!(StockStatus::evaluate(10, 20, 15), StockStatus::Low);
        assert_eq!(StockStatus::evaluate(20, 20, 20), StockStatus::Low);
        assert_eq!(StockStatus::evaluate(25, 20, 20), StockStatus::High);
    }

    #[test]
    fn test_pagination_offsets() {
        let p = Pagination {
            page: 3,
            page_size: 20,
        };
        assert_eq!(p.offset(), 40);
        assert_eq!(p.limit(), 20);

        // Page zero is treated as the first page
        let p = Pagination {
            page: 0,
            page_size: 20,
        };
        assert_eq!(p.offset(), 0);

        // Oversized page sizes are clamped
        let p = Pagination {
            page: 1,
            page_size: 5000,
        };
        assert_eq!(p.limit(), 100);
    }

    #[test]
    fn test_api_response_serialization() {
        let resp = ApiResponse::ok_with_message("库存调整成功", serde_json::json!({"a": 1}));
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "库存调整成功");
        assert_eq!(value["data"]["a"], 1);

        let resp = ApiResponse::<()>::message("订单取消成功");
        let value = serde_json::to_value(&resp).unwrap();
        assert!(value.get("data").is_none());
    }

    #[test]
    fn test_page_data_serializes_camel_case() {
        let page = PageData::new(vec![1, 2, 3], 3, Pagination::default());
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["pageSize"], 20);
        assert_eq!(value["total"], 3);
    }
}
