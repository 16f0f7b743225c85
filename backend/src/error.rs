//! Error handling for the Retail Management Platform
//!
//! Provides consistent error responses in English and Chinese. The HTTP
//! boundary maps typed core failures to statuses; internal detail is never
//! leaked beyond a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String, message_zh: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String, message_zh: String },

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_zh: String,
    },

    #[error("Duplicate entry: {message}")]
    DuplicateEntry {
        field: String,
        message: String,
        message_zh: String,
    },

    #[error("Conflict: {message}")]
    Conflict {
        resource: String,
        message: String,
        message_zh: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Insufficient stock: {message}")]
    InsufficientStock { message: String, message_zh: String },

    #[error("Invalid state transition: {message}")]
    InvalidStateTransition { message: String, message_zh: String },

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response envelope: `{success: false, message, error: {...}}`
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_zh: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Chinese display names for entities referenced in `NotFound`
fn resource_zh(resource: &str) -> String {
    match resource {
        "Product" => "商品不存在".to_string(),
        "Category" => "分类不存在".to_string(),
        "Order" => "订单不存在".to_string(),
        "User" => "用户不存在".to_string(),
        "Alert" => "预警记录不存在".to_string(),
        other => format!("{} 不存在", other),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "INVALID_CREDENTIALS".to_string(),
                    message_en: "Invalid username or password".to_string(),
                    message_zh: "用户名或密码错误".to_string(),
                    field: None,
                },
            ),
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "TOKEN_EXPIRED".to_string(),
                    message_en: "Token has expired".to_string(),
                    message_zh: "登录已过期，请重新登录".to_string(),
                    field: None,
                },
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "INVALID_TOKEN".to_string(),
                    message_en: "Invalid token".to_string(),
                    message_zh: "认证令牌无效".to_string(),
                    field: None,
                },
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail {
                    code: "INSUFFICIENT_PERMISSIONS".to_string(),
                    message_en: "You do not have permission to perform this action".to_string(),
                    message_zh: "权限不足，无法执行此操作".to_string(),
                    field: None,
                },
            ),
            AppError::Unauthorized {
                message,
                message_zh,
            } => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "UNAUTHORIZED".to_string(),
                    message_en: message.clone(),
                    message_zh: message_zh.clone(),
                    field: None,
                },
            ),
            AppError::Forbidden {
                message,
                message_zh,
            } => (
                StatusCode::FORBIDDEN,
                ErrorDetail {
                    code: "FORBIDDEN".to_string(),
                    message_en: message.clone(),
                    message_zh: message_zh.clone(),
                    field: None,
                },
            ),
            AppError::Validation {
                field,
                message,
                message_zh,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: message.clone(),
                    message_zh: message_zh.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::DuplicateEntry {
                field,
                message,
                message_zh,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "DUPLICATE_ENTRY".to_string(),
                    message_en: message.clone(),
                    message_zh: message_zh.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::Conflict {
                resource,
                message,
                message_zh,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "CONFLICT".to_string(),
                    message_en: message.clone(),
                    message_zh: message_zh.clone(),
                    field: Some(resource.clone()),
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message_en: format!("{} not found", resource),
                    message_zh: resource_zh(resource),
                    field: None,
                },
            ),
            AppError::InsufficientStock {
                message,
                message_zh,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "INSUFFICIENT_STOCK".to_string(),
                    message_en: message.clone(),
                    message_zh: message_zh.clone(),
                    field: None,
                },
            ),
            AppError::InvalidStateTransition {
                message,
                message_zh,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "INVALID_STATE_TRANSITION".to_string(),
                    message_en: message.clone(),
                    message_zh: message_zh.clone(),
                    field: None,
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message_en: "A database error occurred".to_string(),
                    message_zh: "服务器错误，请稍后重试".to_string(),
                    field: None,
                },
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: "An internal server error occurred".to_string(),
                    message_zh: "服务器错误，请稍后重试".to_string(),
                    field: None,
                },
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: "An internal server error occurred".to_string(),
                    message_zh: "服务器错误，请稍后重试".to_string(),
                    field: None,
                },
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        let body = ErrorResponse {
            success: false,
            message: error_detail.message_en.clone(),
            error: error_detail,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_rejections_map_to_bad_request() {
        let cases = [
            AppError::Validation {
                field: "quantity".to_string(),
                message: "Quantity must be positive".to_string(),
                message_zh: "商品数量必须大于0".to_string(),
            },
            AppError::Validation {
                field: "adjustType".to_string(),
                message: "Adjustment type must be in, out or adjust".to_string(),
                message_zh: "调整类型或数量无效".to_string(),
            },
            AppError::InsufficientStock {
                message: "Insufficient stock".to_string(),
                message_zh: "库存不足".to_string(),
            },
            AppError::InvalidStateTransition {
                message: "Order is already cancelled".to_string(),
                message_zh: "订单已取消".to_string(),
            },
        ];
        for error in cases {
            assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_auth_errors_map_to_unauthorized() {
        assert_eq!(
            AppError::InvalidCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::TokenExpired.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::InsufficientPermissions.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_missing_resources_map_to_not_found() {
        assert_eq!(
            AppError::NotFound("Product".to_string()).into_response().status(),
            StatusCode::NOT_FOUND
        );
    }
}
