//! Error handling for the Cosmetics Warehouse Management server
//!
//! Provides consistent error responses in English and Korean

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::{ApplyError, OrderType, OutOfRange, Shortage};
use thiserror::Error;
use uuid::Uuid;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_ko: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Order state errors
    #[error("Order already applied")]
    AlreadyApplied,

    #[error("Expected a {expected} order, found a {actual} order")]
    WrongOrderType { expected: OrderType, actual: OrderType },

    #[error("No warehouse priority configured")]
    NoPriorityConfigured,

    #[error("Order has no ingredient requirements")]
    EmptyOrder,

    #[error("Insufficient stock at warehouse {warehouse_id}")]
    InsufficientStock {
        warehouse_id: Uuid,
        shortages: Vec<Shortage>,
    },

    #[error("Concurrent update: {0}")]
    ConcurrentUpdate(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[source] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Validation failure on a single input field
    pub fn invalid(field: &str, message: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
            message_ko: format!("입력값이 올바르지 않습니다: {}", field),
        }
    }

    /// A quantity or cost too large to compute or store
    pub fn quantity_out_of_range() -> Self {
        AppError::Validation {
            field: "quantity_kg".to_string(),
            message: "Quantity or cost is out of range".to_string(),
            message_ko: "수량 또는 금액이 허용 범위를 벗어났습니다".to_string(),
        }
    }
}

impl From<OutOfRange> for AppError {
    fn from(_: OutOfRange) -> Self {
        AppError::quantity_out_of_range()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                // serialization_failure, deadlock_detected, lock_not_available
                Some("40001") | Some("40P01") | Some("55P03") => {
                    return AppError::ConcurrentUpdate(db_err.message().to_string());
                }
                // numeric_value_out_of_range
                Some("22003") => {
                    return AppError::quantity_out_of_range();
                }
                // foreign_key_violation
                Some("23503") => {
                    return AppError::NotFound(
                        db_err
                            .constraint()
                            .map(|c| format!("Record referenced by {}", c))
                            .unwrap_or_else(|| "Referenced record".to_string()),
                    );
                }
                _ => {}
            }
        }
        AppError::DatabaseError(err)
    }
}

impl From<ApplyError> for AppError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::AlreadyApplied => AppError::AlreadyApplied,
            ApplyError::WrongOrderType { expected, actual } => {
                AppError::WrongOrderType { expected, actual }
            }
            ApplyError::NoPriorityConfigured => AppError::NoPriorityConfigured,
            ApplyError::EmptyOrder => AppError::EmptyOrder,
            ApplyError::OutOfRange(err) => err.into(),
            ApplyError::InsufficientStock {
                warehouse_id,
                shortages,
            } => AppError::InsufficientStock {
                warehouse_id,
                shortages,
            },
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_ko: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortages: Option<Vec<Shortage>>,
}

impl ErrorDetail {
    pub fn new(code: &str, message_en: String, message_ko: String) -> Self {
        Self {
            code: code.to_string(),
            message_en,
            message_ko,
            field: None,
            warehouse_id: None,
            shortages: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new(
                    "TOKEN_EXPIRED",
                    "Token has expired".to_string(),
                    "토큰이 만료되었습니다".to_string(),
                ),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new(
                    "INVALID_TOKEN",
                    "Invalid token".to_string(),
                    "유효하지 않은 토큰입니다".to_string(),
                ),
            ),
            AppError::Validation {
                field,
                message,
                message_ko,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    field: Some(field.clone()),
                    ..ErrorDetail::new("VALIDATION_ERROR", message.clone(), message_ko.clone())
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new(
                    "NOT_FOUND",
                    format!("{} not found", resource),
                    format!("{}을(를) 찾을 수 없습니다", resource),
                ),
            ),
            AppError::AlreadyApplied => (
                StatusCode::CONFLICT,
                ErrorDetail::new(
                    "ALREADY_APPLIED",
                    "Order has already been applied to warehouse stock".to_string(),
                    "이미 창고에 반영된 발주입니다".to_string(),
                ),
            ),
            AppError::WrongOrderType { expected, actual } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new(
                    "WRONG_ORDER_TYPE",
                    format!("Expected a {} order, found a {} order", expected, actual),
                    "발주 유형이 올바르지 않습니다".to_string(),
                ),
            ),
            AppError::NoPriorityConfigured => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new(
                    "NO_PRIORITY_CONFIGURED",
                    "No warehouse priority has been configured".to_string(),
                    "창고 우선순위가 설정되지 않았습니다".to_string(),
                ),
            ),
            AppError::EmptyOrder => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new(
                    "EMPTY_ORDER",
                    "Order has no ingredient requirements".to_string(),
                    "발주에 원료 항목이 없습니다".to_string(),
                ),
            ),
            AppError::InsufficientStock {
                warehouse_id,
                shortages,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    warehouse_id: Some(*warehouse_id),
                    shortages: Some(shortages.clone()),
                    ..ErrorDetail::new(
                        "INSUFFICIENT_STOCK",
                        "Insufficient stock on priority-1 warehouse".to_string(),
                        "우선순위 1 창고의 재고가 부족합니다".to_string(),
                    )
                },
            ),
            AppError::ConcurrentUpdate(_) => (
                StatusCode::CONFLICT,
                ErrorDetail::new(
                    "CONCURRENT_UPDATE",
                    "The record was changed by another request, please retry".to_string(),
                    "다른 작업과 충돌했습니다. 다시 시도해 주세요".to_string(),
                ),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                    "데이터베이스 오류가 발생했습니다".to_string(),
                ),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "INTERNAL_ERROR",
                    msg.clone(),
                    "서버 내부 오류가 발생했습니다".to_string(),
                ),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    "서버 내부 오류가 발생했습니다".to_string(),
                ),
            ),
        };

        // Log the error for debugging
        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!("Request failed: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
