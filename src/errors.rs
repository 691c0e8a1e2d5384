// src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// One line item of an `InsufficientStock` failure: which product fell short
/// and by how much, so the storefront can render an actionable message.
#[derive(Debug, Clone, Serialize)]
pub struct StockShortage {
  pub product_id: Uuid,
  pub requested: i64,
  pub available: i64,
}

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authorization Failed: {0}")]
  Authorization(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Insufficient stock for {} product(s)", .0.len())]
  InsufficientStock(Vec<StockShortage>),

  // Deliberately detail-free: the response must not reveal which part of
  // the signature check failed.
  #[error("Invalid payment signature")]
  InvalidSignature,

  #[error("No captured payment to refund")]
  NoPaymentToRefund,

  #[error("Payment Gateway Error: {0}")]
  Gateway(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

// Allow anyhow::Error to be converted into AppError::Internal for convenience
// in handlers that call into anyhow-returning helpers with `?`.
impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    if err.is::<sqlx::Error>() {
      return AppError::Sqlx(err.downcast::<sqlx::Error>().unwrap());
    }
    AppError::Internal(err.to_string())
  }
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    // Log the full error when it's turned into a response
    tracing::error!(application_error = %self, "Responding with error");
    match self {
      AppError::Validation(m) => HttpResponse::BadRequest().json(json!({"error": m})),
      AppError::Authorization(m) => HttpResponse::Forbidden().json(json!({"error": m})),
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"error": m})),
      AppError::InsufficientStock(items) => {
        HttpResponse::BadRequest().json(json!({"error": "InsufficientStock", "items": items}))
      }
      AppError::InvalidSignature => HttpResponse::BadRequest().json(json!({"error": "InvalidSignature"})),
      AppError::NoPaymentToRefund => HttpResponse::BadRequest().json(json!({"error": "NoPaymentToRefund"})),
      AppError::Gateway(m) => HttpResponse::InternalServerError()
        .json(json!({"error": "Payment provider error", "detail": m, "retryable": true})),
      AppError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue", "detail": m}))
      }
      AppError::Sqlx(_) => HttpResponse::InternalServerError().json(json!({"error": "Database operation failed"})),
      AppError::Internal(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "An internal error occurred", "detail": m}))
      }
    }
  }
}

// Define a Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;
