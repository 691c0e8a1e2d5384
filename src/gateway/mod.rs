// src/gateway/mod.rs

//! Thin adapter to the external payment provider. The provider is treated
//! as an unreliable remote dependency: every call can fail or time out, and
//! callers get a retryable [`AppError::Gateway`] rather than a hang.
//!
//! [`AppError::Gateway`]: crate::errors::AppError::Gateway

pub mod mock;
pub mod rest;
pub mod signature;

use crate::errors::Result;
use async_trait::async_trait;
use serde::Serialize;

/// Request to open a payment intent on the provider side.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayOrderRequest {
  /// Minor currency units.
  pub amount: i64,
  pub currency: String,
  /// Our order number, echoed back by the provider for reconciliation.
  pub receipt: String,
}

/// A provider-side payment intent.
#[derive(Debug, Clone)]
pub struct GatewayOrder {
  pub reference: String,
  pub amount: i64,
  pub currency: String,
}

/// Best-effort payment attempt details fetched after a capture.
#[derive(Debug, Clone, Default)]
pub struct GatewayPaymentDetails {
  pub method: Option<String>,
  pub email: Option<String>,
  pub contact: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GatewayRefund {
  pub reference: String,
  pub amount: Option<i64>,
  pub status: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn create_order(&self, request: &GatewayOrderRequest) -> Result<GatewayOrder>;

  /// Fetch details of a payment attempt. Callers on the confirmation path
  /// treat failures here as non-fatal.
  async fn fetch_payment(&self, payment_ref: &str) -> Result<GatewayPaymentDetails>;

  /// Issue a (possibly partial) refund against a captured payment.
  async fn refund(&self, payment_ref: &str, amount: Option<i64>) -> Result<GatewayRefund>;
}
