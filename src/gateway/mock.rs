// src/gateway/mock.rs

//! Deterministic in-process gateway used by the test suite and local
//! development. Failure toggles simulate provider outages and timeouts.

use crate::errors::{AppError, Result};
use crate::gateway::{GatewayOrder, GatewayOrderRequest, GatewayPaymentDetails, GatewayRefund, PaymentGateway};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
  orders: HashMap<String, GatewayOrder>,
  fail_create: bool,
  fail_fetch: bool,
  fail_refund: bool,
  create_delay: Option<Duration>,
}

#[derive(Default)]
pub struct MockGateway {
  inner: Mutex<Inner>,
}

impl MockGateway {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn fail_create_order(&self, fail: bool) {
    self.inner.lock().fail_create = fail;
  }

  pub fn fail_fetch_payment(&self, fail: bool) {
    self.inner.lock().fail_fetch = fail;
  }

  pub fn fail_refund(&self, fail: bool) {
    self.inner.lock().fail_refund = fail;
  }

  /// Hold `create_order` calls for `delay`, widening the provider
  /// round-trip window so tests can race callers through it.
  pub fn delay_create_order(&self, delay: Duration) {
    self.inner.lock().create_delay = Some(delay);
  }
}

#[async_trait]
impl PaymentGateway for MockGateway {
  async fn create_order(&self, request: &GatewayOrderRequest) -> Result<GatewayOrder> {
    if request.amount <= 0 {
      return Err(AppError::Gateway("Amount must be greater than zero".to_string()));
    }
    let delay = self.inner.lock().create_delay;
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
    let mut inner = self.inner.lock();
    if inner.fail_create {
      return Err(AppError::Gateway("Simulated provider outage".to_string()));
    }
    let order = GatewayOrder {
      reference: format!("order_{}", Uuid::new_v4().simple()),
      amount: request.amount,
      currency: request.currency.clone(),
    };
    info!(gateway_order_ref = %order.reference, receipt = %request.receipt, "Mock gateway order created");
    inner.orders.insert(order.reference.clone(), order.clone());
    Ok(order)
  }

  async fn fetch_payment(&self, payment_ref: &str) -> Result<GatewayPaymentDetails> {
    if self.inner.lock().fail_fetch {
      return Err(AppError::Gateway("Simulated fetch timeout".to_string()));
    }
    info!(gateway_payment_ref = %payment_ref, "Mock gateway payment fetched");
    Ok(GatewayPaymentDetails {
      method: Some("card".to_string()),
      email: Some("buyer@example.com".to_string()),
      contact: Some("+10000000000".to_string()),
    })
  }

  async fn refund(&self, payment_ref: &str, amount: Option<i64>) -> Result<GatewayRefund> {
    if self.inner.lock().fail_refund {
      return Err(AppError::Gateway("Simulated refund failure".to_string()));
    }
    info!(gateway_payment_ref = %payment_ref, ?amount, "Mock gateway refund issued");
    Ok(GatewayRefund {
      reference: format!("rfnd_{}", Uuid::new_v4().simple()),
      amount,
      status: "processed".to_string(),
    })
  }
}
