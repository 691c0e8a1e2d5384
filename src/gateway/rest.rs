// src/gateway/rest.rs

//! REST client for the real payment provider. Built once at startup from
//! config and injected into the orchestrator; the reqwest client carries a
//! bounded timeout so a wedged provider surfaces as a retryable error
//! instead of hanging the request.

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::gateway::{GatewayOrder, GatewayOrderRequest, GatewayPaymentDetails, GatewayRefund, PaymentGateway};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub struct RestGateway {
  http: reqwest::Client,
  base_url: String,
  key_id: String,
  key_secret: String,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
  id: String,
  amount: i64,
  currency: String,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
  method: Option<String>,
  email: Option<String>,
  contact: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefundResponse {
  id: String,
  amount: Option<i64>,
  status: String,
}

impl RestGateway {
  pub fn new(config: &AppConfig) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_millis(config.gateway_timeout_ms))
      .build()
      .map_err(|e| AppError::Config(format!("Failed to build gateway HTTP client: {}", e)))?;
    Ok(Self {
      http,
      base_url: config.gateway_api_url.trim_end_matches('/').to_string(),
      key_id: config.gateway_key_id.clone(),
      key_secret: config.gateway_key_secret.clone(),
    })
  }

  fn request_error(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
      AppError::Gateway("Gateway request timed out".to_string())
    } else {
      AppError::Gateway(format!("Gateway request failed: {}", err))
    }
  }

  async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(AppError::Gateway(format!("Gateway returned {}: {}", status, body)));
    }
    response.json::<T>().await.map_err(Self::request_error)
  }
}

#[async_trait]
impl PaymentGateway for RestGateway {
  async fn create_order(&self, request: &GatewayOrderRequest) -> Result<GatewayOrder> {
    let response = self
      .http
      .post(format!("{}/v1/orders", self.base_url))
      .basic_auth(&self.key_id, Some(&self.key_secret))
      .json(request)
      .send()
      .await
      .map_err(Self::request_error)?;
    let order: OrderResponse = Self::decode(response).await?;
    Ok(GatewayOrder {
      reference: order.id,
      amount: order.amount,
      currency: order.currency,
    })
  }

  async fn fetch_payment(&self, payment_ref: &str) -> Result<GatewayPaymentDetails> {
    let response = self
      .http
      .get(format!("{}/v1/payments/{}", self.base_url, payment_ref))
      .basic_auth(&self.key_id, Some(&self.key_secret))
      .send()
      .await
      .map_err(Self::request_error)?;
    let payment: PaymentResponse = Self::decode(response).await?;
    Ok(GatewayPaymentDetails {
      method: payment.method,
      email: payment.email,
      contact: payment.contact,
    })
  }

  async fn refund(&self, payment_ref: &str, amount: Option<i64>) -> Result<GatewayRefund> {
    let body = match amount {
      Some(amount) => serde_json::json!({ "amount": amount }),
      None => serde_json::json!({}),
    };
    let response = self
      .http
      .post(format!("{}/v1/payments/{}/refund", self.base_url, payment_ref))
      .basic_auth(&self.key_id, Some(&self.key_secret))
      .json(&body)
      .send()
      .await
      .map_err(Self::request_error)?;
    let refund: RefundResponse = Self::decode(response).await?;
    Ok(GatewayRefund {
      reference: refund.id,
      amount: refund.amount,
      status: refund.status,
    })
  }
}
