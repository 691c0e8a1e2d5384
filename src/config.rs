// src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;

/// Totals policy applied at checkout time. Flat-rate tax/shipping is a
/// deliberate placeholder: jurisdiction-aware tax computation is out of
/// scope for this service.
#[derive(Debug, Clone)]
pub struct PricingPolicy {
  /// Tax as basis points of the subtotal (1000 = 10%).
  pub tax_rate_bps: u32,
  /// Flat shipping charge in minor currency units.
  pub shipping_flat: i64,
}

impl Default for PricingPolicy {
  fn default() -> Self {
    Self {
      tax_rate_bps: 1000,
      shipping_flat: 10,
    }
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// When unset the service runs against the in-memory stores (local dev).
  pub database_url: Option<String>,

  pub gateway_api_url: String,
  pub gateway_key_id: String,
  pub gateway_key_secret: String,
  /// Separate secret for webhook bodies. Optional at startup: the webhook
  /// endpoint refuses traffic with a 500 until it is configured.
  pub gateway_webhook_secret: Option<String>,
  pub gateway_timeout_ms: u64,

  pub pricing: PricingPolicy,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = env::var("DATABASE_URL").ok();

    let gateway_api_url = get_env("GATEWAY_API_URL").unwrap_or_else(|_| "https://api.gateway.test".to_string());
    let gateway_key_id = get_env("GATEWAY_KEY_ID")?;
    let gateway_key_secret = get_env("GATEWAY_KEY_SECRET")?;
    let gateway_webhook_secret = env::var("GATEWAY_WEBHOOK_SECRET").ok();
    let gateway_timeout_ms = get_env("GATEWAY_TIMEOUT_MS")
      .unwrap_or_else(|_| "5000".to_string())
      .parse::<u64>()
      .map_err(|e| AppError::Config(format!("Invalid GATEWAY_TIMEOUT_MS: {}", e)))?;

    let tax_rate_bps = get_env("TAX_RATE_BPS")
      .unwrap_or_else(|_| "1000".to_string())
      .parse::<u32>()
      .map_err(|e| AppError::Config(format!("Invalid TAX_RATE_BPS: {}", e)))?;
    let shipping_flat = get_env("SHIPPING_FLAT")
      .unwrap_or_else(|_| "10".to_string())
      .parse::<i64>()
      .map_err(|e| AppError::Config(format!("Invalid SHIPPING_FLAT: {}", e)))?;

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      gateway_api_url,
      gateway_key_id,
      gateway_key_secret,
      gateway_webhook_secret,
      gateway_timeout_ms,
      pricing: PricingPolicy {
        tax_rate_bps,
        shipping_flat,
      },
    })
  }
}
