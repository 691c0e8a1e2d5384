// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use storefront_orders::config::{AppConfig, PricingPolicy};
use storefront_orders::gateway::mock::MockGateway;
use storefront_orders::models::Order;
use storefront_orders::services::orchestrator::{
  CheckoutItem, CheckoutRequest, CreatePaymentRequest, GatewaySecrets, PaymentOrchestrator, PaymentOrderCreated,
};
use storefront_orders::state::AppState;
use storefront_orders::stores::ProductInfo;
use storefront_orders::stores::memory::MemoryStore;
use storefront_orders::models::{Address, CustomerContact};
use uuid::Uuid;

pub const KEY_SECRET: &str = "test-key-secret";
pub const WEBHOOK_SECRET: &str = "test-webhook-secret";

pub struct Harness {
  pub store: Arc<MemoryStore>,
  pub gateway: Arc<MockGateway>,
  pub orchestrator: Arc<PaymentOrchestrator>,
  pub store_id: Uuid,
}

fn build(webhook_secret: Option<String>) -> Harness {
  let store = Arc::new(MemoryStore::new());
  let gateway = Arc::new(MockGateway::new());
  let store_id = Uuid::new_v4();
  store.seed_store(store_id);
  let orchestrator = Arc::new(PaymentOrchestrator::new(
    store.clone(),
    store.clone(),
    store.clone(),
    store.clone(),
    gateway.clone(),
    GatewaySecrets {
      key_secret: KEY_SECRET.to_string(),
      webhook_secret,
    },
    PricingPolicy::default(),
  ));
  Harness {
    store,
    gateway,
    orchestrator,
    store_id,
  }
}

pub fn harness() -> Harness {
  build(Some(WEBHOOK_SECRET.to_string()))
}

pub fn harness_without_webhook_secret() -> Harness {
  build(None)
}

pub fn test_config() -> AppConfig {
  AppConfig {
    server_host: "127.0.0.1".to_string(),
    server_port: 0,
    database_url: None,
    gateway_api_url: "http://localhost".to_string(),
    gateway_key_id: "test-key-id".to_string(),
    gateway_key_secret: KEY_SECRET.to_string(),
    gateway_webhook_secret: Some(WEBHOOK_SECRET.to_string()),
    gateway_timeout_ms: 1000,
    pricing: PricingPolicy::default(),
  }
}

pub fn app_state(h: &Harness) -> AppState {
  AppState {
    orchestrator: h.orchestrator.clone(),
    config: Arc::new(test_config()),
  }
}

pub fn seed_product(h: &Harness, price: i64, stock: i64) -> Uuid {
  let id = Uuid::new_v4();
  h.store.seed_product(ProductInfo {
    id,
    store_id: h.store_id,
    name: format!("Product {}", id.simple()),
    image_url: None,
    price,
    stock,
  });
  id
}

pub fn checkout_request(store_id: Uuid, items: &[(Uuid, i64)]) -> CheckoutRequest {
  CheckoutRequest {
    store_id,
    items: items
      .iter()
      .map(|(product_id, quantity)| CheckoutItem {
        product_id: *product_id,
        variant_id: None,
        quantity: *quantity,
      })
      .collect(),
    customer: CustomerContact {
      name: "Ada Buyer".to_string(),
      email: "ada@example.com".to_string(),
      phone: None,
    },
    shipping_address: Address {
      line1: "1 Test Way".to_string(),
      line2: None,
      city: "Testville".to_string(),
      state: "TS".to_string(),
      postal_code: "00000".to_string(),
      country: "US".to_string(),
    },
    billing_address: None,
  }
}

/// Checkout a single-line order and open a payment intent for it.
pub async fn checkout_and_intent(h: &Harness, product_id: Uuid, quantity: i64) -> (Order, PaymentOrderCreated) {
  let order = h
    .orchestrator
    .checkout(checkout_request(h.store_id, &[(product_id, quantity)]))
    .await
    .expect("checkout should succeed");
  let created = h
    .orchestrator
    .create_payment_order(CreatePaymentRequest {
      order_id: order.id,
      store_id: h.store_id,
      amount: order.total,
      currency: order.currency.clone(),
    })
    .await
    .expect("payment intent should open");
  (order, created)
}
