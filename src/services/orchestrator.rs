// src/services/orchestrator.rs

//! The order/payment orchestrator: the one place that coordinates the
//! inventory ledger, the order and transaction stores and the payment
//! gateway across the three entry points that can race on the same order
//! (checkout, client confirmation, webhook delivery).
//!
//! Every Order/Transaction mutation here is an idempotent set with a
//! precedence guard (`apply` on the status enums), so repeated delivery of
//! the same logical event converges to the same final state. The only
//! compensating action is releasing inventory reserved earlier in a failed
//! checkout; payment failure deliberately never releases stock.

use crate::config::PricingPolicy;
use crate::errors::{AppError, Result, StockShortage};
use crate::gateway::{signature, GatewayOrderRequest, PaymentGateway};
use crate::models::{Address, CustomerContact, Order, OrderItem, OrderStatus, PaymentStatus, Transaction, TransactionStatus};
use crate::services::order_number;
use crate::stores::{InventoryLedger, OrderStore, ProductCatalog, ReserveOutcome, TransactionStore};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const DEFAULT_CURRENCY: &str = "USD";

// --- Request / response DTOs ---

#[derive(Debug, Deserialize)]
pub struct CheckoutItem {
  pub product_id: Uuid,
  #[serde(default)]
  pub variant_id: Option<Uuid>,
  pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
  pub store_id: Uuid,
  pub items: Vec<CheckoutItem>,
  pub customer: CustomerContact,
  pub shipping_address: Address,
  /// Falls back to the shipping address when omitted.
  #[serde(default)]
  pub billing_address: Option<Address>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
  pub order_id: Uuid,
  pub store_id: Uuid,
  pub amount: i64,
  pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentOrderCreated {
  pub transaction_id: Uuid,
  pub gateway_order_ref: String,
  pub amount: i64,
  pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
  pub gateway_order_ref: String,
  pub gateway_payment_ref: String,
  pub signature: String,
}

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
  pub transaction_id: Uuid,
  #[serde(default)]
  pub amount: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RefundResult {
  pub transaction_id: Uuid,
  pub refund_reference: String,
  pub status: String,
}

// --- Webhook event payloads (provider wire format) ---

#[derive(Debug, Deserialize)]
struct WebhookEvent {
  event: String,
  #[serde(default)]
  payload: WebhookPayload,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookPayload {
  payment: Option<Wrapped<PaymentEntity>>,
  refund: Option<Wrapped<RefundEntity>>,
}

#[derive(Debug, Deserialize)]
struct Wrapped<T> {
  entity: T,
}

#[derive(Debug, Deserialize)]
struct PaymentEntity {
  id: String,
  order_id: String,
  #[serde(default)]
  method: Option<String>,
  #[serde(default)]
  email: Option<String>,
  #[serde(default)]
  contact: Option<String>,
  #[serde(default)]
  error_code: Option<String>,
  #[serde(default)]
  error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefundEntity {
  #[allow(dead_code)]
  id: String,
  payment_id: String,
}

/// Secrets for the two HMAC surfaces, split out of `AppConfig` so tests can
/// construct an orchestrator without touching the environment.
#[derive(Debug, Clone)]
pub struct GatewaySecrets {
  pub key_secret: String,
  /// Webhook processing refuses traffic until this is configured.
  pub webhook_secret: Option<String>,
}

pub struct PaymentOrchestrator {
  orders: Arc<dyn OrderStore>,
  transactions: Arc<dyn TransactionStore>,
  catalog: Arc<dyn ProductCatalog>,
  inventory: Arc<dyn InventoryLedger>,
  gateway: Arc<dyn PaymentGateway>,
  secrets: GatewaySecrets,
  pricing: PricingPolicy,
}

impl PaymentOrchestrator {
  pub fn new(
    orders: Arc<dyn OrderStore>,
    transactions: Arc<dyn TransactionStore>,
    catalog: Arc<dyn ProductCatalog>,
    inventory: Arc<dyn InventoryLedger>,
    gateway: Arc<dyn PaymentGateway>,
    secrets: GatewaySecrets,
    pricing: PricingPolicy,
  ) -> Self {
    Self {
      orders,
      transactions,
      catalog,
      inventory,
      gateway,
      secrets,
      pricing,
    }
  }

  /// Best-effort rollback of reservations acquired earlier in a failed
  /// checkout. A release failure here leaks a reservation rather than the
  /// inverse, so it is logged and skipped.
  async fn release_all(&self, reserved: &[(Uuid, i64)]) {
    for (product_id, qty) in reserved {
      if let Err(err) = self.inventory.release(*product_id, *qty).await {
        warn!(%product_id, qty, error = %err, "Failed to roll back reservation");
      }
    }
  }

  /// Checkout: reserve stock line by line, snapshot prices, persist the
  /// order as pending/pending. No payment happens here.
  #[instrument(name = "orchestrator::checkout", skip(self, request), fields(store_id = %request.store_id))]
  pub async fn checkout(&self, request: CheckoutRequest) -> Result<Order> {
    if request.items.is_empty() {
      return Err(AppError::Validation("Order must contain at least one line item".to_string()));
    }
    if request.items.iter().any(|item| item.quantity < 1) {
      return Err(AppError::Validation("Line item quantity must be at least 1".to_string()));
    }
    if !self.catalog.store_exists(request.store_id).await? {
      return Err(AppError::NotFound(format!("Store {} not found", request.store_id)));
    }

    let mut reserved: Vec<(Uuid, i64)> = Vec::new();
    let mut lines: Vec<OrderItem> = Vec::with_capacity(request.items.len());
    for item in &request.items {
      let product = match self.catalog.product(item.product_id).await {
        Ok(Some(product)) if product.store_id == request.store_id => product,
        Ok(_) => {
          self.release_all(&reserved).await;
          return Err(AppError::NotFound(format!("Product {} not found", item.product_id)));
        }
        Err(err) => {
          self.release_all(&reserved).await;
          return Err(err);
        }
      };
      match self.inventory.reserve(item.product_id, item.quantity).await {
        Ok(ReserveOutcome::Reserved) => reserved.push((item.product_id, item.quantity)),
        Ok(ReserveOutcome::Insufficient { available }) => {
          self.release_all(&reserved).await;
          return Err(AppError::InsufficientStock(vec![StockShortage {
            product_id: item.product_id,
            requested: item.quantity,
            available,
          }]));
        }
        Err(err) => {
          self.release_all(&reserved).await;
          return Err(err);
        }
      }
      lines.push(OrderItem {
        product_id: item.product_id,
        variant_id: item.variant_id,
        quantity: item.quantity,
        unit_price: product.price,
        line_total: product.price * item.quantity,
        name: product.name,
        image_url: product.image_url,
      });
    }

    let subtotal: i64 = lines.iter().map(|line| line.line_total).sum();
    let tax = subtotal * i64::from(self.pricing.tax_rate_bps) / 10_000;
    let shipping = self.pricing.shipping_flat;
    let discount = 0;
    let now = Utc::now();
    let billing_address = request.billing_address.unwrap_or_else(|| request.shipping_address.clone());
    let order = Order {
      id: Uuid::new_v4(),
      store_id: request.store_id,
      order_number: order_number::generate(),
      items: lines,
      customer: request.customer,
      shipping_address: request.shipping_address,
      billing_address,
      subtotal,
      tax,
      shipping,
      discount,
      total: subtotal + tax + shipping - discount,
      currency: DEFAULT_CURRENCY.to_string(),
      status: OrderStatus::Pending,
      payment_status: PaymentStatus::Pending,
      transaction_id: None,
      gateway_order_ref: None,
      created_at: now,
      updated_at: now,
    };

    if let Err(err) = self.orders.insert(&order).await {
      self.release_all(&reserved).await;
      return Err(err);
    }
    info!(order_id = %order.id, order_number = %order.order_number, total = order.total, "Order created");
    Ok(order)
  }

  /// Open a payment intent for an order. An already-open (live) transaction
  /// for the order is returned as-is: at most one live transaction may exist
  /// per order. Gateway failure creates nothing and is retryable.
  #[instrument(name = "orchestrator::create_payment_order", skip(self, request), fields(order_id = %request.order_id))]
  pub async fn create_payment_order(&self, request: CreatePaymentRequest) -> Result<PaymentOrderCreated> {
    if request.amount <= 0 {
      return Err(AppError::Validation("Amount must be greater than zero".to_string()));
    }
    if request.currency.trim().is_empty() {
      return Err(AppError::Validation("Currency is required".to_string()));
    }
    let order = self
      .orders
      .fetch(request.order_id)
      .await?
      .filter(|order| order.store_id == request.store_id)
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", request.order_id)))?;

    if let Some(existing) = self.transactions.find_live_for_order(order.id).await? {
      info!(transaction_id = %existing.id, "Re-using open payment intent for order");
      return Ok(PaymentOrderCreated {
        transaction_id: existing.id,
        gateway_order_ref: existing.gateway_order_ref,
        amount: existing.amount,
        currency: existing.currency,
      });
    }

    if request.amount != order.total {
      warn!(requested = request.amount, order_total = order.total, "Payment amount differs from order total");
    }

    let gateway_order = self
      .gateway
      .create_order(&GatewayOrderRequest {
        amount: request.amount,
        currency: request.currency.clone(),
        receipt: order.order_number.clone(),
      })
      .await?;

    let txn = Transaction::open(
      order.id,
      order.store_id,
      request.amount,
      request.currency,
      gateway_order.reference,
    );
    // The store arbitrates concurrent intent creation: whichever insert
    // loses gets the winner's row back and abandons its gateway order.
    let live = self.transactions.insert_unless_live(&txn).await?;
    if live.id == txn.id {
      info!(transaction_id = %txn.id, gateway_order_ref = %txn.gateway_order_ref, "Payment intent opened");
    } else {
      warn!(
        transaction_id = %live.id,
        abandoned_gateway_order_ref = %txn.gateway_order_ref,
        "Concurrent intent creation raced; re-using the winning transaction"
      );
    }
    Ok(PaymentOrderCreated {
      transaction_id: live.id,
      gateway_order_ref: live.gateway_order_ref,
      amount: live.amount,
      currency: live.currency,
    })
  }

  /// Client-side payment confirmation. The signature is checked before any
  /// lookup; on success the transaction is captured and the order marked
  /// paid, both as idempotent sets. This path is not authoritative on its
  /// own: the webhook reconciles the cases where the client never calls
  /// back.
  #[instrument(name = "orchestrator::verify_payment", skip_all, fields(gateway_order_ref = %request.gateway_order_ref))]
  pub async fn verify_payment(&self, request: VerifyPaymentRequest) -> Result<Order> {
    if request.gateway_order_ref.is_empty() || request.gateway_payment_ref.is_empty() || request.signature.is_empty() {
      return Err(AppError::Validation("InvalidPaymentVerificationParameters".to_string()));
    }
    if !signature::verify_payment_signature(
      &self.secrets.key_secret,
      &request.gateway_order_ref,
      &request.gateway_payment_ref,
      &request.signature,
    ) {
      return Err(AppError::InvalidSignature);
    }

    let mut txn = self
      .transactions
      .fetch_by_gateway_order_ref(&request.gateway_order_ref)
      .await?
      .ok_or_else(|| {
        AppError::NotFound(format!(
          "Transaction for gateway order {} not found",
          request.gateway_order_ref
        ))
      })?;

    txn.status = txn.status.apply(TransactionStatus::Captured);
    txn.gateway_payment_ref = Some(request.gateway_payment_ref.clone());
    txn.signature = Some(request.signature);

    // Best effort: a gateway hiccup fetching method/contact must not undo a
    // verified capture.
    match self.gateway.fetch_payment(&request.gateway_payment_ref).await {
      Ok(details) => {
        txn.method = details.method.or(txn.method);
        txn.email = details.email.or(txn.email);
        txn.contact = details.contact.or(txn.contact);
      }
      Err(err) => {
        warn!(error = %err, "Could not fetch payment details after capture");
      }
    }
    self.transactions.update(&txn).await?;

    let order = self
      .orders
      .fetch(txn.order_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", txn.order_id)))?;
    let next = order.payment_status.apply(PaymentStatus::Paid);
    self
      .orders
      .set_payment_state(order.id, next, Some(txn.id), Some(txn.gateway_order_ref.clone()))
      .await?;
    info!(order_id = %order.id, transaction_id = %txn.id, "Payment verified and captured");

    self
      .orders
      .fetch(order.id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order.id)))
  }

  /// Webhook reconciliation. Signature verification over the raw body runs
  /// before any storage read; once it passes, every outcome acknowledges the
  /// event so the provider stops retrying — a retry of an already-processed
  /// event converges to the same state.
  #[instrument(name = "orchestrator::process_webhook", skip_all)]
  pub async fn process_webhook(&self, body: &[u8], supplied_signature: &str) -> Result<()> {
    let secret = self
      .secrets
      .webhook_secret
      .as_deref()
      .ok_or_else(|| AppError::Config("GATEWAY_WEBHOOK_SECRET is not configured".to_string()))?;
    if !signature::verify_webhook_signature(secret, body, supplied_signature) {
      return Err(AppError::InvalidSignature);
    }

    let event: WebhookEvent = match serde_json::from_slice(body) {
      Ok(event) => event,
      Err(err) => {
        // A retry cannot fix a malformed body; acknowledge and move on.
        warn!(error = %err, "Webhook body did not parse; acknowledging");
        return Ok(());
      }
    };

    match event.event.as_str() {
      "payment.captured" => self.webhook_payment_captured(event.payload).await,
      "payment.failed" => self.webhook_payment_failed(event.payload).await,
      "refund.created" => self.webhook_refund_created(event.payload).await,
      other => {
        debug!(event = other, "Ignoring unhandled webhook event type");
        Ok(())
      }
    }
  }

  async fn webhook_payment_captured(&self, payload: WebhookPayload) -> Result<()> {
    let Some(payment) = payload.payment.map(|wrapped| wrapped.entity) else {
      warn!("payment.captured event without payment entity; acknowledging");
      return Ok(());
    };
    let Some(mut txn) = self.transactions.fetch_by_gateway_order_ref(&payment.order_id).await? else {
      // Captures can arrive before the intent is recorded locally or race
      // the client-confirmation path; acknowledged as a no-op.
      info!(gateway_order_ref = %payment.order_id, "Capture for unknown transaction; acknowledging");
      return Ok(());
    };

    txn.status = txn.status.apply(TransactionStatus::Captured);
    if txn.gateway_payment_ref.is_none() {
      txn.gateway_payment_ref = Some(payment.id);
    }
    txn.method = payment.method.or(txn.method);
    txn.email = payment.email.or(txn.email);
    txn.contact = payment.contact.or(txn.contact);
    self.transactions.update(&txn).await?;

    match self.orders.fetch(txn.order_id).await? {
      Some(order) => {
        let next = order.payment_status.apply(PaymentStatus::Paid);
        self
          .orders
          .set_payment_state(order.id, next, Some(txn.id), Some(txn.gateway_order_ref.clone()))
          .await?;
        info!(order_id = %order.id, "Webhook capture reconciled");
      }
      None => warn!(order_id = %txn.order_id, "Transaction references a missing order"),
    }
    Ok(())
  }

  async fn webhook_payment_failed(&self, payload: WebhookPayload) -> Result<()> {
    let Some(payment) = payload.payment.map(|wrapped| wrapped.entity) else {
      warn!("payment.failed event without payment entity; acknowledging");
      return Ok(());
    };
    let Some(mut txn) = self.transactions.fetch_by_gateway_order_ref(&payment.order_id).await? else {
      info!(gateway_order_ref = %payment.order_id, "Failure for unknown transaction; acknowledging");
      return Ok(());
    };

    // Captured (and refunded) outrank failed: a late failure event for an
    // attempt that already captured is dropped.
    if txn.status.apply(TransactionStatus::Failed) != TransactionStatus::Failed {
      info!(transaction_id = %txn.id, status = ?txn.status, "Dropping late payment.failed event");
      return Ok(());
    }
    txn.status = TransactionStatus::Failed;
    if txn.gateway_payment_ref.is_none() {
      txn.gateway_payment_ref = Some(payment.id);
    }
    txn.error_code = payment.error_code;
    txn.error_description = payment.error_description;
    self.transactions.update(&txn).await?;

    match self.orders.fetch(txn.order_id).await? {
      Some(order) => {
        // A failed payment does not auto-cancel the order and does not
        // release its reservations.
        let next = order.payment_status.apply(PaymentStatus::Failed);
        self.orders.set_payment_state(order.id, next, None, None).await?;
        info!(order_id = %order.id, "Webhook payment failure recorded");
      }
      None => warn!(order_id = %txn.order_id, "Transaction references a missing order"),
    }
    Ok(())
  }

  async fn webhook_refund_created(&self, payload: WebhookPayload) -> Result<()> {
    let Some(refund) = payload.refund.map(|wrapped| wrapped.entity) else {
      warn!("refund.created event without refund entity; acknowledging");
      return Ok(());
    };
    let Some(mut txn) = self.transactions.fetch_by_gateway_payment_ref(&refund.payment_id).await? else {
      info!(gateway_payment_ref = %refund.payment_id, "Refund for unknown transaction; acknowledging");
      return Ok(());
    };

    txn.status = txn.status.apply(TransactionStatus::Refunded);
    self.transactions.update(&txn).await?;

    match self.orders.fetch(txn.order_id).await? {
      Some(order) => {
        let next = order.payment_status.apply(PaymentStatus::Refunded);
        self.orders.set_payment_state(order.id, next, None, None).await?;
        self.orders.set_status(order.id, OrderStatus::Refunded).await?;
        info!(order_id = %order.id, "Webhook refund reconciled");
      }
      None => warn!(order_id = %txn.order_id, "Transaction references a missing order"),
    }
    Ok(())
  }

  /// Refund a captured payment. State is only mutated after the gateway
  /// accepts the refund; inventory is deliberately not re-credited here
  /// (restocking is an explicit, separate operation).
  #[instrument(name = "orchestrator::refund", skip(self), fields(%transaction_id))]
  pub async fn refund(&self, transaction_id: Uuid, amount: Option<i64>) -> Result<RefundResult> {
    let mut txn = self
      .transactions
      .fetch(transaction_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found", transaction_id)))?;

    let payment_ref = match (&txn.gateway_payment_ref, txn.status) {
      (Some(payment_ref), TransactionStatus::Captured) => payment_ref.clone(),
      _ => return Err(AppError::NoPaymentToRefund),
    };
    if let Some(amount) = amount {
      if amount <= 0 || amount > txn.amount {
        return Err(AppError::Validation("Refund amount must be positive and at most the captured amount".to_string()));
      }
    }

    let refund = self.gateway.refund(&payment_ref, amount).await?;

    txn.status = txn.status.apply(TransactionStatus::Refunded);
    self.transactions.update(&txn).await?;
    let next = match self.orders.fetch(txn.order_id).await? {
      Some(order) => order.payment_status.apply(PaymentStatus::Refunded),
      None => PaymentStatus::Refunded,
    };
    self.orders.set_payment_state(txn.order_id, next, None, None).await?;
    self.orders.set_status(txn.order_id, OrderStatus::Refunded).await?;
    info!(order_id = %txn.order_id, refund_reference = %refund.reference, "Refund issued");

    Ok(RefundResult {
      transaction_id: txn.id,
      refund_reference: refund.reference,
      status: refund.status,
    })
  }

  /// Staff-driven fulfillment transition. Cancellation is the one place
  /// reserved stock is released back to the ledger.
  #[instrument(name = "orchestrator::update_order_status", skip(self), fields(%order_id, ?next))]
  pub async fn update_order_status(&self, order_id: Uuid, next: OrderStatus) -> Result<Order> {
    let order = self
      .orders
      .fetch(order_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
    if !order.status.staff_can_set(next) {
      return Err(AppError::Validation(format!(
        "Order cannot move from {:?} to {:?}",
        order.status, next
      )));
    }

    if next == OrderStatus::Cancelled {
      for item in &order.items {
        if let Err(err) = self.inventory.release(item.product_id, item.quantity).await {
          warn!(product_id = %item.product_id, error = %err, "Failed to restock cancelled line item");
        }
      }
    }
    self.orders.set_status(order_id, next).await?;
    info!(from = ?order.status, to = ?next, "Order status updated");

    self
      .orders
      .fetch(order_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))
  }
}
