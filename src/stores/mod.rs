// src/stores/mod.rs

//! Storage seams for the order/payment core.
//!
//! The catalog and stock counters are owned by the wider platform; this
//! service consumes them through [`ProductCatalog`] and [`InventoryLedger`].
//! Orders and transactions are owned here, behind [`OrderStore`] and
//! [`TransactionStore`]. Two implementations exist: postgres for the real
//! service and an in-memory one for tests and local development.

pub mod memory;
pub mod postgres;

use crate::errors::Result;
use crate::models::{Order, OrderStatus, PaymentStatus, Transaction};
use async_trait::async_trait;
use uuid::Uuid;

/// Catalog snapshot consumed at checkout time.
#[derive(Debug, Clone)]
pub struct ProductInfo {
  pub id: Uuid,
  pub store_id: Uuid,
  pub name: String,
  pub image_url: Option<String>,
  /// Current list price in minor currency units.
  pub price: i64,
  pub stock: i64,
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
  async fn product(&self, product_id: Uuid) -> Result<Option<ProductInfo>>;
  async fn store_exists(&self, store_id: Uuid) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
  Reserved,
  /// The check-and-decrement observed fewer units than requested; nothing
  /// was decremented.
  Insufficient { available: i64 },
}

#[async_trait]
pub trait InventoryLedger: Send + Sync {
  /// Atomically check `stock >= qty` and decrement. The check and the
  /// decrement must not be observable as separate operations by a
  /// concurrent caller on the same product.
  async fn reserve(&self, product_id: Uuid, qty: i64) -> Result<ReserveOutcome>;

  /// Add units back. Used on order cancellation and to roll back a
  /// partially reserved checkout; payment failure never releases stock.
  async fn release(&self, product_id: Uuid, qty: i64) -> Result<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn insert(&self, order: &Order) -> Result<()>;
  async fn fetch(&self, order_id: Uuid) -> Result<Option<Order>>;
  async fn set_status(&self, order_id: Uuid, status: OrderStatus) -> Result<()>;

  /// Idempotent set of the payment-side fields. `transaction_id` and
  /// `gateway_order_ref` are only written when `Some`.
  async fn set_payment_state(
    &self,
    order_id: Uuid,
    payment_status: PaymentStatus,
    transaction_id: Option<Uuid>,
    gateway_order_ref: Option<String>,
  ) -> Result<()>;
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
  /// Insert `txn` unless the order already holds a live transaction. The
  /// live-check and the insert must not be observable as separate
  /// operations by a concurrent caller on the same order. Returns the row
  /// that is live afterwards: `txn` itself, or the pre-existing row when
  /// the insert lost a race.
  async fn insert_unless_live(&self, txn: &Transaction) -> Result<Transaction>;
  async fn fetch(&self, transaction_id: Uuid) -> Result<Option<Transaction>>;
  async fn fetch_by_gateway_order_ref(&self, gateway_order_ref: &str) -> Result<Option<Transaction>>;
  async fn fetch_by_gateway_payment_ref(&self, gateway_payment_ref: &str) -> Result<Option<Transaction>>;
  /// The at-most-one transaction per order in a created/authorized/captured
  /// state, if any.
  async fn find_live_for_order(&self, order_id: Uuid) -> Result<Option<Transaction>>;
  /// Overwrite the mutable fields of an existing row.
  async fn update(&self, txn: &Transaction) -> Result<()>;
}
