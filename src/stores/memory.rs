// src/stores/memory.rs

//! In-memory implementation of every storage trait, used by the test suite
//! and by local development without a database. Each method takes one lock
//! acquisition, which is what makes `reserve` a true atomic
//! check-and-decrement.

use crate::errors::{AppError, Result};
use crate::models::{Order, OrderStatus, PaymentStatus, Transaction};
use crate::stores::{InventoryLedger, OrderStore, ProductCatalog, ProductInfo, ReserveOutcome, TransactionStore};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
  stores: HashSet<Uuid>,
  products: HashMap<Uuid, ProductInfo>,
  orders: HashMap<Uuid, Order>,
  transactions: HashMap<Uuid, Transaction>,
}

#[derive(Default)]
pub struct MemoryStore {
  inner: Mutex<Inner>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn seed_store(&self, store_id: Uuid) {
    self.inner.lock().stores.insert(store_id);
  }

  pub fn seed_product(&self, product: ProductInfo) {
    let mut inner = self.inner.lock();
    inner.stores.insert(product.store_id);
    inner.products.insert(product.id, product);
  }

  /// Current stock counter, for assertions in tests.
  pub fn stock_of(&self, product_id: Uuid) -> Option<i64> {
    self.inner.lock().products.get(&product_id).map(|p| p.stock)
  }
}

#[async_trait]
impl ProductCatalog for MemoryStore {
  async fn product(&self, product_id: Uuid) -> Result<Option<ProductInfo>> {
    Ok(self.inner.lock().products.get(&product_id).cloned())
  }

  async fn store_exists(&self, store_id: Uuid) -> Result<bool> {
    Ok(self.inner.lock().stores.contains(&store_id))
  }
}

#[async_trait]
impl InventoryLedger for MemoryStore {
  async fn reserve(&self, product_id: Uuid, qty: i64) -> Result<ReserveOutcome> {
    let mut inner = self.inner.lock();
    match inner.products.get_mut(&product_id) {
      Some(product) if product.stock >= qty => {
        product.stock -= qty;
        Ok(ReserveOutcome::Reserved)
      }
      Some(product) => Ok(ReserveOutcome::Insufficient {
        available: product.stock,
      }),
      None => Ok(ReserveOutcome::Insufficient { available: 0 }),
    }
  }

  async fn release(&self, product_id: Uuid, qty: i64) -> Result<()> {
    let mut inner = self.inner.lock();
    match inner.products.get_mut(&product_id) {
      Some(product) => {
        product.stock += qty;
        Ok(())
      }
      None => Err(AppError::NotFound(format!("Product {} not found", product_id))),
    }
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  async fn insert(&self, order: &Order) -> Result<()> {
    self.inner.lock().orders.insert(order.id, order.clone());
    Ok(())
  }

  async fn fetch(&self, order_id: Uuid) -> Result<Option<Order>> {
    Ok(self.inner.lock().orders.get(&order_id).cloned())
  }

  async fn set_status(&self, order_id: Uuid, status: OrderStatus) -> Result<()> {
    let mut inner = self.inner.lock();
    let order = inner
      .orders
      .get_mut(&order_id)
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
    order.status = status;
    order.updated_at = Utc::now();
    Ok(())
  }

  async fn set_payment_state(
    &self,
    order_id: Uuid,
    payment_status: PaymentStatus,
    transaction_id: Option<Uuid>,
    gateway_order_ref: Option<String>,
  ) -> Result<()> {
    let mut inner = self.inner.lock();
    let order = inner
      .orders
      .get_mut(&order_id)
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
    order.payment_status = payment_status;
    if transaction_id.is_some() {
      order.transaction_id = transaction_id;
    }
    if gateway_order_ref.is_some() {
      order.gateway_order_ref = gateway_order_ref;
    }
    order.updated_at = Utc::now();
    Ok(())
  }
}

#[async_trait]
impl TransactionStore for MemoryStore {
  async fn insert_unless_live(&self, txn: &Transaction) -> Result<Transaction> {
    let mut inner = self.inner.lock();
    if let Some(existing) = inner
      .transactions
      .values()
      .find(|t| t.order_id == txn.order_id && t.status.is_live())
    {
      return Ok(existing.clone());
    }
    inner.transactions.insert(txn.id, txn.clone());
    Ok(txn.clone())
  }

  async fn fetch(&self, transaction_id: Uuid) -> Result<Option<Transaction>> {
    Ok(self.inner.lock().transactions.get(&transaction_id).cloned())
  }

  async fn fetch_by_gateway_order_ref(&self, gateway_order_ref: &str) -> Result<Option<Transaction>> {
    Ok(
      self
        .inner
        .lock()
        .transactions
        .values()
        .find(|t| t.gateway_order_ref == gateway_order_ref)
        .cloned(),
    )
  }

  async fn fetch_by_gateway_payment_ref(&self, gateway_payment_ref: &str) -> Result<Option<Transaction>> {
    Ok(
      self
        .inner
        .lock()
        .transactions
        .values()
        .find(|t| t.gateway_payment_ref.as_deref() == Some(gateway_payment_ref))
        .cloned(),
    )
  }

  async fn find_live_for_order(&self, order_id: Uuid) -> Result<Option<Transaction>> {
    Ok(
      self
        .inner
        .lock()
        .transactions
        .values()
        .find(|t| t.order_id == order_id && t.status.is_live())
        .cloned(),
    )
  }

  async fn update(&self, txn: &Transaction) -> Result<()> {
    let mut inner = self.inner.lock();
    match inner.transactions.get_mut(&txn.id) {
      Some(existing) => {
        *existing = txn.clone();
        existing.updated_at = Utc::now();
        Ok(())
      }
      None => Err(AppError::NotFound(format!("Transaction {} not found", txn.id))),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn product(stock: i64) -> ProductInfo {
    ProductInfo {
      id: Uuid::new_v4(),
      store_id: Uuid::new_v4(),
      name: "Test product".to_string(),
      image_url: None,
      price: 500,
      stock,
    }
  }

  #[tokio::test]
  async fn reserve_decrements_and_refuses_overdraw() {
    let store = MemoryStore::new();
    let p = product(3);
    let id = p.id;
    store.seed_product(p);

    assert_eq!(store.reserve(id, 2).await.unwrap(), ReserveOutcome::Reserved);
    assert_eq!(
      store.reserve(id, 2).await.unwrap(),
      ReserveOutcome::Insufficient { available: 1 }
    );
    assert_eq!(store.stock_of(id), Some(1));

    store.release(id, 2).await.unwrap();
    assert_eq!(store.stock_of(id), Some(3));
  }

  #[tokio::test]
  async fn reserve_unknown_product_reports_zero_available() {
    let store = MemoryStore::new();
    assert_eq!(
      store.reserve(Uuid::new_v4(), 1).await.unwrap(),
      ReserveOutcome::Insufficient { available: 0 }
    );
  }

  #[tokio::test]
  async fn insert_unless_live_keeps_one_live_transaction_per_order() {
    use crate::models::TransactionStatus;

    let store = MemoryStore::new();
    let order_id = Uuid::new_v4();
    let store_id = Uuid::new_v4();
    let first = Transaction::open(order_id, store_id, 1000, "USD".to_string(), "order_a".to_string());
    let second = Transaction::open(order_id, store_id, 1000, "USD".to_string(), "order_b".to_string());

    let winner = store.insert_unless_live(&first).await.unwrap();
    assert_eq!(winner.id, first.id);

    // the second insert yields the already-live row instead of a duplicate
    let live = store.insert_unless_live(&second).await.unwrap();
    assert_eq!(live.id, first.id);
    assert!(TransactionStore::fetch(&store, second.id).await.unwrap().is_none());

    // once the live row settles, a fresh intent may open
    let mut settled = first.clone();
    settled.status = TransactionStatus::Failed;
    store.update(&settled).await.unwrap();
    let reopened = store.insert_unless_live(&second).await.unwrap();
    assert_eq!(reopened.id, second.id);
  }
}
