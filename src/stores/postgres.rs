// src/stores/postgres.rs

//! Postgres-backed stores. Every statement is row-atomic; the reservation
//! in particular is a single conditional UPDATE so the stock check and the
//! decrement cannot interleave with a concurrent checkout. See schema.sql
//! for the table definitions.

use crate::errors::{AppError, Result};
use crate::models::{Address, CustomerContact, Order, OrderItem, OrderStatus, PaymentStatus, Transaction};
use crate::stores::{InventoryLedger, OrderStore, ProductCatalog, ProductInfo, ReserveOutcome, TransactionStore};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

fn json_column<T: serde::de::DeserializeOwned>(row: &PgRow, column: &str) -> Result<T> {
  let value: serde_json::Value = row.try_get(column).map_err(AppError::Sqlx)?;
  serde_json::from_value(value).map_err(|e| AppError::Internal(format!("Corrupt {} column: {}", column, e)))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
  serde_json::to_value(value).map_err(|e| AppError::Internal(format!("Serialization failed: {}", e)))
}

fn order_from_row(row: &PgRow, items: Vec<OrderItem>) -> Result<Order> {
  let customer: CustomerContact = json_column(row, "customer")?;
  let shipping_address: Address = json_column(row, "shipping_address")?;
  let billing_address: Address = json_column(row, "billing_address")?;
  Ok(Order {
    id: row.try_get("id")?,
    store_id: row.try_get("store_id")?,
    order_number: row.try_get("order_number")?,
    items,
    customer,
    shipping_address,
    billing_address,
    subtotal: row.try_get("subtotal")?,
    tax: row.try_get("tax")?,
    shipping: row.try_get("shipping")?,
    discount: row.try_get("discount")?,
    total: row.try_get("total")?,
    currency: row.try_get("currency")?,
    status: row.try_get("status")?,
    payment_status: row.try_get("payment_status")?,
    transaction_id: row.try_get("transaction_id")?,
    gateway_order_ref: row.try_get("gateway_order_ref")?,
    created_at: row.try_get("created_at")?,
    updated_at: row.try_get("updated_at")?,
  })
}

fn item_from_row(row: &PgRow) -> Result<OrderItem> {
  Ok(OrderItem {
    product_id: row.try_get("product_id")?,
    variant_id: row.try_get("variant_id")?,
    quantity: row.try_get("quantity")?,
    unit_price: row.try_get("unit_price")?,
    line_total: row.try_get("line_total")?,
    name: row.try_get("name")?,
    image_url: row.try_get("image_url")?,
  })
}

fn transaction_from_row(row: &PgRow) -> Result<Transaction> {
  Ok(Transaction {
    id: row.try_get("id")?,
    order_id: row.try_get("order_id")?,
    store_id: row.try_get("store_id")?,
    amount: row.try_get("amount")?,
    currency: row.try_get("currency")?,
    status: row.try_get("status")?,
    gateway_order_ref: row.try_get("gateway_order_ref")?,
    gateway_payment_ref: row.try_get("gateway_payment_ref")?,
    signature: row.try_get("signature")?,
    method: row.try_get("method")?,
    email: row.try_get("email")?,
    contact: row.try_get("contact")?,
    error_code: row.try_get("error_code")?,
    error_description: row.try_get("error_description")?,
    created_at: row.try_get("created_at")?,
    updated_at: row.try_get("updated_at")?,
  })
}

const TXN_COLUMNS: &str = "id, order_id, store_id, amount, currency, status, gateway_order_ref, \
   gateway_payment_ref, signature, method, email, contact, error_code, error_description, \
   created_at, updated_at";

#[async_trait]
impl ProductCatalog for PgStore {
  async fn product(&self, product_id: Uuid) -> Result<Option<ProductInfo>> {
    let row = sqlx::query("SELECT id, store_id, name, image_url, price, stock FROM products WHERE id = $1")
      .bind(product_id)
      .fetch_optional(&self.pool)
      .await?;
    row
      .map(|row| -> Result<ProductInfo> {
        Ok(ProductInfo {
          id: row.try_get("id")?,
          store_id: row.try_get("store_id")?,
          name: row.try_get("name")?,
          image_url: row.try_get("image_url")?,
          price: row.try_get("price")?,
          stock: row.try_get("stock")?,
        })
      })
      .transpose()
  }

  async fn store_exists(&self, store_id: Uuid) -> Result<bool> {
    let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM stores WHERE id = $1")
      .bind(store_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(exists.is_some())
  }
}

#[async_trait]
impl InventoryLedger for PgStore {
  async fn reserve(&self, product_id: Uuid, qty: i64) -> Result<ReserveOutcome> {
    let result = sqlx::query("UPDATE products SET stock = stock - $2, updated_at = now() WHERE id = $1 AND stock >= $2")
      .bind(product_id)
      .bind(qty)
      .execute(&self.pool)
      .await?;
    if result.rows_affected() == 1 {
      return Ok(ReserveOutcome::Reserved);
    }
    let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
      .bind(product_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(ReserveOutcome::Insufficient {
      available: available.unwrap_or(0),
    })
  }

  async fn release(&self, product_id: Uuid, qty: i64) -> Result<()> {
    let result = sqlx::query("UPDATE products SET stock = stock + $2, updated_at = now() WHERE id = $1")
      .bind(product_id)
      .bind(qty)
      .execute(&self.pool)
      .await?;
    if result.rows_affected() == 0 {
      return Err(AppError::NotFound(format!("Product {} not found", product_id)));
    }
    Ok(())
  }
}

#[async_trait]
impl OrderStore for PgStore {
  async fn insert(&self, order: &Order) -> Result<()> {
    let mut tx = self.pool.begin().await?;
    sqlx::query(
      "INSERT INTO orders (id, store_id, order_number, customer, shipping_address, billing_address, \
       subtotal, tax, shipping, discount, total, currency, status, payment_status, transaction_id, \
       gateway_order_ref, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
    )
    .bind(order.id)
    .bind(order.store_id)
    .bind(&order.order_number)
    .bind(to_json(&order.customer)?)
    .bind(to_json(&order.shipping_address)?)
    .bind(to_json(&order.billing_address)?)
    .bind(order.subtotal)
    .bind(order.tax)
    .bind(order.shipping)
    .bind(order.discount)
    .bind(order.total)
    .bind(&order.currency)
    .bind(order.status)
    .bind(order.payment_status)
    .bind(order.transaction_id)
    .bind(&order.gateway_order_ref)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *tx)
    .await?;

    for item in &order.items {
      sqlx::query(
        "INSERT INTO order_items (order_id, product_id, variant_id, quantity, unit_price, line_total, name, image_url) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
      )
      .bind(order.id)
      .bind(item.product_id)
      .bind(item.variant_id)
      .bind(item.quantity)
      .bind(item.unit_price)
      .bind(item.line_total)
      .bind(&item.name)
      .bind(&item.image_url)
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;
    Ok(())
  }

  async fn fetch(&self, order_id: Uuid) -> Result<Option<Order>> {
    let Some(row) = sqlx::query("SELECT * FROM orders WHERE id = $1")
      .bind(order_id)
      .fetch_optional(&self.pool)
      .await?
    else {
      return Ok(None);
    };
    let item_rows = sqlx::query(
      "SELECT product_id, variant_id, quantity, unit_price, line_total, name, image_url \
       FROM order_items WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_all(&self.pool)
    .await?;
    let items = item_rows.iter().map(item_from_row).collect::<Result<Vec<_>>>()?;
    Ok(Some(order_from_row(&row, items)?))
  }

  async fn set_status(&self, order_id: Uuid, status: OrderStatus) -> Result<()> {
    let result = sqlx::query("UPDATE orders SET status = $2, updated_at = now() WHERE id = $1")
      .bind(order_id)
      .bind(status)
      .execute(&self.pool)
      .await?;
    if result.rows_affected() == 0 {
      return Err(AppError::NotFound(format!("Order {} not found", order_id)));
    }
    Ok(())
  }

  async fn set_payment_state(
    &self,
    order_id: Uuid,
    payment_status: PaymentStatus,
    transaction_id: Option<Uuid>,
    gateway_order_ref: Option<String>,
  ) -> Result<()> {
    let result = sqlx::query(
      "UPDATE orders SET payment_status = $2, \
       transaction_id = COALESCE($3, transaction_id), \
       gateway_order_ref = COALESCE($4, gateway_order_ref), \
       updated_at = now() WHERE id = $1",
    )
    .bind(order_id)
    .bind(payment_status)
    .bind(transaction_id)
    .bind(gateway_order_ref)
    .execute(&self.pool)
    .await?;
    if result.rows_affected() == 0 {
      return Err(AppError::NotFound(format!("Order {} not found", order_id)));
    }
    Ok(())
  }
}

#[async_trait]
impl TransactionStore for PgStore {
  async fn insert_unless_live(&self, txn: &Transaction) -> Result<Transaction> {
    // The partial unique index transactions_one_live_per_order arbitrates
    // concurrent inserts; the loser's row is silently skipped and the
    // winner re-fetched.
    let result = sqlx::query(
      "INSERT INTO transactions (id, order_id, store_id, amount, currency, status, gateway_order_ref, \
       gateway_payment_ref, signature, method, email, contact, error_code, error_description, \
       created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
       ON CONFLICT (order_id) WHERE status IN ('created', 'authorized', 'captured') DO NOTHING",
    )
    .bind(txn.id)
    .bind(txn.order_id)
    .bind(txn.store_id)
    .bind(txn.amount)
    .bind(&txn.currency)
    .bind(txn.status)
    .bind(&txn.gateway_order_ref)
    .bind(&txn.gateway_payment_ref)
    .bind(&txn.signature)
    .bind(&txn.method)
    .bind(&txn.email)
    .bind(&txn.contact)
    .bind(&txn.error_code)
    .bind(&txn.error_description)
    .bind(txn.created_at)
    .bind(txn.updated_at)
    .execute(&self.pool)
    .await?;
    if result.rows_affected() == 1 {
      return Ok(txn.clone());
    }
    self.find_live_for_order(txn.order_id).await?.ok_or_else(|| {
      AppError::Internal(format!(
        "Live transaction for order {} vanished during insert",
        txn.order_id
      ))
    })
  }

  async fn fetch(&self, transaction_id: Uuid) -> Result<Option<Transaction>> {
    let row = sqlx::query(&format!("SELECT {} FROM transactions WHERE id = $1", TXN_COLUMNS))
      .bind(transaction_id)
      .fetch_optional(&self.pool)
      .await?;
    row.as_ref().map(transaction_from_row).transpose()
  }

  async fn fetch_by_gateway_order_ref(&self, gateway_order_ref: &str) -> Result<Option<Transaction>> {
    let row = sqlx::query(&format!(
      "SELECT {} FROM transactions WHERE gateway_order_ref = $1",
      TXN_COLUMNS
    ))
    .bind(gateway_order_ref)
    .fetch_optional(&self.pool)
    .await?;
    row.as_ref().map(transaction_from_row).transpose()
  }

  async fn fetch_by_gateway_payment_ref(&self, gateway_payment_ref: &str) -> Result<Option<Transaction>> {
    let row = sqlx::query(&format!(
      "SELECT {} FROM transactions WHERE gateway_payment_ref = $1",
      TXN_COLUMNS
    ))
    .bind(gateway_payment_ref)
    .fetch_optional(&self.pool)
    .await?;
    row.as_ref().map(transaction_from_row).transpose()
  }

  async fn find_live_for_order(&self, order_id: Uuid) -> Result<Option<Transaction>> {
    let row = sqlx::query(&format!(
      "SELECT {} FROM transactions WHERE order_id = $1 AND status IN ('created', 'authorized', 'captured')",
      TXN_COLUMNS
    ))
    .bind(order_id)
    .fetch_optional(&self.pool)
    .await?;
    row.as_ref().map(transaction_from_row).transpose()
  }

  async fn update(&self, txn: &Transaction) -> Result<()> {
    let result = sqlx::query(
      "UPDATE transactions SET status = $2, gateway_payment_ref = $3, signature = $4, method = $5, \
       email = $6, contact = $7, error_code = $8, error_description = $9, updated_at = now() \
       WHERE id = $1",
    )
    .bind(txn.id)
    .bind(txn.status)
    .bind(&txn.gateway_payment_ref)
    .bind(&txn.signature)
    .bind(&txn.method)
    .bind(&txn.email)
    .bind(&txn.contact)
    .bind(&txn.error_code)
    .bind(&txn.error_description)
    .execute(&self.pool)
    .await?;
    if result.rows_affected() == 0 {
      return Err(AppError::NotFound(format!("Transaction {} not found", txn.id)));
    }
    Ok(())
  }
}
