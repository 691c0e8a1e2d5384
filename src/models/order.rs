// src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type as SqlxType;
use uuid::Uuid;

/// Fulfillment state, advanced by staff action only. Payment state lives in
/// [`PaymentStatus`] and moves independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Confirmed,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
  Refunded,
}

impl OrderStatus {
  fn forward_rank(self) -> Option<u8> {
    match self {
      OrderStatus::Pending => Some(0),
      OrderStatus::Confirmed => Some(1),
      OrderStatus::Processing => Some(2),
      OrderStatus::Shipped => Some(3),
      OrderStatus::Delivered => Some(4),
      OrderStatus::Cancelled | OrderStatus::Refunded => None,
    }
  }

  /// Whether a staff status update may move an order from `self` to `next`.
  ///
  /// Forward moves are intentionally permissive (confirmed straight to
  /// delivered is fine), cancellation is only possible before shipment, and
  /// `Refunded` is never reachable from here — only the refund operation
  /// sets it.
  pub fn staff_can_set(self, next: OrderStatus) -> bool {
    if next == OrderStatus::Refunded {
      return false;
    }
    let Some(from) = self.forward_rank() else {
      // Cancelled and refunded orders are terminal for staff updates.
      return false;
    };
    match next.forward_rank() {
      Some(to) => to > from,
      // next == Cancelled
      None => matches!(
        self,
        OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Processing
      ),
    }
  }
}

/// Payment state, advanced only by the orchestrator in response to gateway
/// confirmation or webhook events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Pending,
  Paid,
  Failed,
  Refunded,
}

impl PaymentStatus {
  /// Merge an incoming state change into the current state.
  ///
  /// Transitions are idempotent sets, so re-applying the current value is a
  /// no-op, and precedence resolves races between the client-confirmation
  /// path and webhook delivery: `Paid` is sticky against a late `Failed`
  /// (a late capture after a failed attempt is allowed the other way
  /// around), and `Refunded` is terminal.
  pub fn apply(self, next: PaymentStatus) -> PaymentStatus {
    match (self, next) {
      (PaymentStatus::Refunded, _) => PaymentStatus::Refunded,
      (PaymentStatus::Paid, PaymentStatus::Failed) => PaymentStatus::Paid,
      (_, next) => next,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
  pub line1: String,
  #[serde(default)]
  pub line2: Option<String>,
  pub city: String,
  pub state: String,
  pub postal_code: String,
  pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerContact {
  pub name: String,
  pub email: String,
  #[serde(default)]
  pub phone: Option<String>,
}

/// One line of an order, snapshotted at checkout time. Price and display
/// fields are copies: later catalog edits never change what was sold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
  pub product_id: Uuid,
  #[serde(default)]
  pub variant_id: Option<Uuid>,
  pub quantity: i64,
  /// Unit price at purchase, minor currency units.
  pub unit_price: i64,
  pub line_total: i64,
  pub name: String,
  #[serde(default)]
  pub image_url: Option<String>,
}

/// The purchase record. Created once by checkout; afterwards only the two
/// status fields and the payment back-references ever change.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
  pub id: Uuid,
  pub store_id: Uuid,
  pub order_number: String,
  pub items: Vec<OrderItem>,
  pub customer: CustomerContact,
  pub shipping_address: Address,
  pub billing_address: Address,
  pub subtotal: i64,
  pub tax: i64,
  pub shipping: i64,
  pub discount: i64,
  /// subtotal + tax + shipping - discount, fixed at creation.
  pub total: i64,
  pub currency: String,
  pub status: OrderStatus,
  pub payment_status: PaymentStatus,
  /// Weak back-reference to the live transaction, set once payment starts.
  pub transaction_id: Option<Uuid>,
  pub gateway_order_ref: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn staff_may_move_forward_and_skip_steps() {
    assert!(OrderStatus::Pending.staff_can_set(OrderStatus::Confirmed));
    assert!(OrderStatus::Confirmed.staff_can_set(OrderStatus::Delivered));
    assert!(!OrderStatus::Shipped.staff_can_set(OrderStatus::Processing));
    assert!(!OrderStatus::Pending.staff_can_set(OrderStatus::Pending));
  }

  #[test]
  fn cancellation_only_before_shipment() {
    assert!(OrderStatus::Pending.staff_can_set(OrderStatus::Cancelled));
    assert!(OrderStatus::Processing.staff_can_set(OrderStatus::Cancelled));
    assert!(!OrderStatus::Shipped.staff_can_set(OrderStatus::Cancelled));
    assert!(!OrderStatus::Cancelled.staff_can_set(OrderStatus::Confirmed));
  }

  #[test]
  fn refunded_unreachable_by_staff() {
    assert!(!OrderStatus::Delivered.staff_can_set(OrderStatus::Refunded));
    assert!(!OrderStatus::Refunded.staff_can_set(OrderStatus::Delivered));
  }

  #[test]
  fn payment_status_precedence() {
    assert_eq!(
      PaymentStatus::Pending.apply(PaymentStatus::Paid),
      PaymentStatus::Paid
    );
    // late capture after a failed attempt
    assert_eq!(
      PaymentStatus::Failed.apply(PaymentStatus::Paid),
      PaymentStatus::Paid
    );
    // a late failure must not downgrade a capture
    assert_eq!(
      PaymentStatus::Paid.apply(PaymentStatus::Failed),
      PaymentStatus::Paid
    );
    assert_eq!(
      PaymentStatus::Refunded.apply(PaymentStatus::Paid),
      PaymentStatus::Refunded
    );
  }
}
