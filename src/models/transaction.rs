// src/models/transaction.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type as SqlxType;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "transaction_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
  Created,
  Authorized,
  Captured,
  Failed,
  Refunded,
}

impl TransactionStatus {
  /// A transaction in one of these states blocks opening a second payment
  /// attempt for the same order.
  pub fn is_live(self) -> bool {
    matches!(
      self,
      TransactionStatus::Created | TransactionStatus::Authorized | TransactionStatus::Captured
    )
  }

  /// Merge an incoming state change, mirroring [`PaymentStatus::apply`]:
  /// `Captured` wins over a later `Failed` for the same attempt, `Refunded`
  /// is terminal, everything else is a plain set.
  ///
  /// [`PaymentStatus::apply`]: crate::models::PaymentStatus::apply
  pub fn apply(self, next: TransactionStatus) -> TransactionStatus {
    match (self, next) {
      (TransactionStatus::Refunded, _) => TransactionStatus::Refunded,
      (TransactionStatus::Captured, TransactionStatus::Failed) => TransactionStatus::Captured,
      (TransactionStatus::Captured, TransactionStatus::Created)
      | (TransactionStatus::Captured, TransactionStatus::Authorized) => TransactionStatus::Captured,
      (_, next) => next,
    }
  }
}

/// The audit trail of one payment attempt against an order. Exactly one
/// row per gateway order reference; refunds mutate the row rather than
/// adding a new one.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
  pub id: Uuid,
  pub order_id: Uuid,
  pub store_id: Uuid,
  pub amount: i64,
  pub currency: String,
  pub status: TransactionStatus,
  pub gateway_order_ref: String,
  /// Set once a payment attempt succeeds or fails against the intent.
  pub gateway_payment_ref: Option<String>,
  /// Stored for audit only; never re-checked after the initial verification.
  pub signature: Option<String>,
  pub method: Option<String>,
  pub email: Option<String>,
  pub contact: Option<String>,
  pub error_code: Option<String>,
  pub error_description: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Transaction {
  pub fn open(order_id: Uuid, store_id: Uuid, amount: i64, currency: String, gateway_order_ref: String) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      order_id,
      store_id,
      amount,
      currency,
      status: TransactionStatus::Created,
      gateway_order_ref,
      gateway_payment_ref: None,
      signature: None,
      method: None,
      email: None,
      contact: None,
      error_code: None,
      error_description: None,
      created_at: now,
      updated_at: now,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn captured_is_sticky_against_failed() {
    assert_eq!(
      TransactionStatus::Captured.apply(TransactionStatus::Failed),
      TransactionStatus::Captured
    );
    assert_eq!(
      TransactionStatus::Failed.apply(TransactionStatus::Captured),
      TransactionStatus::Captured
    );
  }

  #[test]
  fn refunded_is_terminal() {
    assert_eq!(
      TransactionStatus::Refunded.apply(TransactionStatus::Captured),
      TransactionStatus::Refunded
    );
  }

  #[test]
  fn live_states() {
    assert!(TransactionStatus::Created.is_live());
    assert!(TransactionStatus::Captured.is_live());
    assert!(!TransactionStatus::Failed.is_live());
    assert!(!TransactionStatus::Refunded.is_live());
  }
}
