// tests/payment.rs

mod common;

use common::{checkout_and_intent, checkout_request, harness, seed_product};
use storefront_orders::errors::AppError;
use storefront_orders::gateway::signature;
use storefront_orders::models::{OrderStatus, PaymentStatus, TransactionStatus};
use storefront_orders::services::orchestrator::{CreatePaymentRequest, VerifyPaymentRequest};
use storefront_orders::stores::{OrderStore, TransactionStore};
use std::time::Duration;
use uuid::Uuid;

fn verify_request(order_ref: &str, payment_ref: &str) -> VerifyPaymentRequest {
  VerifyPaymentRequest {
    gateway_order_ref: order_ref.to_string(),
    gateway_payment_ref: payment_ref.to_string(),
    signature: signature::payment_signature(common::KEY_SECRET, order_ref, payment_ref),
  }
}

#[tokio::test]
async fn payment_intent_creates_a_single_live_transaction() {
  let h = harness();
  let product = seed_product(&h, 500, 5);
  let (order, created) = checkout_and_intent(&h, product, 1).await;

  let txn = TransactionStore::fetch(h.store.as_ref(), created.transaction_id).await.unwrap().unwrap();
  assert_eq!(txn.status, TransactionStatus::Created);
  assert_eq!(txn.order_id, order.id);
  assert_eq!(txn.amount, order.total);
  assert_eq!(txn.gateway_order_ref, created.gateway_order_ref);

  // the order itself is still unpaid
  let order = OrderStore::fetch(h.store.as_ref(), order.id).await.unwrap().unwrap();
  assert_eq!(order.payment_status, PaymentStatus::Pending);

  // a second create re-uses the open intent instead of opening another
  let again = h
    .orchestrator
    .create_payment_order(CreatePaymentRequest {
      order_id: order.id,
      store_id: h.store_id,
      amount: order.total,
      currency: order.currency.clone(),
    })
    .await
    .unwrap();
  assert_eq!(again.transaction_id, created.transaction_id);
  assert_eq!(again.gateway_order_ref, created.gateway_order_ref);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_intent_creation_opens_exactly_one_transaction() {
  let h = harness();
  let product = seed_product(&h, 500, 5);
  let order = h
    .orchestrator
    .checkout(checkout_request(h.store_id, &[(product, 1)]))
    .await
    .unwrap();

  // widen the gateway round-trip so both callers pass the live-check
  // before either insert lands
  h.gateway.delay_create_order(Duration::from_millis(50));

  let mut handles = Vec::new();
  for _ in 0..2 {
    let orchestrator = h.orchestrator.clone();
    let request = CreatePaymentRequest {
      order_id: order.id,
      store_id: h.store_id,
      amount: order.total,
      currency: order.currency.clone(),
    };
    handles.push(tokio::spawn(async move { orchestrator.create_payment_order(request).await }));
  }

  let mut results = Vec::new();
  for handle in handles {
    results.push(handle.await.unwrap().unwrap());
  }
  assert_eq!(results[0].transaction_id, results[1].transaction_id);
  assert_eq!(results[0].gateway_order_ref, results[1].gateway_order_ref);

  let live = h.store.find_live_for_order(order.id).await.unwrap().unwrap();
  assert_eq!(live.id, results[0].transaction_id);
}

#[tokio::test]
async fn gateway_outage_leaves_no_transaction_and_is_retryable() {
  let h = harness();
  let product = seed_product(&h, 500, 5);
  let order = h
    .orchestrator
    .checkout(checkout_request(h.store_id, &[(product, 1)]))
    .await
    .unwrap();

  h.gateway.fail_create_order(true);
  let err = h
    .orchestrator
    .create_payment_order(CreatePaymentRequest {
      order_id: order.id,
      store_id: h.store_id,
      amount: order.total,
      currency: order.currency.clone(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::Gateway(_)));
  assert!(h.store.find_live_for_order(order.id).await.unwrap().is_none());
  // stock stays reserved while the order is pending payment
  assert_eq!(h.store.stock_of(product), Some(4));

  // the retry succeeds once the provider recovers
  h.gateway.fail_create_order(false);
  h.orchestrator
    .create_payment_order(CreatePaymentRequest {
      order_id: order.id,
      store_id: h.store_id,
      amount: order.total,
      currency: order.currency.clone(),
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn verify_marks_order_paid_and_is_idempotent() {
  let h = harness();
  let product = seed_product(&h, 500, 5);
  let (order, created) = checkout_and_intent(&h, product, 2).await;

  let request = verify_request(&created.gateway_order_ref, "pay_001");
  let paid = h
    .orchestrator
    .verify_payment(VerifyPaymentRequest {
      gateway_order_ref: request.gateway_order_ref.clone(),
      gateway_payment_ref: request.gateway_payment_ref.clone(),
      signature: request.signature.clone(),
    })
    .await
    .unwrap();
  assert_eq!(paid.payment_status, PaymentStatus::Paid);
  assert_eq!(paid.transaction_id, Some(created.transaction_id));
  assert_eq!(paid.gateway_order_ref.as_deref(), Some(created.gateway_order_ref.as_str()));

  let txn = TransactionStore::fetch(h.store.as_ref(), created.transaction_id).await.unwrap().unwrap();
  assert_eq!(txn.status, TransactionStatus::Captured);
  assert_eq!(txn.gateway_payment_ref.as_deref(), Some("pay_001"));
  assert_eq!(txn.method.as_deref(), Some("card"));

  // the same payload again converges to the same state
  let paid_again = h.orchestrator.verify_payment(request).await.unwrap();
  assert_eq!(paid_again.payment_status, PaymentStatus::Paid);
  assert_eq!(paid_again.transaction_id, Some(created.transaction_id));
  assert_eq!(order.id, paid_again.id);
}

#[tokio::test]
async fn verify_rejects_a_bad_signature_without_touching_state() {
  let h = harness();
  let product = seed_product(&h, 500, 5);
  let (order, created) = checkout_and_intent(&h, product, 1).await;

  let err = h
    .orchestrator
    .verify_payment(VerifyPaymentRequest {
      gateway_order_ref: created.gateway_order_ref.clone(),
      gateway_payment_ref: "pay_001".to_string(),
      signature: signature::payment_signature("wrong-secret", &created.gateway_order_ref, "pay_001"),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::InvalidSignature));

  let txn = TransactionStore::fetch(h.store.as_ref(), created.transaction_id).await.unwrap().unwrap();
  assert_eq!(txn.status, TransactionStatus::Created);
  let order = OrderStore::fetch(h.store.as_ref(), order.id).await.unwrap().unwrap();
  assert_eq!(order.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn verify_validates_parameters_before_the_signature() {
  let h = harness();
  let err = h
    .orchestrator
    .verify_payment(VerifyPaymentRequest {
      gateway_order_ref: String::new(),
      gateway_payment_ref: "pay_001".to_string(),
      signature: "sig".to_string(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn verify_for_an_unknown_intent_is_not_found() {
  let h = harness();
  let err = h
    .orchestrator
    .verify_payment(verify_request("order_missing", "pay_001"))
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn verify_survives_a_failed_details_fetch() {
  let h = harness();
  let product = seed_product(&h, 500, 5);
  let (_, created) = checkout_and_intent(&h, product, 1).await;

  h.gateway.fail_fetch_payment(true);
  let paid = h
    .orchestrator
    .verify_payment(verify_request(&created.gateway_order_ref, "pay_001"))
    .await
    .unwrap();
  assert_eq!(paid.payment_status, PaymentStatus::Paid);

  let txn = TransactionStore::fetch(h.store.as_ref(), created.transaction_id).await.unwrap().unwrap();
  assert_eq!(txn.status, TransactionStatus::Captured);
  assert_eq!(txn.method, None);
}

#[tokio::test]
async fn refund_flows_through_gateway_and_terminalizes_the_order() {
  let h = harness();
  let product = seed_product(&h, 500, 5);
  let (order, created) = checkout_and_intent(&h, product, 1).await;
  h.orchestrator
    .verify_payment(verify_request(&created.gateway_order_ref, "pay_001"))
    .await
    .unwrap();

  let result = h.orchestrator.refund(created.transaction_id, None).await.unwrap();
  assert_eq!(result.transaction_id, created.transaction_id);
  assert_eq!(result.status, "processed");

  let txn = TransactionStore::fetch(h.store.as_ref(), created.transaction_id).await.unwrap().unwrap();
  assert_eq!(txn.status, TransactionStatus::Refunded);
  let order = OrderStore::fetch(h.store.as_ref(), order.id).await.unwrap().unwrap();
  assert_eq!(order.payment_status, PaymentStatus::Refunded);
  assert_eq!(order.status, OrderStatus::Refunded);
  // refunds do not restock
  assert_eq!(h.store.stock_of(product), Some(4));
}

#[tokio::test]
async fn refund_without_a_captured_payment_changes_nothing() {
  let h = harness();
  let product = seed_product(&h, 500, 5);
  let (order, created) = checkout_and_intent(&h, product, 1).await;

  let err = h.orchestrator.refund(created.transaction_id, None).await.unwrap_err();
  assert!(matches!(err, AppError::NoPaymentToRefund));

  let order = OrderStore::fetch(h.store.as_ref(), order.id).await.unwrap().unwrap();
  assert_eq!(order.payment_status, PaymentStatus::Pending);
  assert_eq!(order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn refund_rejects_unknown_transactions_and_bad_amounts() {
  let h = harness();
  let product = seed_product(&h, 500, 5);
  let (_, created) = checkout_and_intent(&h, product, 1).await;
  h.orchestrator
    .verify_payment(verify_request(&created.gateway_order_ref, "pay_001"))
    .await
    .unwrap();

  let err = h.orchestrator.refund(Uuid::new_v4(), None).await.unwrap_err();
  assert!(matches!(err, AppError::NotFound(_)));

  let txn = TransactionStore::fetch(h.store.as_ref(), created.transaction_id).await.unwrap().unwrap();
  let err = h
    .orchestrator
    .refund(created.transaction_id, Some(txn.amount + 1))
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::Validation(_)));

  // gateway refusal leaves the transaction captured
  h.gateway.fail_refund(true);
  let err = h.orchestrator.refund(created.transaction_id, None).await.unwrap_err();
  assert!(matches!(err, AppError::Gateway(_)));
  let txn = TransactionStore::fetch(h.store.as_ref(), created.transaction_id).await.unwrap().unwrap();
  assert_eq!(txn.status, TransactionStatus::Captured);
}
