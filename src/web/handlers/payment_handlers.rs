// src/web/handlers/payment_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::instrument;

use crate::errors::AppError;
use crate::services::orchestrator::{CreatePaymentRequest, RefundRequest, VerifyPaymentRequest};
use crate::state::AppState;

#[instrument(
  name = "handler::create_payment_order",
  skip(app_state, payload),
  fields(order_id = %payload.order_id, amount = payload.amount)
)]
pub async fn create_payment_order_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CreatePaymentRequest>,
) -> Result<HttpResponse, AppError> {
  let created = app_state.orchestrator.create_payment_order(payload.into_inner()).await?;
  Ok(HttpResponse::Created().json(created))
}

#[instrument(
  name = "handler::verify_payment",
  skip(app_state, payload),
  fields(gateway_order_ref = %payload.gateway_order_ref)
)]
pub async fn verify_payment_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<VerifyPaymentRequest>,
) -> Result<HttpResponse, AppError> {
  let order = app_state.orchestrator.verify_payment(payload.into_inner()).await?;
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(
  name = "handler::refund",
  skip(app_state, payload),
  fields(transaction_id = %payload.transaction_id)
)]
pub async fn refund_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<RefundRequest>,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let result = app_state.orchestrator.refund(payload.transaction_id, payload.amount).await?;
  Ok(HttpResponse::Ok().json(result))
}
