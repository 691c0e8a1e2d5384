// src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::OrderStatus;
use crate::services::orchestrator::CheckoutRequest;
use crate::state::AppState;
use crate::web::handlers::StaffUser;

#[instrument(
  name = "handler::create_order",
  skip(app_state, payload),
  fields(store_id = %payload.store_id, line_items = payload.items.len())
)]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
  let order = app_state.orchestrator.checkout(payload.into_inner()).await?;
  Ok(HttpResponse::Created().json(order))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusPayload {
  pub status: OrderStatus,
}

#[instrument(
  name = "handler::update_order_status",
  skip(app_state, payload, staff),
  fields(staff_id = %staff.staff_id, order_id = %*path)
)]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  staff: StaffUser,
  path: web::Path<Uuid>,
  payload: web::Json<UpdateStatusPayload>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  info!(status = ?payload.status, "Staff status update requested");
  let order = app_state
    .orchestrator
    .update_order_status(order_id, payload.status)
    .await?;
  Ok(HttpResponse::Ok().json(order))
}
