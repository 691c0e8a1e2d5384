// src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "X-Gateway-Signature";

/// Gateway webhook endpoint. The body is taken raw: the signature covers the
/// exact bytes on the wire, so it must be verified before any parsing.
/// Once the signature checks out, the orchestrator acknowledges every
/// outcome (including unknown transactions and event types) so the gateway
/// stops retrying.
#[instrument(
  name = "handler::payment_webhook",
  skip(app_state, req, body),
  fields(payload_bytes = body.len())
)]
pub async fn payment_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  let signature = req
    .headers()
    .get(SIGNATURE_HEADER)
    .and_then(|header| header.to_str().ok())
    .ok_or(AppError::InvalidSignature)?;

  app_state.orchestrator.process_webhook(&body, signature).await?;
  info!("Webhook acknowledged");
  Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })))
}
