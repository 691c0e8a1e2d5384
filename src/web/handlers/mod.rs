// src/web/handlers/mod.rs

pub mod order_handlers;
pub mod payment_handlers;
pub mod webhook_handlers;

use actix_web::{FromRequest, HttpRequest};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;

// --- Custom Extractor for Staff Identity (Placeholder) ---
// Real authentication (sessions, JWTs) belongs to the platform's auth
// collaborator; this service only needs to know a staff identity was
// asserted. A header stands in for it.
#[derive(Debug)]
pub struct StaffUser {
  pub staff_id: Uuid,
}

impl FromRequest for StaffUser {
  type Error = AppError;
  type Future = futures_util::future::Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    if let Some(staff_id_header) = req.headers().get("X-Staff-Id") {
      if let Ok(staff_id_str) = staff_id_header.to_str() {
        if let Ok(staff_id) = Uuid::parse_str(staff_id_str) {
          return futures_util::future::ready(Ok(StaffUser { staff_id }));
        }
      }
    }
    warn!("StaffUser extractor: Missing or invalid X-Staff-Id header.");
    futures_util::future::ready(Err(AppError::Authorization(
      "Staff identity required. Missing or invalid X-Staff-Id header.".to_string(),
    )))
  }
}
