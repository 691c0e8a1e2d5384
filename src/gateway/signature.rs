// src/gateway/signature.rs

//! HMAC-SHA256 signatures for the two gateway surfaces: the client-submitted
//! payment confirmation (signed over `"{order_ref}|{payment_ref}"` with the
//! API key secret) and webhook bodies (signed over the raw bytes with the
//! webhook secret). Verification is constant-time via `Mac::verify_slice`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &str) -> HmacSha256 {
  HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size")
}

fn verify(secret: &str, message: &[u8], supplied_hex: &str) -> bool {
  let Ok(supplied) = hex::decode(supplied_hex) else {
    return false;
  };
  let mut mac = mac_for(secret);
  mac.update(message);
  mac.verify_slice(&supplied).is_ok()
}

/// Hex HMAC over `"{order_ref}|{payment_ref}"`, the value a well-behaved
/// client submits after completing a payment.
pub fn payment_signature(secret: &str, order_ref: &str, payment_ref: &str) -> String {
  let mut mac = mac_for(secret);
  mac.update(format!("{}|{}", order_ref, payment_ref).as_bytes());
  hex::encode(mac.finalize().into_bytes())
}

pub fn verify_payment_signature(secret: &str, order_ref: &str, payment_ref: &str, supplied_hex: &str) -> bool {
  verify(
    secret,
    format!("{}|{}", order_ref, payment_ref).as_bytes(),
    supplied_hex,
  )
}

/// Hex HMAC over a raw webhook body.
pub fn webhook_signature(secret: &str, body: &[u8]) -> String {
  let mut mac = mac_for(secret);
  mac.update(body);
  hex::encode(mac.finalize().into_bytes())
}

pub fn verify_webhook_signature(secret: &str, body: &[u8], supplied_hex: &str) -> bool {
  verify(secret, body, supplied_hex)
}
