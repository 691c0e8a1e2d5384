// src/services/order_number.rs

use uuid::Uuid;

/// Human-readable order number, unique across all stores without a
/// coordination point. A UUIDv4 payload makes collisions a non-concern even
/// under concurrent checkouts on separate instances.
pub fn generate() -> String {
  format!("ORD-{}", Uuid::new_v4().simple().to_string().to_uppercase())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  #[test]
  fn order_numbers_do_not_collide() {
    let numbers: HashSet<String> = (0..1000).map(|_| generate()).collect();
    assert_eq!(numbers.len(), 1000);
    assert!(numbers.iter().all(|n| n.starts_with("ORD-")));
  }
}
