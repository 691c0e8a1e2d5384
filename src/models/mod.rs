// src/models/mod.rs

pub mod order;
pub mod transaction;

pub use order::{Address, CustomerContact, Order, OrderItem, OrderStatus, PaymentStatus};
pub use transaction::{Transaction, TransactionStatus};
