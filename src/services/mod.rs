// src/services/mod.rs

pub mod order_number;
pub mod orchestrator;

pub use orchestrator::PaymentOrchestrator;
