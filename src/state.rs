// src/state.rs

use crate::config::AppConfig;
use crate::services::PaymentOrchestrator;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub orchestrator: Arc<PaymentOrchestrator>,
  pub config: Arc<AppConfig>,
}
