// src/main.rs

use storefront_orders::config::AppConfig;
use storefront_orders::gateway::rest::RestGateway;
use storefront_orders::gateway::PaymentGateway;
use storefront_orders::services::orchestrator::{GatewaySecrets, PaymentOrchestrator};
use storefront_orders::state::AppState;
use storefront_orders::stores::memory::MemoryStore;
use storefront_orders::stores::postgres::PgStore;
use storefront_orders::stores::{InventoryLedger, OrderStore, ProductCatalog, TransactionStore};
use storefront_orders::web::routes::configure_app_routes;

use actix_web::{web, App, HttpServer};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

struct Stores {
  orders: Arc<dyn OrderStore>,
  transactions: Arc<dyn TransactionStore>,
  catalog: Arc<dyn ProductCatalog>,
  inventory: Arc<dyn InventoryLedger>,
}

fn postgres_stores(pool: PgPool) -> Stores {
  let store = Arc::new(PgStore::new(pool));
  Stores {
    orders: store.clone(),
    transactions: store.clone(),
    catalog: store.clone(),
    inventory: store,
  }
}

fn memory_stores() -> Stores {
  let store = Arc::new(MemoryStore::new());
  Stores {
    orders: store.clone(),
    transactions: store.clone(),
    catalog: store.clone(),
    inventory: store,
  }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting storefront order/payment service...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      panic!("Configuration error: {}", e);
    }
  };

  let stores = match &app_config.database_url {
    Some(database_url) => match PgPool::connect(database_url).await {
      Ok(pool) => {
        tracing::info!("Successfully connected to the database.");
        postgres_stores(pool)
      }
      Err(e) => {
        tracing::error!(error = %e, "Failed to connect to the database.");
        panic!("Database connection error: {}", e);
      }
    },
    None => {
      tracing::warn!("DATABASE_URL is not set; running with in-memory stores.");
      memory_stores()
    }
  };

  // The gateway client is built exactly once and injected; handlers never
  // construct their own.
  let gateway: Arc<dyn PaymentGateway> = match RestGateway::new(&app_config) {
    Ok(gateway) => Arc::new(gateway),
    Err(e) => {
      tracing::error!(error = %e, "Failed to build the payment gateway client.");
      panic!("Gateway client error: {}", e);
    }
  };

  let orchestrator = Arc::new(PaymentOrchestrator::new(
    stores.orders,
    stores.transactions,
    stores.catalog,
    stores.inventory,
    gateway,
    GatewaySecrets {
      key_secret: app_config.gateway_key_secret.clone(),
      webhook_secret: app_config.gateway_webhook_secret.clone(),
    },
    app_config.pricing.clone(),
  ));

  let app_state = AppState {
    orchestrator,
    config: app_config.clone(),
  };

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(web::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
