// src/web/routes.rs

use actix_web::web;

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

// Called from `main` (and the webhook tests) to configure the Actix App.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/orders")
          .route("", web::post().to(crate::web::handlers::order_handlers::create_order_handler))
          .route(
            "/{order_id}/status",
            web::put().to(crate::web::handlers::order_handlers::update_order_status_handler),
          ),
      )
      .service(
        web::scope("/payment")
          .route(
            "/create-order",
            web::post().to(crate::web::handlers::payment_handlers::create_payment_order_handler),
          )
          .route(
            "/verify",
            web::post().to(crate::web::handlers::payment_handlers::verify_payment_handler),
          )
          .route(
            "/refund",
            web::post().to(crate::web::handlers::payment_handlers::refund_handler),
          )
          .route(
            "/webhook",
            web::post().to(crate::web::handlers::webhook_handlers::payment_webhook_handler),
          ),
      ),
  );
}
