pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod services;

use axum::{
    Router,
    http::Method,
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::services::{AssignmentEngine, PaymentLedger};

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Config,
    pub ledger: PaymentLedger,
    pub engine: AssignmentEngine,
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any);

    let api = Router::new()
        .route("/payment/pay", post(handlers::payments::pay))
        .route("/payment/vendor", get(handlers::payments::vendor_payments))
        .route("/payment/history", get(handlers::payments::payment_history))
        .route("/payment/admin/all", get(handlers::payments::admin_payments))
        .route("/tasks/assign", post(handlers::tasks::assign))
        .route("/tasks/my-tasks", get(handlers::tasks::my_tasks))
        .route("/tasks/all", get(handlers::tasks::all_tasks))
        .route("/tasks/vendor-orders", get(handlers::tasks::vendor_orders))
        .route("/tasks/update/:task_id", patch(handlers::tasks::update_status))
        .route(
            "/tasks/mark-delivered/:task_id",
            patch(handlers::tasks::mark_delivered),
        )
        .route("/tasks/:task_id", delete(handlers::tasks::unassign))
        .route(
            "/notifications",
            post(handlers::notifications::create).get(handlers::notifications::my_notifications),
        )
        .route(
            "/notifications/:id/read",
            patch(handlers::notifications::mark_read),
        )
        .route(
            "/notifications/read-all",
            patch(handlers::notifications::mark_all_read),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .layer(cors)
        .with_state(state)
}
