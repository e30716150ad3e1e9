//! Laundry API Library
//!
//! Accounts with roles, a per-kilogram service catalog and an order ledger,
//! served as a JSON API behind a role gate.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod seed;
pub mod services;
pub mod tracing;

use axum::{
    routing::{delete, get, post, put},
    Extension, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::auth::{AuthConfig, AuthRouterExt, AuthService, Role, ORDER_STATUS_EDITORS};
use crate::db::DbPool;
use crate::services::AppServices;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub auth: Arc<AuthService>,
    pub services: AppServices,
}

impl AppState {
    pub fn new(db: DbPool, config: config::AppConfig) -> Self {
        let db = Arc::new(db);
        Self {
            auth: Arc::new(AuthService::new(AuthConfig::from(&config))),
            services: AppServices::new(db.clone()),
            db,
            config,
        }
    }
}

// Common response wrappers
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[test]
    fn message_is_attached_to_success() {
        let response = ApiResponse::success(1).with_message("Order placed");
        assert!(response.success);
        assert_eq!(response.message.as_deref(), Some("Order placed"));
    }
}

/// Every route, gated by role, with request-id, tracing and auth layers applied.
pub fn app_router(state: AppState) -> Router {
    let open = Router::new()
        .route("/", get(handlers::pages::home))
        .route("/about", get(handlers::pages::about))
        .route("/services", get(handlers::catalog::list_services))
        .route("/auth/register", post(handlers::auth::register))
        .route(
            "/auth/login",
            get(handlers::auth::login_hint).post(handlers::auth::login),
        )
        .route("/status", get(health::api_status))
        .route("/health", get(health::health_check));

    let authenticated = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        .with_auth();

    let customer = Router::new()
        .route(
            "/dashboard/customer",
            get(handlers::dashboards::customer_dashboard),
        )
        .route("/account/address", put(handlers::accounts::update_address))
        .route("/orders", post(handlers::orders::place_order))
        .with_role(Role::Customer);

    let staff = Router::new()
        .route("/dashboard/staff", get(handlers::dashboards::staff_dashboard))
        .with_role(Role::Staff);

    let status_editors = Router::new()
        .route(
            "/orders/:id/status",
            put(handlers::orders::update_order_status),
        )
        .with_roles(ORDER_STATUS_EDITORS);

    let admin = Router::new()
        .route("/dashboard/admin", get(handlers::dashboards::admin_dashboard))
        .route("/orders/:id", delete(handlers::orders::delete_order))
        .route(
            "/admin/services/:id/price",
            put(handlers::admin::update_service_price),
        )
        .route(
            "/admin/maintenance/orphans",
            post(handlers::admin::cleanup_orphans),
        )
        .with_role(Role::Admin);

    let auth_service = state.auth.clone();

    Router::new()
        .merge(open)
        .merge(authenticated)
        .merge(customer)
        .merge(staff)
        .merge(status_editors)
        .merge(admin)
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Inject AuthService into request extensions for auth middleware
        .layer(Extension(auth_service))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

/// What the startup maintenance pass did
#[derive(Debug, Default, Serialize)]
pub struct StartupReport {
    pub migrated: bool,
    pub seed: Option<seed::SeedReport>,
    pub orphans_removed: Option<u64>,
}

/// One-shot startup work: migrations, seeding and orphan cleanup, each per config.
pub async fn prepare_database(state: &AppState) -> Result<StartupReport, errors::ServiceError> {
    let mut report = StartupReport::default();

    if state.config.auto_migrate {
        db::run_migrations(&state.db).await?;
        report.migrated = true;
    }
    if state.config.seed_defaults {
        report.seed = Some(seed::seed_defaults(&state.services, &state.config).await?);
    }
    if state.config.cleanup_orphans_on_startup {
        report.orphans_removed = Some(state.services.orders.cleanup_orphans().await?);
    }

    ::tracing::info!(?report, "startup maintenance complete");
    Ok(report)
}
