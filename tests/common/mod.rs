#![allow(dead_code)]

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use laundry_api::{
    auth::Role,
    config::{AppConfig, DEV_DEFAULT_ADMIN_PASSWORD},
    db, AppState,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_PASSWORD: &str = "correct-horse-9";

/// Helper harness for spinning up an application backed by a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _db_dir: TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh, migrated and seeded database state.
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir for test database");
        let db_path = db_dir.path().join("laundry_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            "test".to_string(),
        );
        // A single connection keeps per-connection PRAGMAs in effect across calls.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");

        let state = AppState::new(pool, cfg);
        laundry_api::prepare_database(&state)
            .await
            .expect("startup maintenance in tests");

        let router = laundry_api::app_router(state.clone());

        Self {
            router,
            state,
            _db_dir: db_dir,
        }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn register(&self, username: &str, role: &str) -> Response {
        self.request(
            Method::POST,
            "/auth/register",
            Some(json!({
                "username": username,
                "password": TEST_PASSWORD,
                "confirm_password": TEST_PASSWORD,
                "role": role,
            })),
            None,
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.request(
            Method::POST,
            "/auth/login",
            Some(json!({ "username": username, "password": password })),
            None,
        )
        .await
    }

    /// Registers (or, for admin, uses the seeded account) and returns a bearer token.
    pub async fn token_for(&self, username: &str, role: Role) -> String {
        let password = match role {
            Role::Admin => DEV_DEFAULT_ADMIN_PASSWORD,
            Role::Customer | Role::Staff => {
                let response = self.register(username, role.as_ref()).await;
                assert_eq!(response.status(), StatusCode::CREATED, "register {username}");
                TEST_PASSWORD
            }
        };
        let login_name = match role {
            Role::Admin => self.state.config.admin_username.as_str(),
            _ => username,
        };

        let response = self.login(login_name, password).await;
        assert_eq!(response.status(), StatusCode::OK, "login {login_name}");
        let body = response_json(response).await;
        body["data"]["access_token"]
            .as_str()
            .expect("access token in login response")
            .to_string()
    }

    pub async fn service_id(&self, name: &str) -> i32 {
        self.state
            .services
            .catalog
            .list()
            .await
            .expect("list catalog")
            .into_iter()
            .find(|s| s.name == name)
            .unwrap_or_else(|| panic!("service {name} seeded"))
            .id
    }

    pub async fn place_order(&self, token: &str, service_id: i32, kilograms: f64) -> Response {
        self.request(
            Method::POST,
            "/orders",
            Some(json!({ "service_id": service_id, "kilograms": kilograms })),
            Some(token),
        )
        .await
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Decimals serialize as strings; accept numbers too.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("expected decimal, got {other}"),
    }
}
