#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use chrono::Utc;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use storefront_api::{
    app::app,
    config::AppConfig,
    entity::users::{self, UserRole},
    services::auth_service::hash_password,
    session::issue_token,
    state::AppState,
};

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".into(),
        database_max_connections: 1,
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "integration-test-secret-at-least-32-bytes".into(),
        jwt_ttl_hours: 24,
        cookie_secure: false,
        cors_origin: None,
    }
}

pub fn empty_db() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres).into_connection()
}

pub fn test_app(db: DatabaseConnection) -> Router {
    app(AppState::new(db, test_config()))
}

pub fn user_model(email: &str, password: &str, role: UserRole) -> users::Model {
    let now = Utc::now().fixed_offset();
    users::Model {
        id: Uuid::new_v4(),
        email: email.to_string(),
        password_hash: hash_password(password).expect("hash"),
        name: "Test User".into(),
        phone: None,
        address: None,
        role,
        created_at: now,
        updated_at: now,
    }
}

/// Stored account without a usable password, for session-only tests.
pub fn account(role: UserRole) -> users::Model {
    let now = Utc::now().fixed_offset();
    let id = Uuid::new_v4();
    users::Model {
        id,
        email: format!("{id}@example.com"),
        password_hash: "unused".into(),
        name: "Session User".into(),
        phone: None,
        address: None,
        role,
        created_at: now,
        updated_at: now,
    }
}

/// `Cookie` header value carrying a token for `user_id` that claims `role`.
pub fn session_cookie(user_id: Uuid, role: UserRole) -> String {
    let token = issue_token(&test_config(), user_id, role).expect("token");
    format!("token={token}")
}

/// Session cookie for `user` plus a database whose first lookup returns that user.
pub fn signed_in(user: users::Model) -> (String, MockDatabase) {
    let cookie = session_cookie(user.id, user.role);
    let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![user]]);
    (cookie, db)
}

pub fn json_request(method: &str, uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request")
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}
