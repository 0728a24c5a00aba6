mod common;

use axum::http::{StatusCode, header};
use chrono::Utc;
use sea_orm::{DatabaseBackend, MockDatabase};
use serde_json::json;
use uuid::Uuid;

use common::{
    account, empty_db, get_request, json_request, send, session_cookie, signed_in, test_app,
    user_model,
};
use storefront_api::entity::{categories, products, users, users::UserRole};

#[tokio::test]
async fn health_endpoint_sets_request_id() {
    let (status, headers, body) = send(test_app(empty_db()), get_request("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn unknown_path_gets_json_not_found() {
    let (status, _, body) = send(test_app(empty_db()), get_request("/api/nope", None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not Found");
    assert_eq!(body["data"]["path"], "/api/nope");
}

#[tokio::test]
async fn session_without_cookie_is_unauthorized() {
    let (status, _, body) =
        send(test_app(empty_db()), get_request("/api/auth/session", None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].as_str().unwrap_or_default().starts_with("Unauthorized"));
}

#[tokio::test]
async fn tampered_cookie_is_unauthorized() {
    let (status, _, _) = send(
        test_app(empty_db()),
        get_request("/api/account", Some("token=not-a-jwt")),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_require_a_session() {
    let (status, _, _) = send(test_app(empty_db()), get_request("/api/admin/users", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_reject_customers() {
    let (cookie, db) = signed_in(account(UserRole::Customer));
    let (status, _, body) = send(
        test_app(db.into_connection()),
        get_request("/api/admin/stats", Some(&cookie)),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Forbidden");
}

#[tokio::test]
async fn customer_cannot_create_products() {
    let (cookie, db) = signed_in(account(UserRole::Customer));
    let payload = json!({ "name": "Nope", "price": 100, "stock": 1 });
    let (status, _, _) = send(
        test_app(db.into_connection()),
        json_request("POST", "/api/admin/products", payload, Some(&cookie)),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn register_rejects_invalid_input() {
    let app = test_app(empty_db());

    let bad_email = json!({ "email": "not-an-email", "password": "long-enough", "name": "A" });
    let (status, _, _) = send(
        app.clone(),
        json_request("POST", "/api/auth/register", bad_email, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let short_password = json!({ "email": "a@example.com", "password": "short", "name": "A" });
    let (status, _, _) = send(
        app,
        json_request("POST", "/api/auth/register", short_password, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_with_taken_email_conflicts() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![user_model(
            "taken@example.com",
            "password123",
            UserRole::Customer,
        )]])
        .into_connection();

    let payload = json!({ "email": "Taken@Example.com", "password": "password123", "name": "Dup" });
    let (status, headers, _) = send(
        test_app(db),
        json_request("POST", "/api/auth/register", payload, None),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(!headers.contains_key(header::SET_COOKIE));
}

#[tokio::test]
async fn login_sets_http_only_session_cookie() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![user_model(
            "shopper@example.com",
            "password123",
            UserRole::Customer,
        )]])
        .into_connection();

    let payload = json!({ "email": "shopper@example.com", "password": "password123" });
    let (status, headers, body) = send(
        test_app(db),
        json_request("POST", "/api/auth/login", payload, None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "shopper@example.com");
    assert!(body["data"].get("password_hash").is_none());

    let cookie = headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("set-cookie");
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![user_model(
            "shopper@example.com",
            "password123",
            UserRole::Customer,
        )]])
        .into_connection();

    let payload = json!({ "email": "shopper@example.com", "password": "wrong-password" });
    let (status, headers, _) = send(
        test_app(db),
        json_request("POST", "/api/auth/login", payload, None),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(!headers.contains_key(header::SET_COOKIE));
}

#[tokio::test]
async fn logout_expires_the_cookie() {
    let (status, headers, _) = send(
        test_app(empty_db()),
        json_request("POST", "/api/auth/logout", json!({}), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let cookie = headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("set-cookie");
    assert!(cookie.starts_with("token=;"));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn empty_order_is_rejected() {
    let (cookie, db) = signed_in(account(UserRole::Customer));
    let payload = json!({ "items": [], "shipping_address": "1 Main St" });
    let (status, _, _) = send(
        test_app(db.into_connection()),
        json_request("POST", "/api/orders", payload, Some(&cookie)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_requires_a_session() {
    let payload = json!({
        "items": [{ "product_id": Uuid::new_v4(), "quantity": 1 }],
        "shipping_address": "1 Main St"
    });
    let (status, _, _) = send(
        test_app(empty_db()),
        json_request("POST", "/api/orders", payload, None),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn review_rating_out_of_range_is_rejected() {
    let (cookie, db) = signed_in(account(UserRole::Customer));
    let uri = format!("/api/products/{}/reviews", Uuid::new_v4());
    let (status, _, _) = send(
        test_app(db.into_connection()),
        json_request("POST", &uri, json!({ "rating": 6 }), Some(&cookie)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_product_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<products::Model>::new()])
        .into_connection();

    let uri = format!("/api/products/{}", Uuid::new_v4());
    let (status, _, _) = send(test_app(db), get_request(&uri, None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bearer_header_is_accepted_as_a_session() {
    let (cookie, db) = signed_in(account(UserRole::Customer));
    let token = cookie.trim_start_matches("token=");
    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/api/admin/stats")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(axum::body::Body::empty())
        .expect("request");

    // Authenticated but not an admin: 403 rather than 401.
    let (status, _, _) = send(test_app(db.into_connection()), request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn demoted_admin_token_is_forbidden() {
    let demoted = account(UserRole::Customer);
    // Token still claims admin; the stored role wins.
    let cookie = session_cookie(demoted.id, UserRole::Admin);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![demoted]])
        .into_connection();

    let (status, _, body) = send(test_app(db), get_request("/api/admin/stats", Some(&cookie))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Forbidden");
}

#[tokio::test]
async fn deleted_account_session_is_unauthorized() {
    let cookie = session_cookie(Uuid::new_v4(), UserRole::Admin);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<users::Model>::new()])
        .into_connection();

    let (status, _, body) = send(test_app(db), get_request("/api/account", Some(&cookie))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["data"]["error"], body["message"]);
}

#[tokio::test]
async fn malformed_json_body_gets_error_envelope() {
    let payload = json!({ "email": "someone@example.com", "name": "No Password" });
    let (status, headers, body) = send(
        test_app(empty_db()),
        json_request("POST", "/api/auth/register", payload, None),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("application/json"));
    assert!(body["message"].as_str().unwrap_or_default().starts_with("Bad Request"));
    assert!(body["data"]["error"].is_string());
}

#[tokio::test]
async fn invalid_path_id_is_bad_request() {
    let (status, _, body) = send(
        test_app(empty_db()),
        get_request("/api/products/not-a-uuid", None),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap_or_default().starts_with("Bad Request"));
}

#[tokio::test]
async fn unknown_order_status_filter_is_bad_request() {
    let (cookie, db) = signed_in(account(UserRole::Customer));
    let (status, _, body) = send(
        test_app(db.into_connection()),
        get_request("/api/orders?status=paid", Some(&cookie)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap_or_default().starts_with("Bad Request"));
}

#[tokio::test]
async fn single_category_carries_empty_meta() {
    let category = categories::Model {
        id: Uuid::new_v4(),
        name: "Shoes".into(),
        slug: "shoes".into(),
        description: None,
        created_at: Utc::now().fixed_offset(),
    };
    let uri = format!("/api/categories/{}", category.id);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![category]])
        .into_connection();

    let (status, _, body) = send(test_app(db), get_request(&uri, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["slug"], "shoes");
    assert_eq!(body["meta"], json!({}));
}
