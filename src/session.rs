//! Session tokens and the cookie that carries them.
//!
//! A session is an HS256 JWT holding the user id and role. Browsers get it in
//! an `HttpOnly` cookie; API clients may send it as a bearer token instead.

use axum::http::{HeaderMap, HeaderValue, header};
use chrono::{Duration, Utc};
use cookie::{Cookie, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    entity::users::UserRole,
    error::{AppError, AppResult},
};

pub const SESSION_COOKIE_NAME: &str = "token";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Claims {
    pub sub: String,
    pub role: UserRole,
    pub exp: usize,
}

pub fn issue_token(config: &AppConfig, user_id: Uuid, role: UserRole) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(config.jwt_ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_token(config: &AppConfig, token: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("Invalid or expired session".into()))
}

pub fn session_cookie(config: &AppConfig, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .path("/")
        .max_age(cookie::time::Duration::hours(config.jwt_ttl_hours))
        .build()
}

pub fn clear_session_cookie(config: &AppConfig) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .path("/")
        .max_age(cookie::time::Duration::ZERO)
        .build()
}

/// Render a cookie as a `Set-Cookie` header value.
pub fn set_cookie_header(cookie: &Cookie<'_>) -> AppResult<HeaderValue> {
    HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

/// Session token from the `token` cookie, falling back to `Authorization: Bearer`.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == SESSION_COOKIE_NAME && !c.value().is_empty())
        .map(|c| c.value().to_string());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            database_url: "postgres://unused".into(),
            database_max_connections: 1,
            host: "127.0.0.1".into(),
            port: 3000,
            jwt_secret: "test-secret-that-is-long-enough-for-hs256".into(),
            jwt_ttl_hours: 24,
            cookie_secure: false,
            cors_origin: None,
        }
    }

    #[test]
    fn issued_token_verifies_with_same_secret() {
        let config = config();
        let user_id = Uuid::new_v4();
        let token = issue_token(&config, user_id, UserRole::Admin).unwrap();

        let claims = verify_token(&config, &token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, UserRole::Admin);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = issue_token(&config(), Uuid::new_v4(), UserRole::Customer).unwrap();
        let other = AppConfig {
            jwt_secret: "a-completely-different-secret-value-here".into(),
            ..config()
        };

        let err = verify_token(&other, &token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = config();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            role: UserRole::Customer,
            exp: (Utc::now() - Duration::hours(2)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert!(verify_token(&config, &token).is_err());
    }

    #[test]
    fn session_cookie_is_http_only_and_lax() {
        let rendered = session_cookie(&config(), "abc.def.ghi".into()).to_string();
        assert!(rendered.starts_with("token=abc.def.ghi"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Max-Age=86400"));
        assert!(!rendered.contains("Secure"));
    }

    #[test]
    fn secure_flag_follows_config() {
        let config = AppConfig {
            cookie_secure: true,
            ..config()
        };
        assert!(session_cookie(&config, "t".into()).to_string().contains("Secure"));
    }

    #[test]
    fn cleared_cookie_expires_immediately() {
        let rendered = clear_session_cookie(&config()).to_string();
        assert!(rendered.starts_with("token=;"));
        assert!(rendered.contains("Max-Age=0"));
    }

    #[test]
    fn cookie_takes_precedence_over_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; token=from-cookie"),
        );
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn bearer_header_is_used_without_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("from-header"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(token_from_headers(&headers), None);
    }
}
