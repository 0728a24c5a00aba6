use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use password_hash::rand_core::OsRng;
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    audit,
    dto::auth::{LoginRequest, RegisterRequest},
    entity::{
        Users,
        users::{ActiveModel as UserActive, Column as UserCol, UserRole},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    session::issue_token,
    state::AppState,
};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// A signed-in user plus the token to hand back as the session cookie.
#[derive(Debug)]
pub struct AuthSession {
    pub response: ApiResponse<User>,
    pub token: String,
}

pub async fn register_user(state: &AppState, payload: RegisterRequest) -> AppResult<AuthSession> {
    let email = normalize_email(&payload.email)?;
    validate_password(&payload.password)?;
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }

    let exist = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&*state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::Conflict("Email is already registered".into()));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        password_hash: Set(password_hash),
        name: Set(name),
        phone: Set(None),
        address: Set(None),
        role: Set(UserRole::Customer),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&*state.orm)
    .await?;

    audit::record(
        &*state.orm,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    let token = issue_token(&state.config, user.id, user.role)?;
    Ok(AuthSession {
        response: ApiResponse::success("User created", User::from(user), Some(Meta::empty())),
        token,
    })
}

pub async fn login_user(state: &AppState, payload: LoginRequest) -> AppResult<AuthSession> {
    let email = payload.email.trim().to_lowercase();
    let user = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&*state.orm)
        .await?;

    let user = match user {
        Some(u) => u,
        None => return Err(invalid_credentials()),
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(invalid_credentials());
    }

    audit::record(
        &*state.orm,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    let token = issue_token(&state.config, user.id, user.role)?;
    Ok(AuthSession {
        response: ApiResponse::success("Logged in", User::from(user), Some(Meta::empty())),
        token,
    })
}

/// Resolve the session owner. A token for a deleted account is no session at all.
pub async fn current_session(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let found = Users::find_by_id(user.user_id).one(&*state.orm).await?;
    match found {
        Some(u) => Ok(ApiResponse::success("Session", User::from(u), Some(Meta::empty()))),
        None => Err(AppError::Unauthorized("Session user no longer exists".into())),
    }
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Trim and lowercase; the address needs a local part and a domain.
pub fn normalize_email(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(AppError::BadRequest("email is invalid".into()));
    }
    Ok(email)
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid email or password".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_email_case_and_whitespace() {
        assert_eq!(
            normalize_email("  Jane.Doe@Example.COM ").unwrap(),
            "jane.doe@example.com"
        );
    }

    #[test]
    fn rejects_malformed_emails() {
        for bad in ["", "plain", "@example.com", "jane@", "a@b@c", "ja ne@example.com"] {
            assert!(normalize_email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn password_length_is_counted_in_characters() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
        assert!(validate_password("ééééééé").is_err());
    }

    #[test]
    fn hashed_password_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }
}
