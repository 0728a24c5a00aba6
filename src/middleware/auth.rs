use axum::{
    extract::{FromRef, FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use sea_orm::EntityTrait;
use uuid::Uuid;

use crate::{
    entity::{Users, users::UserRole},
    error::AppError,
    session::{token_from_headers, verify_token},
    state::AppState,
};

/// Caller identity: the token names the account, the database supplies the role.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

pub fn ensure_role(user: &AuthUser, role: UserRole) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, UserRole::Admin)
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let state = AppState::from_ref(state);
        let token = token_from_headers(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Missing session".into()))?;
        let claims = verify_token(&state.config, &token)?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;

        // Role changes and account deletion take effect before the token expires.
        let account = Users::find_by_id(user_id)
            .one(&*state.orm)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Session user no longer exists".into()))?;

        let user = AuthUser {
            user_id: account.id,
            role: account.role,
        };
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

/// Route layer for the admin back-office: 401 without a session, 403 for non-admins.
pub async fn require_admin(
    user: AuthUser,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    ensure_admin(&user)?;
    tracing::debug!(user_id = %user.user_id, path = %request.uri().path(), "admin access");
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_admin_rejects_customers() {
        let customer = AuthUser {
            user_id: Uuid::new_v4(),
            role: UserRole::Customer,
        };
        let admin = AuthUser {
            user_id: Uuid::new_v4(),
            role: UserRole::Admin,
        };

        assert!(matches!(ensure_admin(&customer), Err(AppError::Forbidden)));
        assert!(ensure_admin(&admin).is_ok());
        assert!(admin.is_admin());
    }
}
