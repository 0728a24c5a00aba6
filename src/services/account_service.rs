use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

use crate::{
    audit,
    dto::account::{ChangePasswordRequest, UpdateProfileRequest},
    entity::{Users, users::ActiveModel as UserActive},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    services::auth_service::{hash_password, validate_password, verify_password},
    state::AppState,
};

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let found = Users::find_by_id(user.user_id)
        .one(&*state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Profile", User::from(found), Some(Meta::empty())))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    let existing = Users::find_by_id(user.user_id)
        .one(&*state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: UserActive = existing.into();
    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("name must not be empty".into()));
        }
        active.name = Set(name);
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(non_blank(phone));
    }
    if let Some(address) = payload.address {
        active.address = Set(non_blank(address));
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&*state.orm).await?;

    Ok(ApiResponse::success("Profile updated", User::from(updated), Some(Meta::empty())))
}

pub async fn change_password(
    state: &AppState,
    user: &AuthUser,
    payload: ChangePasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    validate_password(&payload.new_password)?;

    let existing = Users::find_by_id(user.user_id)
        .one(&*state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if !verify_password(&payload.current_password, &existing.password_hash)? {
        return Err(AppError::Unauthorized("Current password is incorrect".into()));
    }

    let mut active: UserActive = existing.into();
    active.password_hash = Set(hash_password(&payload.new_password)?);
    active.updated_at = Set(Utc::now().into());
    active.update(&*state.orm).await?;

    audit::record(
        &*state.orm,
        Some(user.user_id),
        "password_change",
        "users",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;

    Ok(ApiResponse::message("Password changed"))
}

/// Blank strings clear an optional field.
fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
