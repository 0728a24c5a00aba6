use axum::{
    Json, Router,
    extract::State,
    routing::{get, put},
};

use crate::{
    dto::account::{ChangePasswordRequest, UpdateProfileRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::User,
    response::ApiResponse,
    routes::extract::AppJson,
    services::account_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_profile).put(update_profile))
        .route("/password", put(change_password))
}

#[utoipa::path(
    get,
    path = "/api/account",
    responses(
        (status = 200, description = "Current user's profile", body = ApiResponse<User>),
        (status = 401, description = "No valid session")
    ),
    security(("session_cookie" = []), ("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = account_service::get_profile(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/account",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<User>),
        (status = 400, description = "Blank name"),
        (status = 401, description = "No valid session")
    ),
    security(("session_cookie" = []), ("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = account_service::update_profile(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/account/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "New password too short"),
        (status = 401, description = "Current password incorrect")
    ),
    security(("session_cookie" = []), ("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = account_service::change_password(&state, &user, payload).await?;
    Ok(Json(resp))
}
