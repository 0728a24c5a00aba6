use axum::{
    Json, Router,
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode, header},
    routing::{get, post},
};

use crate::{
    dto::auth::{LoginRequest, RegisterRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::User,
    response::ApiResponse,
    routes::extract::AppJson,
    services::auth_service::{self, AuthSession},
    session::{clear_session_cookie, session_cookie, set_cookie_header},
    state::AppState,
};

type WithCookie<T> = (StatusCode, [(HeaderName, HeaderValue); 1], Json<ApiResponse<T>>);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(session))
}

fn respond_with_session(
    state: &AppState,
    status: StatusCode,
    session: AuthSession,
) -> AppResult<WithCookie<User>> {
    let cookie = session_cookie(&state.config, session.token);
    let value = set_cookie_header(&cookie)?;
    Ok((status, [(header::SET_COOKIE, value)], Json(session.response)))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Register user and start a session", body = ApiResponse<User>),
        (status = 400, description = "Invalid email, password or name"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<WithCookie<User>> {
    let session = auth_service::register_user(&state, payload).await?;
    respond_with_session(&state, StatusCode::CREATED, session)
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login user and set the session cookie", body = ApiResponse<User>),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<WithCookie<User>> {
    let session = auth_service::login_user(&state, payload).await?;
    respond_with_session(&state, StatusCode::OK, session)
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = ApiResponse<serde_json::Value>)
    ),
    tag = "Auth"
)]
pub async fn logout(State(state): State<AppState>) -> AppResult<WithCookie<serde_json::Value>> {
    let value = set_cookie_header(&clear_session_cookie(&state.config))?;
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, value)],
        Json(ApiResponse::message("Logged out")),
    ))
}

#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Current session user", body = ApiResponse<User>),
        (status = 401, description = "No valid session")
    ),
    security(("session_cookie" = []), ("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn session(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = auth_service::current_session(&state, &user).await?;
    Ok(Json(resp))
}
