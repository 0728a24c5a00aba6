use axum::{Router, middleware::from_fn_with_state};

use crate::{middleware::auth::require_admin, state::AppState};

pub mod account;
pub mod admin;
pub mod auth;
pub mod categories;
pub mod doc;
pub mod extract;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;
pub mod reviews;
pub mod wishlist;

/// Everything mounted under `/api`. State is bound at the top level; it is only
/// needed here so the admin gate can decode sessions.
pub fn create_api_router(state: AppState) -> Router<AppState> {
    let admin = admin::router().route_layer(from_fn_with_state(state, require_admin));

    Router::new()
        .nest("/auth", auth::router())
        .nest("/account", account::router())
        .nest("/categories", categories::router())
        .nest("/products", products::router())
        .nest("/reviews", reviews::router())
        .nest("/orders", orders::router())
        .nest("/wishlist", wishlist::router())
        .nest("/admin", admin)
}
