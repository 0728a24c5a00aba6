use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::wishlist::{AddWishlistRequest, WishlistProductList},
    entity::{
        Products, WishlistItems,
        wishlist_items::{ActiveModel as WishlistActive, Column as WishlistCol},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Product, WishlistItem},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::product_service::ensure_product_exists,
    state::AppState,
};

pub async fn list_wishlist(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<WishlistProductList>> {
    let (page, limit, offset) = pagination.normalize();

    let finder = WishlistItems::find()
        .filter(WishlistCol::UserId.eq(user.user_id))
        .order_by_desc(WishlistCol::CreatedAt);

    let total = finder.clone().count(&*state.orm).await?;

    let items = finder
        .find_also_related(Products)
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&*state.orm)
        .await?
        .into_iter()
        .filter_map(|(_, product)| product.map(Product::from))
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("OK", WishlistProductList { items }, Some(meta)))
}

/// Adding a product twice returns the existing entry.
pub async fn add_to_wishlist(
    state: &AppState,
    user: &AuthUser,
    payload: AddWishlistRequest,
) -> AppResult<ApiResponse<WishlistItem>> {
    ensure_product_exists(state, payload.product_id).await?;

    let existing = WishlistItems::find()
        .filter(
            Condition::all()
                .add(WishlistCol::UserId.eq(user.user_id))
                .add(WishlistCol::ProductId.eq(payload.product_id)),
        )
        .one(&*state.orm)
        .await?;

    if let Some(entry) = existing {
        return Ok(ApiResponse::success(
            "Already in wishlist",
            WishlistItem::from(entry),
            Some(Meta::empty()),
        ));
    }

    let entry = WishlistActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        product_id: Set(payload.product_id),
        created_at: NotSet,
    }
    .insert(&*state.orm)
    .await?;

    audit::record(
        &*state.orm,
        Some(user.user_id),
        "wishlist_add",
        "wishlist_items",
        serde_json::json!({ "product_id": payload.product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Added to wishlist",
        WishlistItem::from(entry),
        Some(Meta::empty()),
    ))
}

pub async fn remove_from_wishlist(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = WishlistItems::delete_many()
        .filter(
            Condition::all()
                .add(WishlistCol::UserId.eq(user.user_id))
                .add(WishlistCol::ProductId.eq(product_id)),
        )
        .exec(&*state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &*state.orm,
        Some(user.user_id),
        "wishlist_remove",
        "wishlist_items",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::message("Removed from wishlist"))
}
