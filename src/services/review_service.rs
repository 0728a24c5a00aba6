use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::reviews::{CreateReviewRequest, ReviewList, ReviewWithAuthor},
    entity::{
        Reviews, Users,
        reviews::{ActiveModel as ReviewActive, Column as ReviewCol},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Review,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::product_service::ensure_product_exists,
    state::AppState,
};

pub const MAX_COMMENT_LENGTH: usize = 2000;

pub async fn list_reviews(
    state: &AppState,
    product_id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<ReviewList>> {
    ensure_product_exists(state, product_id).await?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Reviews::find()
        .filter(ReviewCol::ProductId.eq(product_id))
        .order_by_desc(ReviewCol::CreatedAt);

    let total = finder.clone().count(&*state.orm).await?;

    let items = finder
        .find_also_related(Users)
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&*state.orm)
        .await?
        .into_iter()
        .map(|(review, author)| ReviewWithAuthor {
            review: Review::from(review),
            author_name: author.map(|u| u.name),
        })
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Reviews", ReviewList { items }, Some(meta)))
}

pub async fn create_review(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    validate_rating(payload.rating)?;
    let comment = payload
        .comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if comment
        .as_ref()
        .is_some_and(|c| c.chars().count() > MAX_COMMENT_LENGTH)
    {
        return Err(AppError::BadRequest(format!(
            "comment must be at most {MAX_COMMENT_LENGTH} characters"
        )));
    }

    ensure_product_exists(state, product_id).await?;

    let existing = Reviews::find()
        .filter(
            Condition::all()
                .add(ReviewCol::UserId.eq(user.user_id))
                .add(ReviewCol::ProductId.eq(product_id)),
        )
        .one(&*state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("You have already reviewed this product".into()));
    }

    let review = ReviewActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        product_id: Set(product_id),
        rating: Set(payload.rating),
        comment: Set(comment),
        created_at: NotSet,
    }
    .insert(&*state.orm)
    .await?;

    audit::record(
        &*state.orm,
        Some(user.user_id),
        "review_create",
        "reviews",
        serde_json::json!({ "review_id": review.id, "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Review created",
        Review::from(review),
        Some(Meta::empty()),
    ))
}

/// Authors may delete their own reviews; admins may delete any.
pub async fn delete_review(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let review = Reviews::find_by_id(id)
        .one(&*state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if review.user_id != user.user_id && !user.is_admin() {
        return Err(AppError::Forbidden);
    }

    review.delete(&*state.orm).await?;

    audit::record(
        &*state.orm,
        Some(user.user_id),
        "review_delete",
        "reviews",
        serde_json::json!({ "review_id": id }),
    )
    .await;

    Ok(ApiResponse::message("Review deleted"))
}

pub fn validate_rating(rating: i32) -> AppResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::BadRequest("rating must be between 1 and 5".into()));
    }
    Ok(())
}
