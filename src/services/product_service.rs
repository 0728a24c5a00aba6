use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::products::{
        CreateProductRequest, ProductDetail, ProductList, RatingSummary, UpdateProductRequest,
    },
    entity::{
        Categories, Products, Reviews,
        products::{ActiveModel, Column},
        reviews::Column as ReviewCol,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Category, Product},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    services::contains_pattern,
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(category_id) = query.category_id {
        condition = condition.add(Column::CategoryId.eq(category_id));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    if query.in_stock == Some(true) {
        condition = condition.add(Column::Stock.gt(0));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&*state.orm).await?;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&*state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ProductDetail>> {
    let (product, category) = Products::find_by_id(id)
        .find_also_related(Categories)
        .one(&*state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let rating = rating_summary(state, id).await?;

    let detail = ProductDetail {
        product: Product::from(product),
        category: category.map(Category::from),
        rating,
    };
    Ok(ApiResponse::success("Product", detail, Some(Meta::empty())))
}

async fn rating_summary(state: &AppState, product_id: Uuid) -> AppResult<RatingSummary> {
    let row: Option<(f64, i64)> = Reviews::find()
        .select_only()
        .column_as(Expr::cust("COALESCE(AVG(rating), 0)::float8"), "average")
        .column_as(Expr::cust("COUNT(*)"), "count")
        .filter(ReviewCol::ProductId.eq(product_id))
        .into_tuple()
        .one(&*state.orm)
        .await?;

    let (average, count) = row.unwrap_or((0.0, 0));
    Ok(RatingSummary {
        average: (average * 100.0).round() / 100.0,
        count,
    })
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    validate_price_and_stock(Some(payload.price), Some(payload.stock))?;
    if let Some(category_id) = payload.category_id {
        ensure_category_exists(state, category_id).await?;
    }

    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        category_id: Set(payload.category_id),
        name: Set(name),
        description: Set(payload.description),
        price: Set(payload.price),
        stock: Set(payload.stock),
        image_url: Set(payload.image_url),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let product = active.insert(&*state.orm).await?;

    audit::record(
        &*state.orm,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    validate_price_and_stock(payload.price, payload.stock)?;

    let existing = Products::find_by_id(id)
        .one(&*state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("name must not be empty".into()));
        }
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(category_id) = payload.category_id {
        ensure_category_exists(state, category_id).await?;
        active.category_id = Set(Some(category_id));
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(Some(image_url));
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&*state.orm).await?;

    audit::record(
        &*state.orm,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Products::delete_by_id(id).exec(&*state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &*state.orm,
        Some(user.user_id),
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::message("Deleted"))
}

pub(crate) async fn ensure_product_exists(state: &AppState, id: Uuid) -> AppResult<()> {
    let found = Products::find_by_id(id).one(&*state.orm).await?;
    if found.is_none() {
        return Err(AppError::NotFound);
    }
    Ok(())
}

async fn ensure_category_exists(state: &AppState, id: Uuid) -> AppResult<()> {
    let found = Categories::find_by_id(id).one(&*state.orm).await?;
    if found.is_none() {
        return Err(AppError::BadRequest("category not found".into()));
    }
    Ok(())
}

fn validate_price_and_stock(price: Option<i64>, stock: Option<i32>) -> AppResult<()> {
    if price.is_some_and(|p| p < 0) {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    if stock.is_some_and(|s| s < 0) {
        return Err(AppError::BadRequest("stock must not be negative".into()));
    }
    Ok(())
}
