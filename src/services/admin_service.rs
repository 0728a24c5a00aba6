use chrono::Utc;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::{
        admin::{
            AuditLogList, DashboardStats, InventoryAdjustRequest, StatusCount,
            UpdateOrderStatusRequest, UpdateUserRoleRequest, UserList,
        },
        orders::{OrderList, OrderWithItems},
        products::ProductList,
    },
    entity::{
        AuditLogs, Orders, Products, Users,
        audit_logs::Column as AuditCol,
        orders::{ActiveModel as OrderActive, Column as OrderCol, OrderStatus},
        products::{ActiveModel as ProductActive, Column as ProdCol},
        users::{ActiveModel as UserActive, Column as UserCol, UserRole},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{AuditLog, Order, Product, User},
    response::{ApiResponse, Meta},
    routes::params::{AuditLogQuery, LowStockQuery, OrderListQuery, SortOrder, UserListQuery},
    services::{
        contains_pattern,
        order_service::{restock_items, with_items},
    },
    state::AppState,
};

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }
    if let Some(user_id) = query.user_id {
        condition = condition.add(OrderCol::UserId.eq(user_id));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&*state.orm).await?;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&*state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Orders", OrderList { items: orders }, Some(meta)))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;
    let order = Orders::find_by_id(id)
        .one(&*state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let data = with_items(&*state.orm, order).await?;
    Ok(ApiResponse::success("Order found", data, Some(Meta::empty())))
}

/// Moving an order to `cancelled` returns its stock.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let next = payload.status;

    let txn = state.orm.begin().await?;
    let existing = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let previous = existing.status;
    if !previous.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "Order status cannot change from {} to {}",
            previous.to_value(),
            next.to_value()
        )));
    }

    let mut active: OrderActive = existing.into();
    active.status = Set(next);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    if next == OrderStatus::Cancelled {
        restock_items(&txn, order.id).await?;
    }
    txn.commit().await?;

    audit::record(
        &*state.orm,
        Some(user.user_id),
        "order_status_update",
        "orders",
        serde_json::json!({
            "order_id": order.id,
            "from": previous.to_value(),
            "to": next.to_value(),
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        Order::from(order),
        Some(Meta::empty()),
    ))
}

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    query: UserListQuery,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(search) = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(UserCol::Email).ilike(pattern.clone()))
                .add(Expr::col(UserCol::Name).ilike(pattern)),
        );
    }
    if let Some(role) = query.role {
        condition = condition.add(UserCol::Role.eq(role));
    }

    let finder = Users::find()
        .filter(condition)
        .order_by_desc(UserCol::CreatedAt);
    let total = finder.clone().count(&*state.orm).await?;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&*state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Users", UserList { items }, Some(meta)))
}

pub async fn get_user(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    let found = Users::find_by_id(id)
        .one(&*state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("User", User::from(found), Some(Meta::empty())))
}

pub async fn update_user_role(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateUserRoleRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    let role = payload.role;
    if id == user.user_id && role != UserRole::Admin {
        return Err(AppError::BadRequest("Admins cannot demote themselves".into()));
    }

    let existing = Users::find_by_id(id)
        .one(&*state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: UserActive = existing.into();
    active.role = Set(role);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&*state.orm).await?;

    audit::record(
        &*state.orm,
        Some(user.user_id),
        "user_role_update",
        "users",
        serde_json::json!({ "user_id": id, "role": role }),
    )
    .await;

    Ok(ApiResponse::success("User updated", User::from(updated), Some(Meta::empty())))
}

pub async fn delete_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    if id == user.user_id {
        return Err(AppError::BadRequest("Admins cannot delete themselves".into()));
    }

    let result = Users::delete_by_id(id).exec(&*state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &*state.orm,
        Some(user.user_id),
        "user_delete",
        "users",
        serde_json::json!({ "user_id": id }),
    )
    .await;

    Ok(ApiResponse::message("User deleted"))
}

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;
    let threshold = query.threshold.unwrap_or(5);
    let (page, limit, offset) = query.pagination().normalize();

    let finder = Products::find()
        .filter(ProdCol::Stock.lte(threshold))
        .order_by_asc(ProdCol::Stock)
        .order_by_desc(ProdCol::CreatedAt);

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
    Ok(ApiResponse::success("Low stock", ProductList { items }, Some(meta)))
}

pub async fn adjust_inventory(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: InventoryAdjustRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    if payload.delta == 0 {
        return Err(AppError::BadRequest("delta must not be 0".into()));
    }

    let txn = state.orm.begin().await?;
    let product = Products::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let new_stock = product
        .stock
        .checked_add(payload.delta)
        .filter(|s| *s >= 0)
        .ok_or_else(|| AppError::BadRequest("stock cannot be negative".into()))?;

    let mut active: ProductActive = product.into();
    active.stock = Set(new_stock);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    audit::record(
        &*state.orm,
        Some(user.user_id),
        "inventory_adjust",
        "products",
        serde_json::json!({ "product_id": updated.id, "delta": payload.delta }),
    )
    .await;

    Ok(ApiResponse::success(
        "Inventory updated",
        Product::from(updated),
        Some(Meta::empty()),
    ))
}

pub async fn dashboard_stats(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<DashboardStats>> {
    ensure_admin(user)?;

    let users = Users::find().count(&*state.orm).await?;
    let products = Products::find().count(&*state.orm).await?;
    let orders = Orders::find().count(&*state.orm).await?;

    let revenue: Option<i64> = Orders::find()
        .select_only()
        .column_as(Expr::cust("COALESCE(SUM(total_amount), 0)::bigint"), "revenue")
        .filter(OrderCol::Status.ne(OrderStatus::Cancelled))
        .into_tuple()
        .one(&*state.orm)
        .await?;

    let orders_by_status = Orders::find()
        .select_only()
        .column(OrderCol::Status)
        .column_as(Expr::cust("COUNT(*)"), "count")
        .group_by(OrderCol::Status)
        .order_by_asc(OrderCol::Status)
        .into_tuple::<(String, i64)>()
        .all(&*state.orm)
        .await?
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect();

    let stats = DashboardStats {
        users: users as i64,
        products: products as i64,
        orders: orders as i64,
        revenue: revenue.unwrap_or(0),
        orders_by_status,
    };
    Ok(ApiResponse::success("Stats", stats, Some(Meta::empty())))
}

pub async fn list_audit_logs(
    state: &AppState,
    user: &AuthUser,
    query: AuditLogQuery,
) -> AppResult<ApiResponse<AuditLogList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut finder = AuditLogs::find().order_by_desc(AuditCol::CreatedAt);
    if let Some(action) = query.action.as_deref().filter(|a| !a.is_empty()) {
        finder = finder.filter(AuditCol::Action.eq(action));
    }

    let total = finder.clone().count(&*state.orm).await?;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&*state.orm)
        .await?
        .into_iter()
        .map(AuditLog::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Audit logs", AuditLogList { items }, Some(meta)))
}
