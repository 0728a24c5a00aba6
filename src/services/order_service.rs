use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{OrderLineRequest, OrderList, OrderWithItems, PlaceOrderRequest},
    entity::{
        OrderItems, Orders, Products,
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Model as OrderModel, OrderStatus},
        products::Column as ProdCol,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

pub const MAX_ORDER_LINES: usize = 100;

pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let shipping_address = payload.shipping_address.trim().to_string();
    if shipping_address.is_empty() {
        return Err(AppError::BadRequest("shipping_address must not be empty".into()));
    }
    let lines = merge_order_lines(&payload.items)?;

    let txn = state.orm.begin().await?;

    let product_ids: Vec<Uuid> = lines.iter().map(|(id, _)| *id).collect();
    let products: HashMap<Uuid, _> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .order_by_asc(ProdCol::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut total_amount: i64 = 0;
    for (product_id, quantity) in &lines {
        let product = products
            .get(product_id)
            .ok_or_else(|| AppError::BadRequest(format!("Product {product_id} not found")))?;
        if product.stock < *quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for product {}",
                product.name
            )));
        }
        total_amount = product
            .price
            .checked_mul(i64::from(*quantity))
            .and_then(|line| total_amount.checked_add(line))
            .ok_or_else(|| AppError::BadRequest("Order total is too large".into()))?;
    }

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        status: Set(OrderStatus::Pending),
        total_amount: Set(total_amount),
        shipping_address: Set(shipping_address),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut order_items: Vec<OrderItem> = Vec::with_capacity(lines.len());
    for (product_id, quantity) in &lines {
        let Some(product) = products.get(product_id) else {
            continue;
        };
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(Some(product.id)),
            product_name: Set(product.name.clone()),
            quantity: Set(*quantity),
            price: Set(product.price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        order_items.push(OrderItem::from(item));

        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(*quantity))
            .filter(ProdCol::Id.eq(product.id))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;

    tracing::info!(order_id = %order.id, user_id = %user.user_id, total_amount, "order placed");
    audit::record(
        &*state.orm,
        Some(user.user_id),
        "order_place",
        "orders",
        serde_json::json!({ "order_id": order.id, "total_amount": total_amount }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order placed",
        OrderWithItems {
            order: Order::from(order),
            items: order_items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
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
    Ok(ApiResponse::success("Ok", OrderList { items: orders }, Some(meta)))
}

/// Another user's order is reported as missing, not forbidden.
pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&*state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let data = with_items(&*state.orm, order).await?;
    Ok(ApiResponse::success("OK", data, Some(Meta::empty())))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if order.status != OrderStatus::Pending {
        return Err(AppError::BadRequest("Only pending orders can be cancelled".into()));
    }

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    restock_items(&txn, order.id).await?;
    let data = with_items(&txn, order).await?;

    txn.commit().await?;

    audit::record(
        &*state.orm,
        Some(user.user_id),
        "order_cancel",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Order cancelled", data, Some(Meta::empty())))
}

/// Put the quantities of a cancelled order back on the shelf.
/// Items whose product has since been deleted are skipped.
pub(crate) async fn restock_items<C: ConnectionTrait>(db: &C, order_id: Uuid) -> AppResult<()> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::ProductId)
        .all(db)
        .await?;

    // Same row order as `place_order` so concurrent writers lock products alike.
    for item in items {
        let Some(product_id) = item.product_id else {
            continue;
        };
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(item.quantity))
            .filter(ProdCol::Id.eq(product_id))
            .exec(db)
            .await?;
    }
    Ok(())
}

pub(crate) async fn with_items<C: ConnectionTrait>(
    db: &C,
    order: OrderModel,
) -> AppResult<OrderWithItems> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    Ok(OrderWithItems {
        order: Order::from(order),
        items,
    })
}

/// Validate the submitted cart and fold repeated products into one line,
/// keeping first-seen order.
fn merge_order_lines(items: &[OrderLineRequest]) -> AppResult<Vec<(Uuid, i32)>> {
    if items.is_empty() {
        return Err(AppError::BadRequest("Order must contain at least one item".into()));
    }

    let mut lines: Vec<(Uuid, i32)> = Vec::new();
    for item in items {
        if item.quantity <= 0 {
            return Err(AppError::BadRequest("quantity must be greater than 0".into()));
        }
        match lines.iter_mut().find(|(id, _)| *id == item.product_id) {
            Some((_, quantity)) => {
                *quantity = quantity
                    .checked_add(item.quantity)
                    .ok_or_else(|| AppError::BadRequest("quantity is too large".into()))?;
            }
            None => lines.push((item.product_id, item.quantity)),
        }
    }

    if lines.len() > MAX_ORDER_LINES {
        return Err(AppError::BadRequest(format!(
            "Order may contain at most {MAX_ORDER_LINES} products"
        )));
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use sea_orm::{DatabaseBackend, MockDatabase};

    use crate::{config::AppConfig, entity::products, entity::users::UserRole};

    fn line(product_id: Uuid, quantity: i32) -> OrderLineRequest {
        OrderLineRequest {
            product_id,
            quantity,
        }
    }

    #[test]
    fn merges_repeated_products() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let lines = merge_order_lines(&[line(a, 1), line(b, 2), line(a, 3)]).unwrap();
        assert_eq!(lines, vec![(a, 4), (b, 2)]);
    }

    #[test]
    fn rejects_empty_cart() {
        assert!(matches!(
            merge_order_lines(&[]),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn rejects_non_positive_quantities() {
        let id = Uuid::new_v4();
        assert!(merge_order_lines(&[line(id, 0)]).is_err());
        assert!(merge_order_lines(&[line(id, -2)]).is_err());
    }

    #[test]
    fn rejects_quantity_overflow() {
        let id = Uuid::new_v4();
        assert!(merge_order_lines(&[line(id, i32::MAX), line(id, 1)]).is_err());
    }

    #[test]
    fn caps_distinct_lines() {
        let items: Vec<_> = (0..=MAX_ORDER_LINES)
            .map(|_| line(Uuid::new_v4(), 1))
            .collect();
        assert!(merge_order_lines(&items).is_err());
    }

    #[tokio::test]
    async fn product_rows_are_locked_in_id_order() {
        let now = Utc::now().fixed_offset();
        let product = products::Model {
            id: Uuid::new_v4(),
            category_id: None,
            name: "Sold out".into(),
            description: None,
            price: 500,
            stock: 0,
            image_url: None,
            created_at: now,
            updated_at: now,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![product.clone()]])
            .into_connection();
        let config = AppConfig {
            database_url: "postgres://unused".into(),
            database_max_connections: 1,
            host: "127.0.0.1".into(),
            port: 0,
            jwt_secret: "order-test-secret-long-enough-for-hs256".into(),
            jwt_ttl_hours: 24,
            cookie_secure: false,
            cors_origin: None,
        };
        let state = AppState::new(db, config);
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            role: UserRole::Customer,
        };
        let payload = PlaceOrderRequest {
            items: vec![line(Uuid::new_v4(), 1), line(product.id, 1)],
            shipping_address: "1 Main St".into(),
        };

        let result = place_order(&state, &user, payload).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let AppState { orm, .. } = state;
        let db = Arc::try_unwrap(orm).expect("sole owner of the connection");
        let log = db.into_transaction_log();
        let locked = log
            .iter()
            .flat_map(|txn| txn.statements())
            .find(|stmt| stmt.sql.contains("FOR UPDATE"))
            .expect("product lock query");
        assert!(locked.sql.contains(r#"ORDER BY "products"."id" ASC FOR UPDATE"#));
    }
}
