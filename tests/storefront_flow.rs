mod common;

use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use uuid::Uuid;

use storefront_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    dto::{
        admin::UpdateOrderStatusRequest,
        auth::RegisterRequest,
        categories::CreateCategoryRequest,
        orders::{OrderLineRequest, PlaceOrderRequest},
        products::CreateProductRequest,
        reviews::CreateReviewRequest,
        wishlist::AddWishlistRequest,
    },
    entity::{
        orders::OrderStatus,
        users::{ActiveModel as UserActive, UserRole},
    },
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::{LowStockQuery, Pagination},
    services::{
        admin_service, auth_service, category_service, order_service, product_service,
        review_service, wishlist_service,
    },
    state::AppState,
};

// Customer registers and orders; the order is cancelled and stock comes back;
// a second order ships; reviews, wishlist and admin reporting see the result.
#[tokio::test]
async fn storefront_order_lifecycle() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(database_url).await?;

    let session = auth_service::register_user(
        &state,
        RegisterRequest {
            email: "Shopper@Example.com".into(),
            password: "password123".into(),
            name: "Shopper".into(),
        },
    )
    .await?;
    let customer = session.response.data.expect("user");
    assert_eq!(customer.email, "shopper@example.com");
    assert_eq!(customer.role, UserRole::Customer);
    let auth_user = AuthUser {
        user_id: customer.id,
        role: customer.role,
    };
    let auth_admin = AuthUser {
        user_id: create_admin(&state).await?,
        role: UserRole::Admin,
    };

    let category = category_service::create_category(
        &state,
        &auth_admin,
        CreateCategoryRequest {
            name: "Test Gear".into(),
            slug: None,
            description: None,
        },
    )
    .await?
    .data
    .expect("category");
    assert_eq!(category.slug, "test-gear");

    let product = product_service::create_product(
        &state,
        &auth_admin,
        CreateProductRequest {
            name: "Test Widget".into(),
            description: Some("A product for testing".into()),
            price: 1000,
            stock: 10,
            category_id: Some(category.id),
            image_url: None,
        },
    )
    .await?
    .data
    .expect("product");

    // Repeated lines are merged into one.
    let placed = order_service::place_order(
        &state,
        &auth_user,
        PlaceOrderRequest {
            items: vec![
                OrderLineRequest {
                    product_id: product.id,
                    quantity: 1,
                },
                OrderLineRequest {
                    product_id: product.id,
                    quantity: 1,
                },
            ],
            shipping_address: "1 Main St".into(),
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(placed.order.total_amount, 2000);
    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert_eq!(placed.items.len(), 1);
    assert_eq!(placed.items[0].quantity, 2);
    assert_eq!(stock_of(&state, product.id).await?, 8);

    let too_many = order_service::place_order(
        &state,
        &auth_user,
        PlaceOrderRequest {
            items: vec![OrderLineRequest {
                product_id: product.id,
                quantity: 9,
            }],
            shipping_address: "1 Main St".into(),
        },
    )
    .await;
    assert!(matches!(too_many, Err(AppError::BadRequest(_))));
    assert_eq!(stock_of(&state, product.id).await?, 8);

    order_service::cancel_order(&state, &auth_user, placed.order.id).await?;
    assert_eq!(stock_of(&state, product.id).await?, 10);

    let second = order_service::place_order(
        &state,
        &auth_user,
        PlaceOrderRequest {
            items: vec![OrderLineRequest {
                product_id: product.id,
                quantity: 3,
            }],
            shipping_address: "1 Main St".into(),
        },
    )
    .await?
    .data
    .expect("order");

    let shipped = admin_service::update_order_status(
        &state,
        &auth_admin,
        second.order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Shipped,
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(shipped.status, OrderStatus::Shipped);

    let late_cancel = order_service::cancel_order(&state, &auth_user, second.order.id).await;
    assert!(matches!(late_cancel, Err(AppError::BadRequest(_))));

    // Orders belong to their owner only.
    let stranger = AuthUser {
        user_id: Uuid::new_v4(),
        role: UserRole::Customer,
    };
    let hidden = order_service::get_order(&state, &stranger, second.order.id).await;
    assert!(matches!(hidden, Err(AppError::NotFound)));

    review_service::create_review(
        &state,
        &auth_user,
        product.id,
        CreateReviewRequest {
            rating: 4,
            comment: Some("Solid widget".into()),
        },
    )
    .await?;
    let duplicate = review_service::create_review(
        &state,
        &auth_user,
        product.id,
        CreateReviewRequest {
            rating: 5,
            comment: None,
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let detail = product_service::get_product(&state, product.id)
        .await?
        .data
        .expect("detail");
    assert_eq!(detail.rating.count, 1);
    assert!((detail.rating.average - 4.0).abs() < f64::EPSILON);
    assert_eq!(detail.category.map(|c| c.id), Some(category.id));

    for _ in 0..2 {
        wishlist_service::add_to_wishlist(
            &state,
            &auth_user,
            AddWishlistRequest {
                product_id: product.id,
            },
        )
        .await?;
    }
    let wishlist = wishlist_service::list_wishlist(&state, &auth_user, Pagination::default())
        .await?
        .data
        .expect("wishlist");
    assert_eq!(wishlist.items.len(), 1);

    let low = admin_service::list_low_stock(
        &state,
        &auth_admin,
        LowStockQuery {
            page: Some(1),
            per_page: Some(20),
            threshold: Some(7),
        },
    )
    .await?
    .data
    .expect("low stock");
    assert!(
        low.items.iter().any(|p| p.id == product.id),
        "expected product to appear in low-stock list"
    );

    let stats = admin_service::dashboard_stats(&state, &auth_admin)
        .await?
        .data
        .expect("stats");
    assert_eq!(stats.orders, 2);
    assert_eq!(stats.revenue, 3000);
    assert_eq!(stats.users, 2);

    Ok(())
}

async fn setup_state(database_url: String) -> anyhow::Result<AppState> {
    let config = AppConfig {
        database_url,
        ..common::test_config()
    };
    let orm = create_orm_conn(&config).await?;
    run_migrations(&orm).await?;

    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE wishlist_items, reviews, order_items, orders, audit_logs, products, categories, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(AppState::new(orm, config))
}

async fn create_admin(state: &AppState) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set("admin@example.com".into()),
        password_hash: Set(auth_service::hash_password("admin-password")?),
        name: Set("Admin".into()),
        phone: Set(None),
        address: Set(None),
        role: Set(UserRole::Admin),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&*state.orm)
    .await?;

    Ok(user.id)
}

async fn stock_of(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let detail = product_service::get_product(state, product_id)
        .await?
        .data
        .expect("product");
    Ok(detail.product.stock)
}
