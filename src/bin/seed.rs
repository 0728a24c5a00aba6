use sea_orm::{
    ActiveEnum, ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection,
    EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use storefront_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        Categories, Products, Users, categories, products,
        users::{self, UserRole},
    },
    services::{auth_service::hash_password, category_service::slugify},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "admin@example.com", "Store Admin", "admin1234", UserRole::Admin).await?;
    let user_id = ensure_user(&orm, "user@example.com", "Sample Customer", "user12345", UserRole::Customer).await?;
    seed_catalog(&orm).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    orm: &DatabaseConnection,
    email: &str,
    name: &str,
    password: &str,
    role: UserRole,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(users::Column::Email.eq(email))
        .one(orm)
        .await?
    {
        println!("User {email} already exists");
        return Ok(existing.id);
    }

    let password_hash = hash_password(password)?;
    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        name: Set(name.to_string()),
        phone: Set(None),
        address: Set(None),
        role: Set(role),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(orm)
    .await?;

    println!("Created user {email} (role={})", role.to_value());
    Ok(user.id)
}

async fn ensure_category(orm: &DatabaseConnection, name: &str, description: &str) -> anyhow::Result<Uuid> {
    let slug = slugify(name);
    if let Some(existing) = Categories::find()
        .filter(categories::Column::Slug.eq(slug.as_str()))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }

    let category = categories::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        slug: Set(slug),
        description: Set(Some(description.to_string())),
        created_at: NotSet,
    }
    .insert(orm)
    .await?;
    Ok(category.id)
}

async fn seed_catalog(orm: &DatabaseConnection) -> anyhow::Result<()> {
    let apparel = ensure_category(orm, "Apparel", "Things to wear").await?;
    let kitchen = ensure_category(orm, "Kitchen", "Mugs and more").await?;
    let books = ensure_category(orm, "Books", "Printed and digital reading").await?;

    let catalog = vec![
        ("Axum Hoodie", "Warm hoodie for Rustaceans", 5500, 50, apparel),
        ("Crab T-Shirt", "Soft cotton tee with a crab", 2200, 80, apparel),
        ("Ferris Mug", "Coffee tastes better with Ferris", 1200, 100, kitchen),
        ("Rust Sticker Pack", "Decorate your laptop", 500, 3, kitchen),
        ("E-book: Async Rust", "Learn async Rust patterns", 2500, 75, books),
    ];

    for (name, desc, price, stock, category_id) in catalog {
        let exists = Products::find()
            .filter(products::Column::Name.eq(name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        products::ActiveModel {
            id: Set(Uuid::new_v4()),
            category_id: Set(Some(category_id)),
            name: Set(name.to_string()),
            description: Set(Some(desc.to_string())),
            price: Set(price),
            stock: Set(stock),
            image_url: Set(None),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded catalog");
    Ok(())
}
