use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(include_str!(
                "../../migrations/20250101000002_create_orders_reviews_wishlist.sql"
            ))
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                "DROP TABLE IF EXISTS wishlist_items; DROP TABLE IF EXISTS reviews; \
                 DROP TABLE IF EXISTS order_items; DROP TABLE IF EXISTS orders;",
            )
            .await?;
        Ok(())
    }
}
