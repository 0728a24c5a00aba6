use utoipa::{
    Modify, OpenApi,
    openapi::{
        self, OpenApi as OpenApiSpec,
        security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        account::{ChangePasswordRequest, UpdateProfileRequest},
        admin::{
            AuditLogList, DashboardStats, InventoryAdjustRequest, StatusCount,
            UpdateOrderStatusRequest, UpdateUserRoleRequest, UserList,
        },
        auth::{LoginRequest, RegisterRequest},
        categories::{CategoryList, CreateCategoryRequest, UpdateCategoryRequest},
        orders::{OrderLineRequest, OrderList, OrderWithItems, PlaceOrderRequest},
        products::{CreateProductRequest, ProductDetail, ProductList, RatingSummary, UpdateProductRequest},
        reviews::{CreateReviewRequest, ReviewList, ReviewWithAuthor},
        wishlist::{AddWishlistRequest, WishlistProductList},
    },
    entity::{orders::OrderStatus, users::UserRole},
    models::{AuditLog, Category, Order, OrderItem, Product, Review, User, WishlistItem},
    response::{ApiResponse, Meta},
    routes::{
        account, admin, auth, categories, health, orders, params, products, reviews, wishlist,
    },
    session::SESSION_COOKIE_NAME,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "session_cookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE_NAME))),
        );
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::logout,
        auth::session,
        account::get_profile,
        account::update_profile,
        account::change_password,
        categories::list_categories,
        categories::get_category,
        products::list_products,
        products::get_product,
        products::list_reviews,
        products::create_review,
        reviews::delete_review,
        orders::place_order,
        orders::list_orders,
        orders::get_order,
        orders::cancel_order,
        wishlist::list_wishlist,
        wishlist::add_to_wishlist,
        wishlist::remove_from_wishlist,
        admin::create_category,
        admin::update_category,
        admin::delete_category,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::list_users,
        admin::get_user,
        admin::update_user_role,
        admin::delete_user,
        admin::list_low_stock,
        admin::adjust_inventory,
        admin::dashboard_stats,
        admin::list_audit_logs
    ),
    components(
        schemas(
            User,
            UserRole,
            Category,
            Product,
            Order,
            OrderStatus,
            OrderItem,
            Review,
            WishlistItem,
            AuditLog,
            RegisterRequest,
            LoginRequest,
            UpdateProfileRequest,
            ChangePasswordRequest,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            CategoryList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            ProductDetail,
            RatingSummary,
            CreateReviewRequest,
            ReviewWithAuthor,
            ReviewList,
            OrderLineRequest,
            PlaceOrderRequest,
            OrderList,
            OrderWithItems,
            AddWishlistRequest,
            WishlistProductList,
            UpdateOrderStatusRequest,
            UpdateUserRoleRequest,
            InventoryAdjustRequest,
            UserList,
            AuditLogList,
            StatusCount,
            DashboardStats,
            params::SortOrder,
            params::ProductSortBy,
            Meta,
            ApiResponse<User>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<ProductDetail>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and the session cookie"),
        (name = "Account", description = "Profile of the signed-in user"),
        (name = "Catalog", description = "Categories and products"),
        (name = "Reviews", description = "Product reviews"),
        (name = "Orders", description = "Checkout and order history"),
        (name = "Wishlist", description = "Saved products"),
        (name = "Admin", description = "Store administration"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_storefront_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/auth/session",
            "/api/products/{id}/reviews",
            "/api/orders/{id}/cancel",
            "/api/wishlist/{product_id}",
            "/api/admin/stats",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn openapi_declares_cookie_and_bearer_schemes() {
        let doc = ApiDoc::openapi();
        let schemes = &doc.components.expect("components").security_schemes;
        assert!(schemes.contains_key("session_cookie"));
        assert!(schemes.contains_key("bearer_auth"));
    }
}
