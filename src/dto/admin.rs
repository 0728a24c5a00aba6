use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    entity::{orders::OrderStatus, users::UserRole},
    models::{AuditLog, User},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InventoryAdjustRequest {
    pub delta: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserList {
    pub items: Vec<User>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogList {
    pub items: Vec<AuditLog>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub users: i64,
    pub products: i64,
    pub orders: i64,
    /// Sum of order totals, cancelled orders excluded.
    pub revenue: i64,
    pub orders_by_status: Vec<StatusCount>,
}
