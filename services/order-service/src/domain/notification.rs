use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

// Audit trail entry untuk status-change notification pada sebuah order.
// Append-only; ditulis dalam transaksi yang sama dengan transisinya.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct OrderNotification {
    pub id: i32,
    pub order_id: i32,
    // None berarti role-addressed (semua admin)
    pub recipient_id: Option<i32>,
    pub recipient_role: String,
    pub notification_type: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

// Notification types yang dipakai workflow
pub mod notification_type {
    pub const ORDER_APPROVED: &str = "order_approved";
    pub const ORDER_REJECTED: &str = "order_rejected";
    pub const VENDOR_ASSIGNED: &str = "vendor_assigned";
    pub const VENDOR_CONFIRMED: &str = "vendor_confirmed";
    pub const VENDOR_REJECTED: &str = "vendor_rejected";
    pub const ORDER_PAID: &str = "order_paid";
    pub const FULFILLMENT_UPDATE: &str = "fulfillment_update";
    pub const ORDER_CANCELLED: &str = "order_cancelled";
}

// Response notification untuk order detail
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NotificationResponse {
    pub id: i32,
    pub recipient_id: Option<i32>,
    pub recipient_role: String,
    pub notification_type: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<OrderNotification> for NotificationResponse {
    fn from(notif: OrderNotification) -> Self {
        Self {
            id: notif.id,
            recipient_id: notif.recipient_id,
            recipient_role: notif.recipient_role,
            notification_type: notif.notification_type,
            message: notif.message,
            created_at: notif.created_at,
        }
    }
}
