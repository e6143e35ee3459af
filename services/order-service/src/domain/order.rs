use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::assignment::VendorAssignmentResponse;
use crate::domain::notification::NotificationResponse;

// Model utama Order dari database
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: i32,
    pub order_number: String,
    pub customer_id: i32,
    pub customer_name: String,
    pub customer_email: String,
    pub status: String,
    pub shipping_address: String,
    pub contact_phone: String,
    pub total: f64,
    pub admin_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub cancel_reason: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Line item milik sebuah order
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct OrderItem {
    pub id: i32,
    pub order_id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub total_price: f64,
    pub vendor_id: i32,
}

// Enum untuk status order
//
// Lifecycle graph:
//   pending_admin_approval -> admin_approved -> vendor_assigned
//   vendor_assigned -> vendor_confirmed -> payment_pending -> paid
//   paid -> processing -> shipped -> delivered
//   cancel dari pending_admin_approval/admin_approved/vendor_assigned
//   reject hanya dari pending_admin_approval
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderStatus {
    PendingAdminApproval,
    AdminApproved,
    VendorAssigned,
    VendorConfirmed,
    PaymentPending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::PendingAdminApproval => "pending_admin_approval",
            OrderStatus::AdminApproved => "admin_approved",
            OrderStatus::VendorAssigned => "vendor_assigned",
            OrderStatus::VendorConfirmed => "vendor_confirmed",
            OrderStatus::PaymentPending => "payment_pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending_admin_approval" => Some(OrderStatus::PendingAdminApproval),
            "admin_approved" => Some(OrderStatus::AdminApproved),
            "vendor_assigned" => Some(OrderStatus::VendorAssigned),
            "vendor_confirmed" => Some(OrderStatus::VendorConfirmed),
            "payment_pending" => Some(OrderStatus::PaymentPending),
            "paid" => Some(OrderStatus::Paid),
            "processing" => Some(OrderStatus::Processing),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            "rejected" => Some(OrderStatus::Rejected),
            _ => None,
        }
    }

    /// Terminal states: tidak ada transisi keluar lagi
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }

    /// Customer boleh cancel selama belum ada vendor confirmation penuh
    /// dan payment belum di-capture
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            OrderStatus::PendingAdminApproval
                | OrderStatus::AdminApproved
                | OrderStatus::VendorAssigned
        )
    }

    /// Order payable hanya setelah semua vendor confirm
    pub fn is_payable(&self) -> bool {
        matches!(
            self,
            OrderStatus::VendorConfirmed | OrderStatus::PaymentPending
        )
    }

    /// Fulfillment statuses yang boleh diminta via fulfillment endpoint
    pub fn is_fulfillment_status(&self) -> bool {
        matches!(
            self,
            OrderStatus::Processing | OrderStatus::Shipped | OrderStatus::Delivered
        )
    }

    /// Validasi edge pada lifecycle graph
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        match self {
            PendingAdminApproval => matches!(next, AdminApproved | Rejected | Cancelled),
            AdminApproved => matches!(next, VendorAssigned | Cancelled),
            VendorAssigned => matches!(next, VendorConfirmed | Cancelled),
            VendorConfirmed => matches!(next, PaymentPending | Paid),
            // payment session expiry mengembalikan order ke vendor_confirmed
            PaymentPending => matches!(next, Paid | VendorConfirmed),
            Paid => matches!(next, Processing),
            Processing => matches!(next, Shipped),
            Shipped => matches!(next, Delivered),
            Delivered | Cancelled | Rejected => false,
        }
    }

    /// Progress indicator untuk customer order view (persen)
    pub fn progress_percent(&self) -> u8 {
        match self {
            OrderStatus::PendingAdminApproval => 10,
            OrderStatus::AdminApproved => 25,
            OrderStatus::VendorAssigned => 40,
            OrderStatus::VendorConfirmed => 55,
            OrderStatus::PaymentPending => 65,
            OrderStatus::Paid => 75,
            OrderStatus::Processing => 85,
            OrderStatus::Shipped => 95,
            OrderStatus::Delivered => 100,
            OrderStatus::Cancelled | OrderStatus::Rejected => 0,
        }
    }
}

impl Order {
    pub fn current_status(&self) -> Option<OrderStatus> {
        OrderStatus::from_str(&self.status)
    }

    /// Eligibility dihitung dari persisted state, bukan dari client
    pub fn can_cancel(&self) -> bool {
        self.current_status()
            .map(|s| s.is_cancellable())
            .unwrap_or(false)
    }

    pub fn can_pay_now(&self) -> bool {
        self.current_status()
            .map(|s| s.is_payable())
            .unwrap_or(false)
    }
}

// Request untuk checkout submission (customer)
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub items: Vec<CreateOrderItemRequest>,
    #[schema(example = "House 12, Road 5, Dhanmondi, Dhaka")]
    pub shipping_address: String,
    #[schema(example = "01712345678")]
    pub contact_phone: String,
    #[schema(example = "John Doe")]
    pub customer_name: String,
    #[schema(example = "john@example.com")]
    pub customer_email: String,
}

// Satu line item dalam checkout payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderItemRequest {
    #[schema(example = 42)]
    pub product_id: i32,
    #[schema(example = 2)]
    pub quantity: i32,
}

// Request untuk admin approve order
#[derive(Debug, Deserialize, ToSchema)]
pub struct ApproveOrderRequest {
    #[schema(example = "Stock verified, release to vendors")]
    pub admin_notes: Option<String>,
}

// Request untuk admin reject order (reason wajib)
#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectOrderRequest {
    #[schema(example = "Out of stock")]
    pub rejection_reason: String,
}

// Request untuk customer cancel order (reason wajib)
#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelOrderRequest {
    #[schema(example = "Ordered by mistake")]
    pub reason: String,
}

// Request untuk admin reassign items vendor yang reject
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReassignVendorRequest {
    #[schema(example = 7)]
    pub from_vendor_id: i32,
    #[schema(example = 9)]
    pub to_vendor_id: i32,
}

// Request untuk fulfillment step update (vendor/admin)
#[derive(Debug, Deserialize, ToSchema)]
pub struct FulfillmentUpdateRequest {
    #[schema(example = "shipped")]
    pub status: String,
}

// Query parameters untuk order listing
#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct OrderQueryParams {
    pub status: Option<String>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

// Metadata pagination untuk list endpoints
#[derive(Debug, Serialize, ToSchema)]
pub struct Pagination {
    pub page: i32,
    pub limit: i32,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: i32, limit: i32, total: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + limit as i64 - 1) / limit as i64
        };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

// Row hasil query list order dengan jumlah item
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderSummaryRow {
    pub id: i32,
    pub order_number: String,
    pub customer_id: i32,
    pub customer_name: String,
    pub status: String,
    pub total: f64,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

// Response satu baris di order list
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderSummaryResponse {
    pub id: i32,
    pub order_number: String,
    pub customer_id: i32,
    pub customer_name: String,
    pub status: String,
    pub total: f64,
    pub item_count: i64,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
}

impl From<OrderSummaryRow> for OrderSummaryResponse {
    fn from(row: OrderSummaryRow) -> Self {
        let progress = OrderStatus::from_str(&row.status)
            .map(|s| s.progress_percent())
            .unwrap_or(0);
        Self {
            id: row.id,
            order_number: row.order_number,
            customer_id: row.customer_id,
            customer_name: row.customer_name,
            status: row.status,
            total: row.total,
            item_count: row.item_count,
            progress,
            created_at: row.created_at,
        }
    }
}

// Response list order dengan pagination
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderListResponse {
    pub data: Vec<OrderSummaryResponse>,
    pub pagination: Pagination,
}

// Response untuk order tunggal
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: i32,
    pub order_number: String,
    pub customer_id: i32,
    pub customer_name: String,
    pub customer_email: String,
    pub status: String,
    pub shipping_address: String,
    pub contact_phone: String,
    pub total: f64,
    pub admin_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub cancel_reason: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number,
            customer_id: order.customer_id,
            customer_name: order.customer_name,
            customer_email: order.customer_email,
            status: order.status,
            shipping_address: order.shipping_address,
            contact_phone: order.contact_phone,
            total: order.total,
            admin_notes: order.admin_notes,
            rejection_reason: order.rejection_reason,
            cancel_reason: order.cancel_reason,
            approved_at: order.approved_at,
            paid_at: order.paid_at,
            shipped_at: order.shipped_at,
            delivered_at: order.delivered_at,
            cancelled_at: order.cancelled_at,
            rejected_at: order.rejected_at,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

// Response detail order: items, vendor assignments, audit trail, eligibility
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetailResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub items: Vec<OrderItem>,
    pub vendor_assignments: Vec<VendorAssignmentResponse>,
    pub notifications: Vec<NotificationResponse>,
    pub progress: u8,
    pub can_cancel: bool,
    pub can_pay_now: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    const ALL: [OrderStatus; 11] = [
        PendingAdminApproval,
        AdminApproved,
        VendorAssigned,
        VendorConfirmed,
        PaymentPending,
        Paid,
        Processing,
        Shipped,
        Delivered,
        Cancelled,
        Rejected,
    ];

    #[test]
    fn test_status_round_trip() {
        for status in ALL {
            assert_eq!(OrderStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::from_str("bogus"), None);
    }

    #[test]
    fn test_no_skipping_admin_approval() {
        // confirm sebelum admin approve tidak pernah valid
        assert!(!PendingAdminApproval.can_transition_to(VendorConfirmed));
        assert!(!PendingAdminApproval.can_transition_to(Paid));
        assert!(!PendingAdminApproval.can_transition_to(VendorAssigned));
    }

    #[test]
    fn test_happy_path_edges() {
        assert!(PendingAdminApproval.can_transition_to(AdminApproved));
        assert!(AdminApproved.can_transition_to(VendorAssigned));
        assert!(VendorAssigned.can_transition_to(VendorConfirmed));
        assert!(VendorConfirmed.can_transition_to(PaymentPending));
        assert!(PaymentPending.can_transition_to(Paid));
        assert!(VendorConfirmed.can_transition_to(Paid));
        assert!(Paid.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
    }

    #[test]
    fn test_reject_only_from_pending() {
        assert!(PendingAdminApproval.can_transition_to(Rejected));
        for status in ALL {
            if status != PendingAdminApproval {
                assert!(
                    !status.can_transition_to(Rejected),
                    "reject should not be reachable from {:?}",
                    status
                );
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for terminal in [Delivered, Cancelled, Rejected] {
            assert!(terminal.is_terminal());
            for next in ALL {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_cancellable_set() {
        assert!(PendingAdminApproval.is_cancellable());
        assert!(AdminApproved.is_cancellable());
        assert!(VendorAssigned.is_cancellable());
        // post-payment dan post-shipment tidak bisa cancel
        assert!(!VendorConfirmed.is_cancellable());
        assert!(!PaymentPending.is_cancellable());
        assert!(!Paid.is_cancellable());
        assert!(!Shipped.is_cancellable());
        assert!(!Delivered.is_cancellable());
    }

    #[test]
    fn test_payable_set() {
        for status in ALL {
            assert_eq!(
                status.is_payable(),
                matches!(status, VendorConfirmed | PaymentPending),
                "payable mismatch for {:?}",
                status
            );
        }
    }

    #[test]
    fn test_fulfillment_is_stepwise() {
        // tidak boleh loncat langkah
        assert!(!Paid.can_transition_to(Shipped));
        assert!(!Paid.can_transition_to(Delivered));
        assert!(!Processing.can_transition_to(Delivered));
        // tidak boleh mundur
        assert!(!Shipped.can_transition_to(Processing));
    }

    #[test]
    fn test_payment_expiry_revert_edge() {
        assert!(PaymentPending.can_transition_to(VendorConfirmed));
        assert!(!Paid.can_transition_to(VendorConfirmed));
    }

    #[test]
    fn test_progress_monotonic_on_happy_path() {
        let path = [
            PendingAdminApproval,
            AdminApproved,
            VendorAssigned,
            VendorConfirmed,
            PaymentPending,
            Paid,
            Processing,
            Shipped,
            Delivered,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].progress_percent() < pair[1].progress_percent());
        }
        assert_eq!(Delivered.progress_percent(), 100);
    }

    #[test]
    fn test_order_eligibility_helpers() {
        let now = chrono::Utc::now();
        let order = Order {
            id: 1,
            order_number: "ORD-20260101-0001".to_string(),
            customer_id: 10,
            customer_name: "John Doe".to_string(),
            customer_email: "john@example.com".to_string(),
            status: "vendor_confirmed".to_string(),
            shipping_address: "House 12, Dhaka".to_string(),
            contact_phone: "01712345678".to_string(),
            total: 1500.0,
            admin_notes: None,
            rejection_reason: None,
            cancel_reason: None,
            approved_at: Some(now),
            paid_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            rejected_at: None,
            created_at: now,
            updated_at: now,
        };

        assert!(order.can_pay_now());
        assert!(!order.can_cancel());

        let mut pending = order.clone();
        pending.status = "pending_admin_approval".to_string();
        assert!(pending.can_cancel());
        assert!(!pending.can_pay_now());

        let mut unknown = order;
        unknown.status = "garbage".to_string();
        assert!(!unknown.can_cancel());
        assert!(!unknown.can_pay_now());
    }

    #[test]
    fn test_pagination_math() {
        let p = Pagination::new(1, 10, 25);
        assert_eq!(p.total_pages, 3);
        let empty = Pagination::new(1, 10, 0);
        assert_eq!(empty.total_pages, 0);
    }
}
