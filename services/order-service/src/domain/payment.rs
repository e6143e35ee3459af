use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Model data payment session dari database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Payment {
    pub id: i32,
    pub order_id: i32,
    pub order_number: String,

    // Gateway session info
    pub transaction_id: String,
    pub session_key: Option<String>,
    pub gateway_url: Option<String>,

    // Amount & currency
    pub amount: f64,
    pub currency: String,

    pub status: String,

    // Timestamps
    pub paid_at: Option<DateTime<Utc>>,
    pub expired_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Status payment session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Cancelled,
    Expired,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Expired => "expired",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "success" => Some(PaymentStatus::Success),
            "failed" => Some(PaymentStatus::Failed),
            "cancelled" => Some(PaymentStatus::Cancelled),
            "expired" => Some(PaymentStatus::Expired),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Business logic methods
impl Payment {
    /// Cek apakah payment session sudah lewat expiry
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expired_at
    }

    pub fn is_settled(&self) -> bool {
        self.status == "success"
    }

    /// Session pending yang masih dalam window expiry boleh di-reuse
    pub fn is_reusable(&self) -> bool {
        self.status == "pending" && !self.is_expired()
    }

    /// Generate transaction ID unik untuk gateway
    pub fn generate_transaction_id(order_number: &str) -> String {
        format!("TXN-{}-{}", order_number, Uuid::new_v4().simple())
    }

    /// Payment session berlaku 24 jam
    pub fn generate_expiry_time() -> DateTime<Utc> {
        Utc::now() + chrono::Duration::hours(24)
    }
}

// Request init payment via /api/payment/initialize
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct InitializePaymentRequest {
    #[schema(example = 17)]
    pub order_id: i32,
}

// Response payment session ke customer
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PaymentSessionResponse {
    pub transaction_id: String,
    pub order_number: String,
    pub amount: f64,
    pub currency: String,
    pub gateway_url: String,
    pub expired_at: DateTime<Utc>,
}

// Request create session ke SSLCommerz v4 API (form-encoded)
#[derive(Debug, Serialize)]
pub struct SslcommerzSessionRequest {
    pub store_id: String,
    pub store_passwd: String,
    pub total_amount: f64,
    pub currency: String,
    pub tran_id: String,
    pub success_url: String,
    pub fail_url: String,
    pub cancel_url: String,
    pub ipn_url: String,
    pub cus_name: String,
    pub cus_email: String,
    pub cus_add1: String,
    pub cus_phone: String,
    pub product_name: String,
    pub product_category: String,
    pub product_profile: String,
    pub shipping_method: String,
    pub num_of_item: i32,
}

// Response dari SSLCommerz session create
#[derive(Debug, Deserialize)]
pub struct SslcommerzSessionResponse {
    pub status: String,
    pub failedreason: Option<String>,
    pub sessionkey: Option<String>,
    #[serde(rename = "GatewayPageURL")]
    pub gateway_page_url: Option<String>,
}

// Payload IPN callback dari SSLCommerz (form-encoded)
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SslcommerzIpnPayload {
    pub tran_id: String,
    pub val_id: Option<String>,
    pub status: String,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub bank_tran_id: Option<String>,
    pub card_type: Option<String>,
}

// Response dari SSLCommerz validator API
#[derive(Debug, Deserialize)]
pub struct SslcommerzValidationResponse {
    pub status: String,
    pub tran_id: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
}

// Ack response untuk gateway IPN call
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct IpnAckResponse {
    pub success: bool,
    pub message: String,
    pub transaction_id: String,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment(status: &str, expired_at: DateTime<Utc>) -> Payment {
        let now = Utc::now();
        Payment {
            id: 1,
            order_id: 17,
            order_number: "ORD-20260101-0001".to_string(),
            transaction_id: "TXN-test".to_string(),
            session_key: Some("sess".to_string()),
            gateway_url: Some("https://sandbox.sslcommerz.com/gw".to_string()),
            amount: 1500.0,
            currency: "BDT".to_string(),
            status: status.to_string(),
            paid_at: None,
            expired_at,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_payment_status_round_trip() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Success,
            PaymentStatus::Failed,
            PaymentStatus::Cancelled,
            PaymentStatus::Expired,
        ] {
            assert_eq!(PaymentStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(PaymentStatus::from_str("unknown"), None);
    }

    #[test]
    fn test_pending_session_within_window_is_reusable() {
        let p = payment("pending", Utc::now() + chrono::Duration::hours(1));
        assert!(p.is_reusable());
        assert!(!p.is_settled());
    }

    #[test]
    fn test_expired_session_is_not_reusable() {
        let p = payment("pending", Utc::now() - chrono::Duration::minutes(5));
        assert!(p.is_expired());
        assert!(!p.is_reusable());
    }

    #[test]
    fn test_settled_session_is_not_reusable() {
        let p = payment("success", Utc::now() + chrono::Duration::hours(1));
        assert!(p.is_settled());
        assert!(!p.is_reusable());
    }

    #[test]
    fn test_transaction_id_embeds_order_number() {
        let id = Payment::generate_transaction_id("ORD-20260101-0001");
        assert!(id.starts_with("TXN-ORD-20260101-0001-"));
    }
}
