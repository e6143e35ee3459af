use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::domain::order::OrderItem;

// Model vendor assignment dari database: sub-status per vendor pada satu order
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VendorAssignment {
    pub id: i32,
    pub order_id: i32,
    pub vendor_id: i32,
    pub status: String,
    pub vendor_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Enum untuk sub-status assignment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AssignmentStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Confirmed => "confirmed",
            AssignmentStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AssignmentStatus::Pending),
            "confirmed" => Some(AssignmentStatus::Confirmed),
            "rejected" => Some(AssignmentStatus::Rejected),
            _ => None,
        }
    }
}

impl VendorAssignment {
    pub fn is_pending(&self) -> bool {
        self.status == "pending"
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == "confirmed"
    }

    pub fn is_rejected(&self) -> bool {
        self.status == "rejected"
    }
}

/// Partisi line items per vendor untuk assignment fan-out saat admin approve.
/// BTreeMap supaya urutan vendor deterministik.
pub fn partition_items_by_vendor(items: &[OrderItem]) -> BTreeMap<i32, Vec<&OrderItem>> {
    let mut by_vendor: BTreeMap<i32, Vec<&OrderItem>> = BTreeMap::new();
    for item in items {
        by_vendor.entry(item.vendor_id).or_default().push(item);
    }
    by_vendor
}

/// Order-level status boleh maju ke vendor_confirmed hanya jika SEMUA
/// assignment confirmed (minimal satu assignment)
pub fn all_assignments_confirmed(assignments: &[VendorAssignment]) -> bool {
    !assignments.is_empty() && assignments.iter().all(|a| a.is_confirmed())
}

/// Ada vendor yang reject: order butuh rekonsiliasi admin
pub fn has_rejected_assignment(assignments: &[VendorAssignment]) -> bool {
    assignments.iter().any(|a| a.is_rejected())
}

// Request vendor confirm bagian assignment-nya
#[derive(Debug, Deserialize, ToSchema)]
pub struct VendorConfirmRequest {
    #[schema(example = "All items in stock, ready to ship")]
    pub vendor_notes: Option<String>,
}

// Request vendor reject bagian assignment-nya (reason wajib)
#[derive(Debug, Deserialize, ToSchema)]
pub struct VendorRejectRequest {
    #[schema(example = "Item discontinued by supplier")]
    pub rejection_reason: String,
}

// Response vendor assignment
#[derive(Debug, Serialize, ToSchema)]
pub struct VendorAssignmentResponse {
    pub id: i32,
    pub order_id: i32,
    pub vendor_id: i32,
    pub status: String,
    pub vendor_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<VendorAssignment> for VendorAssignmentResponse {
    fn from(assignment: VendorAssignment) -> Self {
        Self {
            id: assignment.id,
            order_id: assignment.order_id,
            vendor_id: assignment.vendor_id,
            status: assignment.status,
            vendor_notes: assignment.vendor_notes,
            rejection_reason: assignment.rejection_reason,
            confirmed_at: assignment.confirmed_at,
            rejected_at: assignment.rejected_at,
            created_at: assignment.created_at,
        }
    }
}

// Row hasil query assigned-orders list untuk vendor, dengan sub-status caller
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VendorOrderRow {
    pub id: i32,
    pub order_number: String,
    pub customer_name: String,
    pub status: String,
    pub total: f64,
    pub assignment_status: String,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

// Response satu baris di vendor assigned-orders list
#[derive(Debug, Serialize, ToSchema)]
pub struct VendorOrderResponse {
    pub id: i32,
    pub order_number: String,
    pub customer_name: String,
    pub status: String,
    pub total: f64,
    pub assignment_status: String,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<VendorOrderRow> for VendorOrderResponse {
    fn from(row: VendorOrderRow) -> Self {
        Self {
            id: row.id,
            order_number: row.order_number,
            customer_name: row.customer_name,
            status: row.status,
            total: row.total,
            assignment_status: row.assignment_status,
            item_count: row.item_count,
            created_at: row.created_at,
        }
    }
}

// Response list assigned orders dengan pagination
#[derive(Debug, Serialize, ToSchema)]
pub struct VendorOrderListResponse {
    pub data: Vec<VendorOrderResponse>,
    pub pagination: crate::domain::order::Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i32, vendor_id: i32, quantity: i32) -> OrderItem {
        OrderItem {
            id,
            order_id: 1,
            product_id: 100 + id,
            product_name: format!("Product {}", id),
            quantity,
            unit_price: 50.0,
            total_price: 50.0 * quantity as f64,
            vendor_id,
        }
    }

    fn assignment(vendor_id: i32, status: &str) -> VendorAssignment {
        let now = chrono::Utc::now();
        VendorAssignment {
            id: vendor_id,
            order_id: 1,
            vendor_id,
            status: status.to_string(),
            vendor_notes: None,
            rejection_reason: None,
            confirmed_at: None,
            rejected_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_assignment_status_round_trip() {
        for status in [
            AssignmentStatus::Pending,
            AssignmentStatus::Confirmed,
            AssignmentStatus::Rejected,
        ] {
            assert_eq!(AssignmentStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(AssignmentStatus::from_str("unknown"), None);
    }

    #[test]
    fn test_partition_groups_by_vendor() {
        // 2 items dari vendor A (7), 1 item dari vendor B (9)
        let items = vec![item(1, 7, 2), item(2, 7, 1), item(3, 9, 4)];
        let partitioned = partition_items_by_vendor(&items);

        assert_eq!(partitioned.len(), 2);
        assert_eq!(partitioned[&7].len(), 2);
        assert_eq!(partitioned[&9].len(), 1);
        assert_eq!(partitioned[&9][0].product_id, 103);
    }

    #[test]
    fn test_partition_single_vendor() {
        let items = vec![item(1, 5, 1), item(2, 5, 2)];
        let partitioned = partition_items_by_vendor(&items);
        assert_eq!(partitioned.len(), 1);
        assert_eq!(partitioned[&5].len(), 2);
    }

    #[test]
    fn test_partition_empty() {
        let partitioned = partition_items_by_vendor(&[]);
        assert!(partitioned.is_empty());
    }

    #[test]
    fn test_all_confirmed_requires_every_vendor() {
        let mixed = vec![assignment(7, "confirmed"), assignment(9, "pending")];
        assert!(!all_assignments_confirmed(&mixed));

        let done = vec![assignment(7, "confirmed"), assignment(9, "confirmed")];
        assert!(all_assignments_confirmed(&done));

        // satu reject menahan seluruh order
        let rejected = vec![assignment(7, "confirmed"), assignment(9, "rejected")];
        assert!(!all_assignments_confirmed(&rejected));
    }

    #[test]
    fn test_all_confirmed_empty_is_false() {
        assert!(!all_assignments_confirmed(&[]));
    }

    #[test]
    fn test_has_rejected_assignment() {
        let clean = vec![assignment(7, "confirmed"), assignment(9, "pending")];
        assert!(!has_rejected_assignment(&clean));

        let flagged = vec![assignment(7, "rejected"), assignment(9, "confirmed")];
        assert!(has_rejected_assignment(&flagged));
    }
}
