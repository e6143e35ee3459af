use sqlx::{PgConnection, PgPool};

use crate::{
    domain::assignment::{VendorAssignment, VendorOrderRow},
    error::AppError,
};

// Ambil semua assignments sebuah order
pub async fn find_by_order(
    pool: &PgPool,
    order_id: i32,
) -> Result<Vec<VendorAssignment>, AppError> {
    let assignments = sqlx::query_as(
        "SELECT * FROM vendor_assignments WHERE order_id = $1 ORDER BY vendor_id"
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;

    Ok(assignments)
}

// Ambil assignment milik satu vendor pada satu order
pub async fn find_by_order_and_vendor(
    pool: &PgPool,
    order_id: i32,
    vendor_id: i32,
) -> Result<Option<VendorAssignment>, AppError> {
    let assignment = sqlx::query_as(
        "SELECT * FROM vendor_assignments WHERE order_id = $1 AND vendor_id = $2"
    )
    .bind(order_id)
    .bind(vendor_id)
    .fetch_optional(pool)
    .await?;

    Ok(assignment)
}

// Insert assignment baru (sub-status pending) saat admin approve fan-out
pub async fn insert(
    conn: &mut PgConnection,
    order_id: i32,
    vendor_id: i32,
) -> Result<VendorAssignment, AppError> {
    let assignment = sqlx::query_as(
        "INSERT INTO vendor_assignments (order_id, vendor_id, status)
         VALUES ($1, $2, 'pending')
         RETURNING *"
    )
    .bind(order_id)
    .bind(vendor_id)
    .fetch_one(conn)
    .await?;

    Ok(assignment)
}

// Vendor confirm bagiannya: conditional update, hanya dari pending
pub async fn confirm(
    conn: &mut PgConnection,
    order_id: i32,
    vendor_id: i32,
    vendor_notes: Option<&str>,
) -> Result<Option<VendorAssignment>, AppError> {
    let assignment = sqlx::query_as(
        "UPDATE vendor_assignments
         SET status = 'confirmed', vendor_notes = $1, confirmed_at = NOW(), updated_at = NOW()
         WHERE order_id = $2 AND vendor_id = $3 AND status = 'pending'
         RETURNING *"
    )
    .bind(vendor_notes)
    .bind(order_id)
    .bind(vendor_id)
    .fetch_optional(conn)
    .await?;

    Ok(assignment)
}

// Vendor reject bagiannya: conditional update, hanya dari pending
pub async fn reject(
    conn: &mut PgConnection,
    order_id: i32,
    vendor_id: i32,
    rejection_reason: &str,
) -> Result<Option<VendorAssignment>, AppError> {
    let assignment = sqlx::query_as(
        "UPDATE vendor_assignments
         SET status = 'rejected', rejection_reason = $1, rejected_at = NOW(), updated_at = NOW()
         WHERE order_id = $2 AND vendor_id = $3 AND status = 'pending'
         RETURNING *"
    )
    .bind(rejection_reason)
    .bind(order_id)
    .bind(vendor_id)
    .fetch_optional(conn)
    .await?;

    Ok(assignment)
}

// Jumlah assignment yang belum confirmed pada satu order
pub async fn count_unconfirmed(conn: &mut PgConnection, order_id: i32) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM vendor_assignments
         WHERE order_id = $1 AND status <> 'confirmed'"
    )
    .bind(order_id)
    .fetch_one(conn)
    .await?;

    Ok(count)
}

// Rekonsiliasi admin: pindahkan items vendor yang reject ke vendor lain.
// Assignment lama dihapus; assignment vendor tujuan direset ke pending
// karena scope barangnya berubah dan harus di-confirm ulang.
pub async fn reassign(
    conn: &mut PgConnection,
    order_id: i32,
    from_vendor_id: i32,
    to_vendor_id: i32,
) -> Result<VendorAssignment, AppError> {
    sqlx::query(
        "UPDATE order_items SET vendor_id = $1 WHERE order_id = $2 AND vendor_id = $3"
    )
    .bind(to_vendor_id)
    .bind(order_id)
    .bind(from_vendor_id)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        "DELETE FROM vendor_assignments WHERE order_id = $1 AND vendor_id = $2"
    )
    .bind(order_id)
    .bind(from_vendor_id)
    .execute(&mut *conn)
    .await?;

    let assignment = sqlx::query_as(
        "INSERT INTO vendor_assignments (order_id, vendor_id, status)
         VALUES ($1, $2, 'pending')
         ON CONFLICT (order_id, vendor_id)
         DO UPDATE SET status = 'pending',
                       vendor_notes = NULL,
                       rejection_reason = NULL,
                       confirmed_at = NULL,
                       rejected_at = NULL,
                       updated_at = NOW()
         RETURNING *"
    )
    .bind(order_id)
    .bind(to_vendor_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(assignment)
}

// Ambil orders yang mengandung assignment milik vendor, paginated,
// optional filter pada order status
pub async fn find_assigned_orders(
    pool: &PgPool,
    vendor_id: i32,
    status: Option<String>,
    page: i32,
    limit: i32,
) -> Result<(Vec<VendorOrderRow>, i64), AppError> {
    let offset = (page - 1) * limit;

    const COLUMNS: &str =
        "o.id, o.order_number, o.customer_name, o.status, o.total,
         a.status AS assignment_status,
         (SELECT COUNT(*) FROM order_items i
          WHERE i.order_id = o.id AND i.vendor_id = a.vendor_id) AS item_count,
         o.created_at";

    let (rows, total) = if let Some(status_filter) = status {
        let rows = sqlx::query_as(&format!(
            "SELECT {COLUMNS}
             FROM orders o
             JOIN vendor_assignments a ON a.order_id = o.id
             WHERE a.vendor_id = $1 AND o.status = $2
             ORDER BY o.created_at DESC
             LIMIT $3 OFFSET $4"
        ))
        .bind(vendor_id)
        .bind(&status_filter)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)
             FROM orders o
             JOIN vendor_assignments a ON a.order_id = o.id
             WHERE a.vendor_id = $1 AND o.status = $2"
        )
        .bind(vendor_id)
        .bind(&status_filter)
        .fetch_one(pool)
        .await?;

        (rows, total)
    } else {
        let rows = sqlx::query_as(&format!(
            "SELECT {COLUMNS}
             FROM orders o
             JOIN vendor_assignments a ON a.order_id = o.id
             WHERE a.vendor_id = $1
             ORDER BY o.created_at DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(vendor_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)
             FROM orders o
             JOIN vendor_assignments a ON a.order_id = o.id
             WHERE a.vendor_id = $1"
        )
        .bind(vendor_id)
        .fetch_one(pool)
        .await?;

        (rows, total)
    };

    Ok((rows, total))
}
