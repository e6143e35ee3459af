use sqlx::{PgConnection, PgPool};

use crate::{
    domain::order::{Order, OrderItem, OrderStatus, OrderSummaryRow},
    error::AppError,
};

// Input line item yang sudah diresolve dari catalog saat checkout
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub vendor_id: i32,
}

// Generate unique order number untuk display
async fn generate_order_number(pool: &PgPool) -> Result<String, AppError> {
    loop {
        let timestamp = chrono::Utc::now().format("%Y%m%d");
        let random: i32 = rand::random::<i32>().abs() % 10000;
        let order_number = format!("ORD-{}-{:04}", timestamp, random);

        // Validasi unique
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM orders WHERE order_number = $1)"
        )
        .bind(&order_number)
        .fetch_one(pool)
        .await?;

        if !exists.0 {
            return Ok(order_number);
        }
        // If exists, loop again and generate new number
    }
}

// Create order baru dari checkout submission (order + items dalam satu transaksi)
#[allow(clippy::too_many_arguments)]
pub async fn create_order(
    pool: &PgPool,
    customer_id: i32,
    customer_name: &str,
    customer_email: &str,
    shipping_address: &str,
    contact_phone: &str,
    items: &[NewOrderItem],
) -> Result<Order, AppError> {
    let order_number = generate_order_number(pool).await?;

    let total: f64 = items
        .iter()
        .map(|i| i.unit_price * i.quantity as f64)
        .sum();

    let mut tx = pool.begin().await?;

    let order: Order = sqlx::query_as(
        "INSERT INTO orders (
            order_number, customer_id, customer_name, customer_email,
            status, shipping_address, contact_phone, total
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *"
    )
    .bind(&order_number)
    .bind(customer_id)
    .bind(customer_name)
    .bind(customer_email)
    .bind(OrderStatus::PendingAdminApproval.as_str())
    .bind(shipping_address)
    .bind(contact_phone)
    .bind(total)
    .fetch_one(&mut *tx)
    .await?;

    for item in items {
        sqlx::query(
            "INSERT INTO order_items (
                order_id, product_id, product_name, quantity,
                unit_price, total_price, vendor_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        )
        .bind(order.id)
        .bind(item.product_id)
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.unit_price * item.quantity as f64)
        .bind(item.vendor_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(order)
}

// Ambil order by ID
pub async fn find_order_by_id(pool: &PgPool, id: i32) -> Result<Option<Order>, AppError> {
    let result = sqlx::query_as("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(result)
}

// Ambil line items sebuah order
pub async fn find_items_by_order(pool: &PgPool, order_id: i32) -> Result<Vec<OrderItem>, AppError> {
    let items = sqlx::query_as(
        "SELECT * FROM order_items WHERE order_id = $1 ORDER BY id"
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;

    Ok(items)
}

const SUMMARY_COLUMNS: &str =
    "o.id, o.order_number, o.customer_id, o.customer_name, o.status, o.total,
     (SELECT COUNT(*) FROM order_items i WHERE i.order_id = o.id) AS item_count,
     o.created_at";

// Ambil orders milik customer, paginated, optional status filter
pub async fn find_orders_by_customer(
    pool: &PgPool,
    customer_id: i32,
    status: Option<String>,
    page: i32,
    limit: i32,
) -> Result<(Vec<OrderSummaryRow>, i64), AppError> {
    let offset = (page - 1) * limit;

    let (rows, total) = if let Some(status_filter) = status {
        let rows = sqlx::query_as(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM orders o
             WHERE o.customer_id = $1 AND o.status = $2
             ORDER BY o.created_at DESC
             LIMIT $3 OFFSET $4"
        ))
        .bind(customer_id)
        .bind(&status_filter)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE customer_id = $1 AND status = $2"
        )
        .bind(customer_id)
        .bind(&status_filter)
        .fetch_one(pool)
        .await?;

        (rows, total)
    } else {
        let rows = sqlx::query_as(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM orders o
             WHERE o.customer_id = $1
             ORDER BY o.created_at DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(customer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE customer_id = $1"
        )
        .bind(customer_id)
        .fetch_one(pool)
        .await?;

        (rows, total)
    };

    Ok((rows, total))
}

// Ambil orders yang menunggu admin review, paginated
pub async fn find_pending_admin(
    pool: &PgPool,
    page: i32,
    limit: i32,
) -> Result<(Vec<OrderSummaryRow>, i64), AppError> {
    let offset = (page - 1) * limit;

    let rows = sqlx::query_as(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM orders o
         WHERE o.status = $1
         ORDER BY o.created_at ASC
         LIMIT $2 OFFSET $3"
    ))
    .bind(OrderStatus::PendingAdminApproval.as_str())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status = $1")
        .bind(OrderStatus::PendingAdminApproval.as_str())
        .fetch_one(pool)
        .await?;

    Ok((rows, total))
}

// Ambil orders yang butuh rekonsiliasi admin: masih vendor_assigned
// tapi ada assignment yang rejected
pub async fn find_flagged_for_reconciliation(
    pool: &PgPool,
    page: i32,
    limit: i32,
) -> Result<(Vec<OrderSummaryRow>, i64), AppError> {
    let offset = (page - 1) * limit;

    let rows = sqlx::query_as(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM orders o
         WHERE o.status = $1
           AND EXISTS(
               SELECT 1 FROM vendor_assignments a
               WHERE a.order_id = o.id AND a.status = 'rejected'
           )
         ORDER BY o.created_at ASC
         LIMIT $2 OFFSET $3"
    ))
    .bind(OrderStatus::VendorAssigned.as_str())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM orders o
         WHERE o.status = $1
           AND EXISTS(
               SELECT 1 FROM vendor_assignments a
               WHERE a.order_id = o.id AND a.status = 'rejected'
           )"
    )
    .bind(OrderStatus::VendorAssigned.as_str())
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

// Conditional update (compare-and-swap pada kolom status) supaya transisi
// yang race tidak saling menimpa: None berarti precondition tidak terpenuhi.
pub async fn transition_status(
    conn: &mut PgConnection,
    id: i32,
    expected: OrderStatus,
    next: OrderStatus,
) -> Result<Option<Order>, AppError> {
    let order = sqlx::query_as(
        "UPDATE orders
         SET status = $1, updated_at = NOW()
         WHERE id = $2 AND status = $3
         RETURNING *"
    )
    .bind(next.as_str())
    .bind(id)
    .bind(expected.as_str())
    .fetch_optional(conn)
    .await?;

    Ok(order)
}

// Admin approve: pending_admin_approval -> admin_approved (stamp notes)
pub async fn approve_order(
    conn: &mut PgConnection,
    id: i32,
    admin_notes: Option<&str>,
) -> Result<Option<Order>, AppError> {
    let order = sqlx::query_as(
        "UPDATE orders
         SET status = $1, admin_notes = $2, approved_at = NOW(), updated_at = NOW()
         WHERE id = $3 AND status = $4
         RETURNING *"
    )
    .bind(OrderStatus::AdminApproved.as_str())
    .bind(admin_notes)
    .bind(id)
    .bind(OrderStatus::PendingAdminApproval.as_str())
    .fetch_optional(conn)
    .await?;

    Ok(order)
}

// Admin reject: pending_admin_approval -> rejected (reason wajib)
pub async fn reject_order(
    conn: &mut PgConnection,
    id: i32,
    rejection_reason: &str,
) -> Result<Option<Order>, AppError> {
    let order = sqlx::query_as(
        "UPDATE orders
         SET status = $1, rejection_reason = $2, rejected_at = NOW(), updated_at = NOW()
         WHERE id = $3 AND status = $4
         RETURNING *"
    )
    .bind(OrderStatus::Rejected.as_str())
    .bind(rejection_reason)
    .bind(id)
    .bind(OrderStatus::PendingAdminApproval.as_str())
    .fetch_optional(conn)
    .await?;

    Ok(order)
}

// Customer cancel: hanya dari status pre-confirmation, re-check di SQL
pub async fn cancel_order(
    conn: &mut PgConnection,
    id: i32,
    reason: &str,
) -> Result<Option<Order>, AppError> {
    let order = sqlx::query_as(
        "UPDATE orders
         SET status = 'cancelled', cancel_reason = $1, cancelled_at = NOW(), updated_at = NOW()
         WHERE id = $2
           AND status IN ('pending_admin_approval', 'admin_approved', 'vendor_assigned')
         RETURNING *"
    )
    .bind(reason)
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(order)
}

// Payment settle: payable statuses -> paid
pub async fn mark_paid(conn: &mut PgConnection, id: i32) -> Result<Option<Order>, AppError> {
    let order = sqlx::query_as(
        "UPDATE orders
         SET status = 'paid', paid_at = NOW(), updated_at = NOW()
         WHERE id = $1 AND status IN ('vendor_confirmed', 'payment_pending')
         RETURNING *"
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(order)
}

// Fulfillment step update dengan timestamp stamping per step
pub async fn advance_fulfillment(
    conn: &mut PgConnection,
    id: i32,
    expected: OrderStatus,
    next: OrderStatus,
) -> Result<Option<Order>, AppError> {
    let stamp_column = match next {
        OrderStatus::Shipped => "shipped_at = NOW(),",
        OrderStatus::Delivered => "delivered_at = NOW(),",
        _ => "",
    };

    let order = sqlx::query_as(&format!(
        "UPDATE orders
         SET status = $1, {stamp_column} updated_at = NOW()
         WHERE id = $2 AND status = $3
         RETURNING *"
    ))
    .bind(next.as_str())
    .bind(id)
    .bind(expected.as_str())
    .fetch_optional(conn)
    .await?;

    Ok(order)
}

// Scheduler: payment session expired, kembalikan order supaya bisa bayar ulang
pub async fn revert_payment_pending(pool: &PgPool, id: i32) -> Result<bool, AppError> {
    let result = sqlx::query(
        "UPDATE orders
         SET status = 'vendor_confirmed', updated_at = NOW()
         WHERE id = $1 AND status = 'payment_pending'"
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
