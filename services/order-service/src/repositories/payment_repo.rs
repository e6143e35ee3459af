use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::{
    domain::payment::{Payment, PaymentStatus},
    error::AppError,
};

// Create payment session row baru
#[allow(clippy::too_many_arguments)]
pub async fn create(
    conn: &mut PgConnection,
    order_id: i32,
    order_number: &str,
    transaction_id: &str,
    session_key: Option<&str>,
    gateway_url: Option<&str>,
    amount: f64,
    currency: &str,
    expired_at: DateTime<Utc>,
) -> Result<Payment, AppError> {
    let payment = sqlx::query_as(
        "INSERT INTO payments (
            order_id, order_number, transaction_id, session_key,
            gateway_url, amount, currency, status, expired_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *"
    )
    .bind(order_id)
    .bind(order_number)
    .bind(transaction_id)
    .bind(session_key)
    .bind(gateway_url)
    .bind(amount)
    .bind(currency)
    .bind(PaymentStatus::Pending.as_str())
    .bind(expired_at)
    .fetch_one(conn)
    .await?;

    Ok(payment)
}

// Ambil payment by gateway transaction ID
pub async fn find_by_transaction_id(
    pool: &PgPool,
    transaction_id: &str,
) -> Result<Option<Payment>, AppError> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE transaction_id = $1")
        .bind(transaction_id)
        .fetch_optional(pool)
        .await?;

    Ok(payment)
}

// Ambil session pending terbaru milik sebuah order (untuk idempotent re-init)
pub async fn find_pending_by_order(
    pool: &PgPool,
    order_id: i32,
) -> Result<Option<Payment>, AppError> {
    let payment = sqlx::query_as(
        "SELECT * FROM payments
         WHERE order_id = $1 AND status = 'pending'
         ORDER BY created_at DESC
         LIMIT 1"
    )
    .bind(order_id)
    .fetch_optional(pool)
    .await?;

    Ok(payment)
}

// Cek apakah order sudah punya payment yang settled
pub async fn has_settled_payment(pool: &PgPool, order_id: i32) -> Result<bool, AppError> {
    let exists: (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM payments WHERE order_id = $1 AND status = 'success')"
    )
    .bind(order_id)
    .fetch_one(pool)
    .await?;

    Ok(exists.0)
}

// Settle payment: conditional update pending -> success supaya duplicate IPN
// tidak settle dua kali
pub async fn mark_success(
    conn: &mut PgConnection,
    transaction_id: &str,
) -> Result<Option<Payment>, AppError> {
    let payment = sqlx::query_as(
        "UPDATE payments
         SET status = 'success', paid_at = NOW(), updated_at = NOW()
         WHERE transaction_id = $1 AND status = 'pending'
         RETURNING *"
    )
    .bind(transaction_id)
    .fetch_optional(conn)
    .await?;

    Ok(payment)
}

// Tandai payment gagal/dibatalkan/expired dari gateway callback
pub async fn mark_unsettled(
    conn: &mut PgConnection,
    transaction_id: &str,
    status: PaymentStatus,
) -> Result<Option<Payment>, AppError> {
    let payment = sqlx::query_as(
        "UPDATE payments
         SET status = $1, updated_at = NOW()
         WHERE transaction_id = $2 AND status = 'pending'
         RETURNING *"
    )
    .bind(status.as_str())
    .bind(transaction_id)
    .fetch_optional(conn)
    .await?;

    Ok(payment)
}

// Scheduler sweep: expire semua session pending yang lewat window.
// Return order_ids yang terdampak untuk revert status order.
pub async fn expire_stale_sessions(pool: &PgPool) -> Result<Vec<i32>, AppError> {
    let order_ids: Vec<(i32,)> = sqlx::query_as(
        "UPDATE payments
         SET status = 'expired', updated_at = NOW()
         WHERE status = 'pending' AND expired_at < NOW()
         RETURNING order_id"
    )
    .fetch_all(pool)
    .await?;

    Ok(order_ids.into_iter().map(|(id,)| id).collect())
}

// Cek order masih punya session pending yang belum expired
pub async fn has_pending_session(pool: &PgPool, order_id: i32) -> Result<bool, AppError> {
    let exists: (bool,) = sqlx::query_as(
        "SELECT EXISTS(
            SELECT 1 FROM payments
            WHERE order_id = $1 AND status = 'pending' AND expired_at >= NOW()
        )"
    )
    .bind(order_id)
    .fetch_one(pool)
    .await?;

    Ok(exists.0)
}
