use sqlx::{PgConnection, PgPool};

use crate::{domain::notification::OrderNotification, error::AppError};

// Append notification entry; dipanggil dalam transaksi transisi yang memicunya
pub async fn append(
    conn: &mut PgConnection,
    order_id: i32,
    recipient_id: Option<i32>,
    recipient_role: &str,
    notification_type: &str,
    message: &str,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO order_notifications (
            order_id, recipient_id, recipient_role, notification_type, message
        ) VALUES ($1, $2, $3, $4, $5)"
    )
    .bind(order_id)
    .bind(recipient_id)
    .bind(recipient_role)
    .bind(notification_type)
    .bind(message)
    .execute(conn)
    .await?;

    Ok(())
}

// Ambil audit trail sebuah order, urut kronologis
pub async fn find_by_order(
    pool: &PgPool,
    order_id: i32,
) -> Result<Vec<OrderNotification>, AppError> {
    let notifications = sqlx::query_as(
        "SELECT * FROM order_notifications WHERE order_id = $1 ORDER BY created_at ASC, id ASC"
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;

    Ok(notifications)
}
