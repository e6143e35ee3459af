use std::time::Duration;

use crate::config::AppState;
use crate::repositories::{order_repo, payment_repo};

/// Background scheduler untuk order service maintenance
pub struct OrderScheduler {
    state: AppState,
}

impl OrderScheduler {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Start background payment-expiry sweep
    pub fn start(self) {
        if std::env::var("DISABLE_SCHEDULER").unwrap_or_else(|_| "false".to_string()) == "true" {
            tracing::info!("Order scheduler disabled via DISABLE_SCHEDULER environment variable");
            return;
        }

        tracing::info!("Starting Order Service Background Scheduler...");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(600)); // Every 10 minutes

            loop {
                interval.tick().await;

                tracing::info!("Running payment-expiry sweep...");

                let db = self.state.db.clone();
                tokio::spawn(async move {
                    for attempt in 1..=3 {
                        match sweep_expired_payments(&db).await {
                            Ok(reverted) => {
                                if reverted > 0 {
                                    tracing::info!(
                                        "Reverted {} orders with expired payment sessions",
                                        reverted
                                    );
                                }
                                break;
                            }
                            Err(e) => {
                                if attempt == 3 {
                                    tracing::error!(
                                        "Payment-expiry sweep failed after 3 attempts: {}",
                                        e
                                    );
                                } else {
                                    tokio::time::sleep(Duration::from_millis(1000)).await;
                                }
                            }
                        }
                    }
                });
            }
        });
    }
}

// Expire session pending yang lewat window, lalu kembalikan order
// payment_pending yang tidak punya session hidup lagi ke vendor_confirmed
async fn sweep_expired_payments(db: &sqlx::PgPool) -> Result<u64, crate::error::AppError> {
    let order_ids = payment_repo::expire_stale_sessions(db).await?;

    let mut reverted = 0u64;
    for order_id in order_ids {
        // Order bisa punya session lain yang masih pending
        if payment_repo::has_pending_session(db, order_id).await? {
            continue;
        }

        if order_repo::revert_payment_pending(db, order_id).await? {
            tracing::info!(
                "Order {} reverted to vendor_confirmed after payment session expiry",
                order_id
            );
            reverted += 1;
        }
    }

    Ok(reverted)
}
