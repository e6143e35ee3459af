use axum::{
    extract::{Path, State},
    Form, Json,
};

use crate::{
    domain::{
        notification::notification_type,
        order::OrderStatus,
        payment::{
            InitializePaymentRequest, IpnAckResponse, Payment, PaymentSessionResponse,
            PaymentStatus, SslcommerzIpnPayload,
        },
    },
    error::AppError,
    handlers::sslcommerz_service::SslcommerzService,
    middleware::auth::AuthCustomer,
    repositories::{assignment_repo, notification_repo, order_repo, payment_repo},
    AppState,
};

// Initialize payment session untuk sebuah order (customer)
#[utoipa::path(
    post,
    path = "/api/orders/{id}/payment",
    tag = "Payments",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Payment session created", body = PaymentSessionResponse),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is not payable"),
        (status = 502, description = "Payment gateway error"),
    )
)]
pub async fn init_order_payment(
    auth: AuthCustomer,
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<PaymentSessionResponse>, AppError> {
    let session = initialize_for_order(&state, &auth, id).await?;
    Ok(Json(session))
}

// Checkout-time payment init: same gate, order-scoped payload
#[utoipa::path(
    post,
    path = "/api/payment/initialize",
    tag = "Payments",
    security(("bearer_auth" = [])),
    request_body = InitializePaymentRequest,
    responses(
        (status = 200, description = "Payment session created", body = PaymentSessionResponse),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is not payable"),
        (status = 502, description = "Payment gateway error"),
    )
)]
pub async fn initialize_payment(
    auth: AuthCustomer,
    State(state): State<AppState>,
    Json(payload): Json<InitializePaymentRequest>,
) -> Result<Json<PaymentSessionResponse>, AppError> {
    let session = initialize_for_order(&state, &auth, payload.order_id).await?;
    Ok(Json(session))
}

// IPN callback dari SSLCommerz. Tidak membawa bearer token; payload mentah
// tidak dipercaya - settle hanya setelah verifikasi via validator API.
#[utoipa::path(
    post,
    path = "/api/payment/ipn",
    tag = "Payments",
    request_body(content = SslcommerzIpnPayload, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "IPN acknowledged", body = IpnAckResponse),
        (status = 400, description = "Malformed IPN payload"),
        (status = 404, description = "Unknown transaction"),
        (status = 502, description = "Validator API error"),
    )
)]
pub async fn payment_ipn(
    State(state): State<AppState>,
    Form(payload): Form<SslcommerzIpnPayload>,
) -> Result<Json<IpnAckResponse>, AppError> {
    tracing::info!(
        "IPN received for transaction {} with status {}",
        payload.tran_id,
        payload.status
    );

    let payment = payment_repo::find_by_transaction_id(&state.db, &payload.tran_id)
        .await?
        .ok_or_else(|| AppError::not_found("Unknown transaction"))?;

    // Duplicate/late IPN untuk payment yang sudah settled: ack tanpa
    // transisi kedua
    if payment.is_settled() {
        return Ok(Json(IpnAckResponse {
            success: true,
            message: "Payment already settled".to_string(),
            transaction_id: payment.transaction_id,
            status: payment.status,
        }));
    }

    match payload.status.as_str() {
        "VALID" | "VALIDATED" => settle_payment(&state, &payment, &payload).await,
        "FAILED" => mark_gateway_outcome(&state, &payment, PaymentStatus::Failed).await,
        "CANCELLED" => mark_gateway_outcome(&state, &payment, PaymentStatus::Cancelled).await,
        "EXPIRED" => mark_gateway_outcome(&state, &payment, PaymentStatus::Expired).await,
        other => Err(AppError::validation(format!(
            "Unknown transaction status: {}",
            other
        ))),
    }
}

// Payment gate: order payable hanya saat semua vendor sudah confirm
async fn initialize_for_order(
    state: &AppState,
    auth: &AuthCustomer,
    order_id: i32,
) -> Result<PaymentSessionResponse, AppError> {
    let order = order_repo::find_order_by_id(&state.db, order_id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    if order.customer_id != auth.user_id {
        return Err(AppError::forbidden("You do not have access to this order"));
    }

    let status = order
        .current_status()
        .ok_or_else(|| AppError::internal("Order has an unrecognized status"))?;

    // Re-init pada order yang sudah paid tidak boleh charge ulang
    if matches!(
        status,
        OrderStatus::Paid | OrderStatus::Processing | OrderStatus::Shipped | OrderStatus::Delivered
    ) || payment_repo::has_settled_payment(&state.db, order.id).await?
    {
        return Err(AppError::conflict("Order has already been paid"));
    }

    if !status.is_payable() {
        return Err(AppError::conflict(format!(
            "Order is not payable until every vendor confirms (current status: {})",
            order.status
        )));
    }

    // Idempotent re-init: session pending yang masih berlaku di-reuse
    if let Some(existing) = payment_repo::find_pending_by_order(&state.db, order.id).await? {
        if existing.is_reusable() {
            if let Some(gateway_url) = existing.gateway_url.clone() {
                tracing::info!(
                    "Reusing payment session {} for order {}",
                    existing.transaction_id,
                    order.order_number
                );
                return Ok(PaymentSessionResponse {
                    transaction_id: existing.transaction_id,
                    order_number: existing.order_number,
                    amount: existing.amount,
                    currency: existing.currency,
                    gateway_url,
                    expired_at: existing.expired_at,
                });
            }
        }
    }

    let items = order_repo::find_items_by_order(&state.db, order.id).await?;

    let transaction_id = Payment::generate_transaction_id(&order.order_number);
    let gateway = SslcommerzService::from_config(state.http_client.clone(), &state.config);

    let session_request =
        gateway.build_session_request(&order, &transaction_id, items.len() as i32);
    let session = gateway.create_session(&session_request).await?;

    let gateway_url = session
        .gateway_page_url
        .ok_or_else(|| AppError::gateway("SSLCommerz response missing GatewayPageURL"))?;

    let expired_at = Payment::generate_expiry_time();

    let mut tx = state.db.begin().await?;

    let created = payment_repo::create(
        &mut tx,
        order.id,
        &order.order_number,
        &transaction_id,
        session.sessionkey.as_deref(),
        Some(&gateway_url),
        order.total,
        "BDT",
        expired_at,
    )
    .await?;

    // Masuk window payment_pending; re-init saat sudah di window tidak
    // mengubah status
    if status == OrderStatus::VendorConfirmed {
        order_repo::transition_status(
            &mut tx,
            order.id,
            OrderStatus::VendorConfirmed,
            OrderStatus::PaymentPending,
        )
        .await?
        .ok_or_else(|| AppError::conflict("Order state changed, please retry payment"))?;
    }

    tx.commit().await?;

    tracing::info!(
        "Payment session {} created for order {} (amount {})",
        created.transaction_id,
        order.order_number,
        created.amount
    );

    Ok(PaymentSessionResponse {
        transaction_id: created.transaction_id,
        order_number: created.order_number,
        amount: created.amount,
        currency: created.currency,
        gateway_url,
        expired_at: created.expired_at,
    })
}

// Settle: verifikasi validator API dulu, lalu conditional settle payment
// dan CAS order ke paid
async fn settle_payment(
    state: &AppState,
    payment: &Payment,
    payload: &SslcommerzIpnPayload,
) -> Result<Json<IpnAckResponse>, AppError> {
    let val_id = payload
        .val_id
        .as_deref()
        .ok_or_else(|| AppError::validation("val_id is required for a VALID IPN"))?;

    let gateway = SslcommerzService::from_config(state.http_client.clone(), &state.config);
    let verdict = gateway.validate_ipn(val_id).await?;

    if !matches!(verdict.status.as_str(), "VALID" | "VALIDATED") {
        tracing::warn!(
            "Validator rejected transaction {} (status {})",
            payment.transaction_id,
            verdict.status
        );
        return Err(AppError::gateway("Gateway did not validate the transaction"));
    }

    if verdict.tran_id.as_deref() != Some(payment.transaction_id.as_str()) {
        return Err(AppError::conflict(
            "Validator response is for a different transaction",
        ));
    }

    let validated_amount: f64 = verdict
        .amount
        .as_deref()
        .and_then(|a| a.parse().ok())
        .unwrap_or(0.0);
    if (validated_amount - payment.amount).abs() > 0.01 {
        return Err(AppError::conflict(
            "Validated amount does not match the payment session",
        ));
    }

    let assignments = assignment_repo::find_by_order(&state.db, payment.order_id).await?;

    let mut tx = state.db.begin().await?;

    let settled = match payment_repo::mark_success(&mut tx, &payment.transaction_id).await? {
        Some(p) => p,
        None => {
            // Race dengan IPN lain yang sudah settle duluan
            return Ok(Json(IpnAckResponse {
                success: true,
                message: "Payment already settled".to_string(),
                transaction_id: payment.transaction_id.clone(),
                status: PaymentStatus::Success.as_str().to_string(),
            }));
        }
    };

    match order_repo::mark_paid(&mut tx, settled.order_id).await? {
        Some(order) => {
            notification_repo::append(
                &mut tx,
                order.id,
                Some(order.customer_id),
                "customer",
                notification_type::ORDER_PAID,
                &format!("Payment received for order {}", order.order_number),
            )
            .await?;

            for assignment in &assignments {
                notification_repo::append(
                    &mut tx,
                    order.id,
                    Some(assignment.vendor_id),
                    "vendor",
                    notification_type::ORDER_PAID,
                    &format!(
                        "Order {} has been paid. Please prepare your items for fulfillment.",
                        order.order_number
                    ),
                )
                .await?;
            }

            tracing::info!(
                "Order {} marked paid via transaction {}",
                order.order_number,
                settled.transaction_id
            );
        }
        None => {
            // Payment ter-capture tapi order sudah keluar dari payable
            // window; jangan buang capture-nya, flag untuk admin
            tracing::error!(
                "Payment {} settled but order {} was not payable",
                settled.transaction_id,
                settled.order_id
            );
        }
    }

    tx.commit().await?;

    Ok(Json(IpnAckResponse {
        success: true,
        message: "Payment settled".to_string(),
        transaction_id: settled.transaction_id,
        status: settled.status,
    }))
}

// Gateway melaporkan kegagalan: tandai session, order tetap di payable
// window sehingga customer bisa langsung init ulang
async fn mark_gateway_outcome(
    state: &AppState,
    payment: &Payment,
    outcome: PaymentStatus,
) -> Result<Json<IpnAckResponse>, AppError> {
    let mut conn = state.db.acquire().await?;

    let updated = payment_repo::mark_unsettled(&mut conn, &payment.transaction_id, outcome).await?;

    let status = updated
        .map(|p| p.status)
        .unwrap_or_else(|| payment.status.clone());

    tracing::info!(
        "Payment {} marked {} from gateway IPN",
        payment.transaction_id,
        status
    );

    Ok(Json(IpnAckResponse {
        success: true,
        message: format!("Payment marked {}", status),
        transaction_id: payment.transaction_id.clone(),
        status,
    }))
}
