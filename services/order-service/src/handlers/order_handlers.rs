use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    domain::{
        assignment::VendorAssignmentResponse,
        notification::{notification_type, NotificationResponse},
        order::{
            CancelOrderRequest, CreateOrderRequest, FulfillmentUpdateRequest, Order,
            OrderDetailResponse, OrderListResponse, OrderQueryParams, OrderResponse, OrderStatus,
            Pagination,
        },
    },
    error::AppError,
    middleware::auth::{AuthCustomer, AuthUser},
    repositories::{assignment_repo, notification_repo, order_repo},
    AppState,
};

use shared::utils::validation;

use super::normalize_paging;

// Create order baru dari checkout submission (customer)
#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Orders",
    security(("bearer_auth" = [])),
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created, awaiting admin approval", body = OrderResponse),
        (status = 400, description = "Invalid checkout payload"),
        (status = 409, description = "Product unavailable"),
    )
)]
pub async fn create_order(
    auth: AuthCustomer,
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    tracing::info!(
        "Customer {} ({}) submitting checkout with {} items",
        auth.user_id,
        auth.email,
        payload.items.len()
    );

    validate_create_order(&payload)?;

    // Resolve setiap item dari catalog-service: harga, nama, dan vendor
    // adalah server-authoritative, bukan dari client
    #[derive(serde::Deserialize)]
    struct ProductOrderInfo {
        id: i32,
        name: String,
        vendor_id: i32,
        price: f64,
        is_active: bool,
    }

    let mut items = Vec::with_capacity(payload.items.len());
    for line in &payload.items {
        let url = format!(
            "{}/api/products/{}/order-info",
            state.config.catalog_service_url, line.product_id
        );

        let response = state
            .http_client
            .get(&url)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| AppError::internal(format!("Failed to reach catalog-service: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::not_found(format!(
                "Product {} is not available",
                line.product_id
            )));
        }

        let product: ProductOrderInfo = response
            .json()
            .await
            .map_err(|e| AppError::internal(format!("Failed to parse catalog response: {}", e)))?;

        if !product.is_active {
            return Err(AppError::conflict(format!(
                "Product {} is no longer sold",
                product.name
            )));
        }

        items.push(order_repo::NewOrderItem {
            product_id: product.id,
            product_name: product.name,
            quantity: line.quantity,
            unit_price: product.price,
            vendor_id: product.vendor_id,
        });
    }

    let total: f64 = items.iter().map(|i| i.unit_price * i.quantity as f64).sum();
    if !validation::is_valid_amount(total) {
        return Err(AppError::validation("Order total is out of accepted range"));
    }

    let order = order_repo::create_order(
        &state.db,
        auth.user_id,
        payload.customer_name.trim(),
        payload.customer_email.trim(),
        payload.shipping_address.trim(),
        payload.contact_phone.trim(),
        &items,
    )
    .await?;

    tracing::info!("Order {} created, pending admin approval", order.order_number);

    Ok(Json(OrderResponse::from(order)))
}

// List orders milik customer, paginated dengan optional status filter
#[utoipa::path(
    get,
    path = "/api/orders/my-orders",
    tag = "Orders",
    security(("bearer_auth" = [])),
    params(OrderQueryParams),
    responses(
        (status = 200, description = "Customer order list", body = OrderListResponse),
        (status = 400, description = "Unknown status filter"),
    )
)]
pub async fn my_orders(
    auth: AuthCustomer,
    Query(params): Query<OrderQueryParams>,
    State(state): State<AppState>,
) -> Result<Json<OrderListResponse>, AppError> {
    if let Some(filter) = &params.status {
        if OrderStatus::from_str(filter).is_none() {
            return Err(AppError::validation("Unknown status filter"));
        }
    }

    let (page, limit) = normalize_paging(params.page, params.limit);

    let (rows, total) =
        order_repo::find_orders_by_customer(&state.db, auth.user_id, params.status, page, limit)
            .await?;

    Ok(Json(OrderListResponse {
        data: rows.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(page, limit, total),
    }))
}

// Get order detail: items, vendor assignments, audit trail, eligibility
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "Orders",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order detail", body = OrderDetailResponse),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Order not found"),
    )
)]
pub async fn get_order(
    auth: AuthUser,
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<OrderDetailResponse>, AppError> {
    let order = order_repo::find_order_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    authorize_order_access(&state, &auth, &order).await?;

    let items = order_repo::find_items_by_order(&state.db, id).await?;
    let assignments = assignment_repo::find_by_order(&state.db, id).await?;
    let notifications = notification_repo::find_by_order(&state.db, id).await?;

    let progress = order
        .current_status()
        .map(|s| s.progress_percent())
        .unwrap_or(0);
    let can_cancel = order.can_cancel();
    let can_pay_now = order.can_pay_now();

    Ok(Json(OrderDetailResponse {
        order: OrderResponse::from(order),
        items,
        vendor_assignments: assignments
            .into_iter()
            .map(VendorAssignmentResponse::from)
            .collect(),
        notifications: notifications
            .into_iter()
            .map(NotificationResponse::from)
            .collect(),
        progress,
        can_cancel,
        can_pay_now,
    }))
}

// Cancel order (customer). Eligibility di-recheck terhadap persisted state;
// client-computed canCancelOrder tidak pernah dipercaya.
#[utoipa::path(
    put,
    path = "/api/orders/{id}/cancel",
    tag = "Orders",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Order ID")),
    request_body = CancelOrderRequest,
    responses(
        (status = 200, description = "Order cancelled", body = OrderResponse),
        (status = 400, description = "Reason required"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is past the cancellable window"),
    )
)]
pub async fn cancel_order(
    auth: AuthCustomer,
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(payload): Json<CancelOrderRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    if !validation::is_nonblank(&payload.reason) {
        return Err(AppError::validation("Cancellation reason is required"));
    }

    let order = order_repo::find_order_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    if order.customer_id != auth.user_id {
        return Err(AppError::forbidden("You do not have access to this order"));
    }

    let assignments = assignment_repo::find_by_order(&state.db, id).await?;

    let mut tx = state.db.begin().await?;

    // Conditional update: status window dicek di SQL, race dengan
    // admin-approve/vendor-ship diputuskan oleh database
    let cancelled = order_repo::cancel_order(&mut tx, id, payload.reason.trim())
        .await?
        .ok_or_else(|| {
            AppError::conflict(format!(
                "Order can no longer be cancelled (current status: {})",
                order.status
            ))
        })?;

    notification_repo::append(
        &mut tx,
        id,
        None,
        "admin",
        notification_type::ORDER_CANCELLED,
        &format!(
            "Order {} cancelled by customer: {}",
            cancelled.order_number,
            payload.reason.trim()
        ),
    )
    .await?;

    for assignment in &assignments {
        notification_repo::append(
            &mut tx,
            id,
            Some(assignment.vendor_id),
            "vendor",
            notification_type::ORDER_CANCELLED,
            &format!("Order {} was cancelled by the customer", cancelled.order_number),
        )
        .await?;
    }

    tx.commit().await?;

    tracing::info!("Order {} cancelled by customer {}", id, auth.user_id);

    Ok(Json(OrderResponse::from(cancelled)))
}

// Fulfillment step update: paid -> processing -> shipped -> delivered
#[utoipa::path(
    put,
    path = "/api/orders/{id}/fulfillment",
    tag = "Orders",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Order ID")),
    request_body = FulfillmentUpdateRequest,
    responses(
        (status = 200, description = "Fulfillment status updated", body = OrderResponse),
        (status = 400, description = "Not a fulfillment status"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Step not reachable from current status"),
    )
)]
pub async fn update_fulfillment(
    auth: AuthUser,
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(payload): Json<FulfillmentUpdateRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    let target = OrderStatus::from_str(&payload.status)
        .ok_or_else(|| AppError::validation("Unknown status"))?;

    if !target.is_fulfillment_status() {
        return Err(AppError::validation(
            "Only processing, shipped, or delivered can be requested here",
        ));
    }

    let order = order_repo::find_order_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    // Fulfillment hanya oleh admin atau vendor yang assigned ke order ini
    match auth.role.as_str() {
        "admin" => {}
        "vendor" => {
            let assignment =
                assignment_repo::find_by_order_and_vendor(&state.db, id, auth.user_id).await?;
            if assignment.is_none() {
                return Err(AppError::forbidden("You are not assigned to this order"));
            }
        }
        _ => return Err(AppError::forbidden("Vendor or admin access required")),
    }

    // Satu langkah per request, tidak boleh loncat
    let expected = match target {
        OrderStatus::Processing => OrderStatus::Paid,
        OrderStatus::Shipped => OrderStatus::Processing,
        OrderStatus::Delivered => OrderStatus::Shipped,
        _ => unreachable!("guarded by is_fulfillment_status"),
    };

    let mut tx = state.db.begin().await?;

    let updated = order_repo::advance_fulfillment(&mut tx, id, expected, target)
        .await?
        .ok_or_else(|| {
            AppError::conflict(format!(
                "Cannot move to {} from current status {}",
                target.as_str(),
                order.status
            ))
        })?;

    notification_repo::append(
        &mut tx,
        id,
        Some(updated.customer_id),
        "customer",
        notification_type::FULFILLMENT_UPDATE,
        &format!("Order {} is now {}", updated.order_number, target.as_str()),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        "Order {} moved to {} by {} {}",
        id,
        target.as_str(),
        auth.role,
        auth.user_id
    );

    Ok(Json(OrderResponse::from(updated)))
}

// Akses order detail: customer pemilik, admin, atau vendor yang assigned
async fn authorize_order_access(
    state: &AppState,
    auth: &AuthUser,
    order: &Order,
) -> Result<(), AppError> {
    match auth.role.as_str() {
        "admin" => Ok(()),
        "customer" if order.customer_id == auth.user_id => Ok(()),
        "vendor" => {
            let assignment =
                assignment_repo::find_by_order_and_vendor(&state.db, order.id, auth.user_id)
                    .await?;
            if assignment.is_some() {
                Ok(())
            } else {
                Err(AppError::forbidden("You do not have access to this order"))
            }
        }
        _ => Err(AppError::forbidden("You do not have access to this order")),
    }
}

// Validasi checkout payload
fn validate_create_order(payload: &CreateOrderRequest) -> Result<(), AppError> {
    if payload.items.is_empty() {
        return Err(AppError::validation("Order must contain at least one item"));
    }

    if payload.customer_name.trim().is_empty() {
        return Err(AppError::validation("Customer name is required"));
    }

    if !validation::is_valid_email(payload.customer_email.trim()) {
        return Err(AppError::validation("Invalid email format"));
    }

    if !validation::is_valid_phone(payload.contact_phone.trim()) {
        return Err(AppError::validation("Invalid phone number format"));
    }

    if payload.shipping_address.trim().is_empty() {
        return Err(AppError::validation("Shipping address is required"));
    }

    for line in &payload.items {
        if !validation::is_valid_quantity(line.quantity) {
            return Err(AppError::validation(format!(
                "Invalid quantity for product {}",
                line.product_id
            )));
        }
    }

    Ok(())
}
