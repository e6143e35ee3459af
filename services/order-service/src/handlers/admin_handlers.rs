use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    domain::{
        assignment::{partition_items_by_vendor, VendorAssignmentResponse},
        notification::notification_type,
        order::{
            ApproveOrderRequest, OrderListResponse, OrderQueryParams, OrderResponse, OrderStatus,
            Pagination, ReassignVendorRequest, RejectOrderRequest,
        },
    },
    error::AppError,
    middleware::auth::AuthAdmin,
    repositories::{assignment_repo, notification_repo, order_repo},
    AppState,
};

use shared::utils::validation;

use super::normalize_paging;

// List orders yang menunggu admin review, paginated
#[utoipa::path(
    get,
    path = "/api/orders/admin/pending",
    tag = "Admin Orders",
    security(("bearer_auth" = [])),
    params(OrderQueryParams),
    responses(
        (status = 200, description = "Orders awaiting review", body = OrderListResponse),
        (status = 403, description = "Admin access required"),
    )
)]
pub async fn pending_orders(
    _auth: AuthAdmin,
    Query(params): Query<OrderQueryParams>,
    State(state): State<AppState>,
) -> Result<Json<OrderListResponse>, AppError> {
    let (page, limit) = normalize_paging(params.page, params.limit);

    let (rows, total) = order_repo::find_pending_admin(&state.db, page, limit).await?;

    Ok(Json(OrderListResponse {
        data: rows.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(page, limit, total),
    }))
}

// List orders dengan vendor rejection yang menunggu rekonsiliasi
#[utoipa::path(
    get,
    path = "/api/orders/admin/flagged",
    tag = "Admin Orders",
    security(("bearer_auth" = [])),
    params(OrderQueryParams),
    responses(
        (status = 200, description = "Orders needing reconciliation", body = OrderListResponse),
        (status = 403, description = "Admin access required"),
    )
)]
pub async fn flagged_orders(
    _auth: AuthAdmin,
    Query(params): Query<OrderQueryParams>,
    State(state): State<AppState>,
) -> Result<Json<OrderListResponse>, AppError> {
    let (page, limit) = normalize_paging(params.page, params.limit);

    let (rows, total) = order_repo::find_flagged_for_reconciliation(&state.db, page, limit).await?;

    Ok(Json(OrderListResponse {
        data: rows.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(page, limit, total),
    }))
}

// Approve order: release ke vendors dengan assignment fan-out per vendor.
// Approve kedua kali menghasilkan state conflict, status tidak berubah.
#[utoipa::path(
    put,
    path = "/api/orders/admin/{id}/approve",
    tag = "Admin Orders",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Order ID")),
    request_body = ApproveOrderRequest,
    responses(
        (status = 200, description = "Order approved and assigned to vendors", body = OrderResponse),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is not awaiting approval"),
    )
)]
pub async fn approve_order(
    auth: AuthAdmin,
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(payload): Json<ApproveOrderRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = order_repo::find_order_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    if order.status != OrderStatus::PendingAdminApproval.as_str() {
        return Err(AppError::conflict(format!(
            "Order is not awaiting approval (current status: {})",
            order.status
        )));
    }

    let items = order_repo::find_items_by_order(&state.db, id).await?;
    if items.is_empty() {
        return Err(AppError::internal("Order has no line items"));
    }

    let by_vendor = partition_items_by_vendor(&items);

    let admin_notes = payload.admin_notes.as_deref().map(str::trim);

    let mut tx = state.db.begin().await?;

    // CAS: race dengan customer-cancel atau admin lain diputuskan di sini
    order_repo::approve_order(&mut tx, id, admin_notes)
        .await?
        .ok_or_else(|| AppError::conflict("Order is not awaiting approval"))?;

    for (&vendor_id, vendor_items) in &by_vendor {
        assignment_repo::insert(&mut tx, id, vendor_id).await?;

        notification_repo::append(
            &mut tx,
            id,
            Some(vendor_id),
            "vendor",
            notification_type::VENDOR_ASSIGNED,
            &format!(
                "Order {} assigned to you ({} item{})",
                order.order_number,
                vendor_items.len(),
                if vendor_items.len() == 1 { "" } else { "s" }
            ),
        )
        .await?;
    }

    // Fan-out selesai, order langsung maju ke vendor_assigned
    let assigned = order_repo::transition_status(
        &mut tx,
        id,
        OrderStatus::AdminApproved,
        OrderStatus::VendorAssigned,
    )
    .await?
    .ok_or_else(|| AppError::internal("Order left admin_approved mid-transaction"))?;

    notification_repo::append(
        &mut tx,
        id,
        Some(order.customer_id),
        "customer",
        notification_type::ORDER_APPROVED,
        &format!(
            "Order {} was approved and sent to {} vendor{} for confirmation",
            order.order_number,
            by_vendor.len(),
            if by_vendor.len() == 1 { "" } else { "s" }
        ),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        "Order {} approved by admin {} and assigned to {} vendors",
        order.order_number,
        auth.user_id,
        by_vendor.len()
    );

    Ok(Json(OrderResponse::from(assigned)))
}

// Reject order: reason wajib, divalidasi server-side
#[utoipa::path(
    put,
    path = "/api/orders/admin/{id}/reject",
    tag = "Admin Orders",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Order ID")),
    request_body = RejectOrderRequest,
    responses(
        (status = 200, description = "Order rejected", body = OrderResponse),
        (status = 400, description = "Rejection reason required"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is not awaiting approval"),
    )
)]
pub async fn reject_order(
    auth: AuthAdmin,
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(payload): Json<RejectOrderRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    if !validation::is_nonblank(&payload.rejection_reason) {
        return Err(AppError::validation("Rejection reason is required"));
    }

    let order = order_repo::find_order_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    let mut tx = state.db.begin().await?;

    let rejected = order_repo::reject_order(&mut tx, id, payload.rejection_reason.trim())
        .await?
        .ok_or_else(|| {
            AppError::conflict(format!(
                "Order is not awaiting approval (current status: {})",
                order.status
            ))
        })?;

    notification_repo::append(
        &mut tx,
        id,
        Some(rejected.customer_id),
        "customer",
        notification_type::ORDER_REJECTED,
        &format!(
            "Order {} was rejected: {}",
            rejected.order_number,
            payload.rejection_reason.trim()
        ),
    )
    .await?;

    tx.commit().await?;

    tracing::info!("Order {} rejected by admin {}", rejected.order_number, auth.user_id);

    Ok(Json(OrderResponse::from(rejected)))
}

// Rekonsiliasi: pindahkan items vendor yang reject ke vendor lain.
// Assignment vendor tujuan direset ke pending untuk di-confirm ulang.
#[utoipa::path(
    put,
    path = "/api/orders/admin/{id}/reassign",
    tag = "Admin Orders",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Order ID")),
    request_body = ReassignVendorRequest,
    responses(
        (status = 200, description = "Items reassigned", body = VendorAssignmentResponse),
        (status = 400, description = "Invalid vendor pair"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Order or assignment not found"),
        (status = 409, description = "Assignment is not rejected"),
    )
)]
pub async fn reassign_vendor(
    auth: AuthAdmin,
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(payload): Json<ReassignVendorRequest>,
) -> Result<Json<VendorAssignmentResponse>, AppError> {
    if payload.from_vendor_id == payload.to_vendor_id {
        return Err(AppError::validation(
            "Source and target vendor must be different",
        ));
    }

    let order = order_repo::find_order_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    if order.status != OrderStatus::VendorAssigned.as_str() {
        return Err(AppError::conflict(format!(
            "Order is not in vendor assignment (current status: {})",
            order.status
        )));
    }

    let source =
        assignment_repo::find_by_order_and_vendor(&state.db, id, payload.from_vendor_id)
            .await?
            .ok_or_else(|| AppError::not_found("Vendor has no assignment on this order"))?;

    if !source.is_rejected() {
        return Err(AppError::conflict(
            "Only a rejected assignment can be reassigned",
        ));
    }

    let mut tx = state.db.begin().await?;

    let assignment =
        assignment_repo::reassign(&mut tx, id, payload.from_vendor_id, payload.to_vendor_id)
            .await?;

    notification_repo::append(
        &mut tx,
        id,
        Some(payload.to_vendor_id),
        "vendor",
        notification_type::VENDOR_ASSIGNED,
        &format!(
            "Order {} reassigned to you after another vendor declined",
            order.order_number
        ),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        "Order {} items moved from vendor {} to vendor {} by admin {}",
        order.order_number,
        payload.from_vendor_id,
        payload.to_vendor_id,
        auth.user_id
    );

    Ok(Json(VendorAssignmentResponse::from(assignment)))
}
