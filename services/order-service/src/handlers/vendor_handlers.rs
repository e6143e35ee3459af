use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    domain::{
        assignment::{VendorAssignmentResponse, VendorConfirmRequest, VendorOrderListResponse,
            VendorRejectRequest},
        notification::notification_type,
        order::{OrderQueryParams, OrderStatus, Pagination},
    },
    error::AppError,
    middleware::auth::AuthVendor,
    repositories::{assignment_repo, notification_repo, order_repo},
    AppState,
};

use shared::utils::validation;

use super::normalize_paging;

// List orders yang punya items assigned ke vendor pemanggil
#[utoipa::path(
    get,
    path = "/api/orders/vendor/assigned",
    tag = "Vendor Orders",
    security(("bearer_auth" = [])),
    params(OrderQueryParams),
    responses(
        (status = 200, description = "Assigned orders", body = VendorOrderListResponse),
        (status = 403, description = "Vendor access required"),
    )
)]
pub async fn assigned_orders(
    auth: AuthVendor,
    Query(params): Query<OrderQueryParams>,
    State(state): State<AppState>,
) -> Result<Json<VendorOrderListResponse>, AppError> {
    if let Some(filter) = &params.status {
        if OrderStatus::from_str(filter).is_none() {
            return Err(AppError::validation("Unknown status filter"));
        }
    }

    let (page, limit) = normalize_paging(params.page, params.limit);

    let (rows, total) =
        assignment_repo::find_assigned_orders(&state.db, auth.user_id, params.status, page, limit)
            .await?;

    Ok(Json(VendorOrderListResponse {
        data: rows.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(page, limit, total),
    }))
}

// Vendor confirm bagiannya. Order maju ke vendor_confirmed hanya jika
// SEMUA assignment sudah confirmed.
#[utoipa::path(
    put,
    path = "/api/orders/vendor/{id}/confirm",
    tag = "Vendor Orders",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Order ID")),
    request_body = VendorConfirmRequest,
    responses(
        (status = 200, description = "Assignment confirmed", body = VendorAssignmentResponse),
        (status = 403, description = "Not assigned to this order"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order not in vendor assignment, or already decided"),
    )
)]
pub async fn confirm_assignment(
    auth: AuthVendor,
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(payload): Json<VendorConfirmRequest>,
) -> Result<Json<VendorAssignmentResponse>, AppError> {
    let order = load_assigned_order(&state, id, auth.user_id).await?;

    let vendor_notes = payload.vendor_notes.as_deref().map(str::trim);

    let mut tx = state.db.begin().await?;

    let assignment = assignment_repo::confirm(&mut tx, id, auth.user_id, vendor_notes)
        .await?
        .ok_or_else(|| AppError::conflict("Assignment has already been decided"))?;

    // Aggregate rule: semua vendor confirmed -> order-level advance
    let unconfirmed = assignment_repo::count_unconfirmed(&mut tx, id).await?;
    if unconfirmed == 0 {
        let advanced = order_repo::transition_status(
            &mut tx,
            id,
            OrderStatus::VendorAssigned,
            OrderStatus::VendorConfirmed,
        )
        .await?;

        if let Some(confirmed_order) = advanced {
            notification_repo::append(
                &mut tx,
                id,
                Some(confirmed_order.customer_id),
                "customer",
                notification_type::VENDOR_CONFIRMED,
                &format!(
                    "All vendors confirmed order {}. You can now proceed to payment.",
                    confirmed_order.order_number
                ),
            )
            .await?;
        } else {
            // Order status bergeser di tengah transaksi (mis. cancel menang race)
            return Err(AppError::conflict(
                "Order state changed while confirming, please retry",
            ));
        }
    }

    tx.commit().await?;

    tracing::info!(
        "Vendor {} confirmed assignment on order {} ({} unconfirmed left)",
        auth.user_id,
        order.order_number,
        unconfirmed
    );

    Ok(Json(VendorAssignmentResponse::from(assignment)))
}

// Vendor reject bagiannya (reason wajib). Order tetap vendor_assigned
// dan muncul di admin flagged list untuk rekonsiliasi.
#[utoipa::path(
    put,
    path = "/api/orders/vendor/{id}/reject",
    tag = "Vendor Orders",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Order ID")),
    request_body = VendorRejectRequest,
    responses(
        (status = 200, description = "Assignment rejected", body = VendorAssignmentResponse),
        (status = 400, description = "Rejection reason required"),
        (status = 403, description = "Not assigned to this order"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order not in vendor assignment, or already decided"),
    )
)]
pub async fn reject_assignment(
    auth: AuthVendor,
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(payload): Json<VendorRejectRequest>,
) -> Result<Json<VendorAssignmentResponse>, AppError> {
    if !validation::is_nonblank(&payload.rejection_reason) {
        return Err(AppError::validation("Rejection reason is required"));
    }

    let order = load_assigned_order(&state, id, auth.user_id).await?;

    let reason = payload.rejection_reason.trim();

    let mut tx = state.db.begin().await?;

    let assignment = assignment_repo::reject(&mut tx, id, auth.user_id, reason)
        .await?
        .ok_or_else(|| AppError::conflict("Assignment has already been decided"))?;

    notification_repo::append(
        &mut tx,
        id,
        None,
        "admin",
        notification_type::VENDOR_REJECTED,
        &format!(
            "Vendor {} rejected their items on order {}: {}",
            auth.user_id, order.order_number, reason
        ),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        "Vendor {} rejected assignment on order {}",
        auth.user_id,
        order.order_number
    );

    Ok(Json(VendorAssignmentResponse::from(assignment)))
}

// Guard bersama untuk vendor decision endpoints: order harus ada,
// masih vendor_assigned, dan caller punya assignment pending di dalamnya
async fn load_assigned_order(
    state: &AppState,
    order_id: i32,
    vendor_id: i32,
) -> Result<crate::domain::order::Order, AppError> {
    let order = order_repo::find_order_by_id(&state.db, order_id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    if order.status != OrderStatus::VendorAssigned.as_str() {
        return Err(AppError::conflict(format!(
            "Order is not awaiting vendor confirmation (current status: {})",
            order.status
        )));
    }

    let assignment = assignment_repo::find_by_order_and_vendor(&state.db, order_id, vendor_id)
        .await?
        .ok_or_else(|| AppError::forbidden("You have no assignment on this order"))?;

    if !assignment.is_pending() {
        return Err(AppError::conflict(format!(
            "Assignment has already been {}",
            assignment.status
        )));
    }

    Ok(order)
}
