// API Routes untuk order-service dengan OpenAPI documentation
use axum::{
    extract::State,
    http::{header, HeaderValue},
    routing::{get, post, put},
    Json, Router,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::{check_db_health, AppState, HealthStatus},
    handlers::{admin_handlers, order_handlers, payment_handlers, vendor_handlers},
    middleware::{auth::jwt_auth_middleware, rate_limit::rate_limit_middleware},
};

// Security scheme modifier untuk Bearer authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

// OpenAPI Documentation untuk order-service
#[derive(OpenApi)]
#[openapi(
    paths(
        // Customer Orders
        order_handlers::create_order,
        order_handlers::my_orders,
        order_handlers::get_order,
        order_handlers::cancel_order,
        order_handlers::update_fulfillment,

        // Admin Approval Gate
        admin_handlers::pending_orders,
        admin_handlers::flagged_orders,
        admin_handlers::approve_order,
        admin_handlers::reject_order,
        admin_handlers::reassign_vendor,

        // Vendor Assignment & Confirmation
        vendor_handlers::assigned_orders,
        vendor_handlers::confirm_assignment,
        vendor_handlers::reject_assignment,

        // Payments
        payment_handlers::init_order_payment,
        payment_handlers::initialize_payment,
        payment_handlers::payment_ipn,
    ),
    modifiers(&SecurityAddon),
    components(
        schemas(
            // Orders
            crate::domain::order::CreateOrderRequest,
            crate::domain::order::CreateOrderItemRequest,
            crate::domain::order::ApproveOrderRequest,
            crate::domain::order::RejectOrderRequest,
            crate::domain::order::CancelOrderRequest,
            crate::domain::order::ReassignVendorRequest,
            crate::domain::order::FulfillmentUpdateRequest,
            crate::domain::order::OrderItem,
            crate::domain::order::OrderResponse,
            crate::domain::order::OrderSummaryResponse,
            crate::domain::order::OrderListResponse,
            crate::domain::order::OrderDetailResponse,
            crate::domain::order::Pagination,

            // Vendor Assignments
            crate::domain::assignment::VendorConfirmRequest,
            crate::domain::assignment::VendorRejectRequest,
            crate::domain::assignment::VendorAssignmentResponse,
            crate::domain::assignment::VendorOrderResponse,
            crate::domain::assignment::VendorOrderListResponse,

            // Notifications
            crate::domain::notification::NotificationResponse,

            // Payments
            crate::domain::payment::InitializePaymentRequest,
            crate::domain::payment::PaymentSessionResponse,
            crate::domain::payment::SslcommerzIpnPayload,
            crate::domain::payment::IpnAckResponse,
        )
    ),
    tags(
        (name = "Orders", description = "Customer checkout, order view, and cancellation"),
        (name = "Admin Orders", description = "Admin approval gate and vendor reconciliation"),
        (name = "Vendor Orders", description = "Vendor assignment confirmation"),
        (name = "Payments", description = "Payment gate and gateway callbacks")
    ),
    info(
        title = "MERCATO - Order Service API",
        description = "Order approval and vendor assignment workflow for the MERCATO multi-vendor storefront.\n\n## Features\n\n- Admin approval gate for new orders\n- Per-vendor assignment and confirmation\n- Server-authoritative payment gate (SSLCommerz)\n- Fulfillment lifecycle tracking\n- JWT-Only Authentication\n- Redis-based Rate Limiting\n\n## Authentication\n\nAll endpoints except the payment IPN callback require a JWT Bearer token from the auth service.\nInclude the token in the `Authorization: Bearer {token}` header.",
        version = "1.0.0",
        contact(
            name = "MERCATO Development Team",
            email = "dev@mercato.example"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub struct ApiDoc;

// Health check endpoint
async fn health_check(State(pool): State<sqlx::PgPool>) -> Json<HealthStatus> {
    let db_healthy = check_db_health(&pool).await;

    Json(HealthStatus {
        database: if db_healthy { "healthy" } else { "unhealthy" }.to_string(),
        overall: if db_healthy { "healthy" } else { "degraded" }.to_string(),
    })
}

// Buat router dengan JWT-Only security
pub fn create_router(state: AppState) -> Router {
    if state.config.is_production() {
        tracing::warn!("Running in PRODUCTION mode - strict validation enabled");
    } else {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let api_routes = build_api_routes_with_auth(state.clone());

    let openapi = ApiDoc::openapi();

    Router::new()
        .route("/health", get(health_check).with_state(state.db.clone()))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .nest("/api", api_routes)
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(axum::middleware::from_fn_with_state(
            state,
            rate_limit_middleware,
        ))
}

// Build API routes dengan JWT authentication
fn build_api_routes_with_auth(state: AppState) -> Router {
    Router::new()
        // Customer Orders
        .route("/orders", post(order_handlers::create_order))
        .route("/orders/my-orders", get(order_handlers::my_orders))
        .route("/orders/{id}", get(order_handlers::get_order))
        .route("/orders/{id}/cancel", put(order_handlers::cancel_order))
        .route(
            "/orders/{id}/fulfillment",
            put(order_handlers::update_fulfillment),
        )
        // Admin Approval Gate
        .route("/orders/admin/pending", get(admin_handlers::pending_orders))
        .route("/orders/admin/flagged", get(admin_handlers::flagged_orders))
        .route(
            "/orders/admin/{id}/approve",
            put(admin_handlers::approve_order),
        )
        .route(
            "/orders/admin/{id}/reject",
            put(admin_handlers::reject_order),
        )
        .route(
            "/orders/admin/{id}/reassign",
            put(admin_handlers::reassign_vendor),
        )
        // Vendor Assignment & Confirmation
        .route(
            "/orders/vendor/assigned",
            get(vendor_handlers::assigned_orders),
        )
        .route(
            "/orders/vendor/{id}/confirm",
            put(vendor_handlers::confirm_assignment),
        )
        .route(
            "/orders/vendor/{id}/reject",
            put(vendor_handlers::reject_assignment),
        )
        // Payments
        .route(
            "/orders/{id}/payment",
            post(payment_handlers::init_order_payment),
        )
        .route(
            "/payment/initialize",
            post(payment_handlers::initialize_payment),
        )
        .route("/payment/ipn", post(payment_handlers::payment_ipn))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_middleware,
        ))
        .with_state(state)
}

// Security Headers Middleware untuk HTTP security
async fn security_headers_middleware(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<impl axum::response::IntoResponse, std::convert::Infallible> {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate, private"),
    );

    // Remove server header untuk security
    headers.remove(header::SERVER);

    Ok(response)
}
