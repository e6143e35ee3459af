// JWT-Only Authentication untuk Order Service
use axum::{
    extract::{Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::{config::AppState, error::AppError, utils::jwt};

// User authentication context
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
    pub role: String,
}

// Customer authentication context
#[derive(Debug, Clone)]
pub struct AuthCustomer {
    pub user_id: i32,
    pub email: String,
}

// Vendor authentication context - role-restricted access
#[derive(Debug, Clone)]
pub struct AuthVendor {
    pub user_id: i32,
}

// Admin authentication context - role-restricted access
#[derive(Debug, Clone)]
pub struct AuthAdmin {
    pub user_id: i32,
}

// Implementasi Axum extractor untuk AuthUser
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

// Implementasi Axum extractor untuk AuthCustomer
impl<S> axum::extract::FromRequestParts<S> for AuthCustomer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;

        if auth_user.role != "customer" {
            return Err(AppError::forbidden("Customer authentication required"));
        }

        Ok(AuthCustomer {
            user_id: auth_user.user_id,
            email: auth_user.email,
        })
    }
}

// Implementasi Axum extractor untuk AuthVendor
impl<S> axum::extract::FromRequestParts<S> for AuthVendor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;

        if auth_user.role != "vendor" {
            return Err(AppError::forbidden("Vendor authentication required"));
        }

        Ok(AuthVendor {
            user_id: auth_user.user_id,
        })
    }
}

// Implementasi Axum extractor untuk AuthAdmin
impl<S> axum::extract::FromRequestParts<S> for AuthAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;

        if auth_user.role != "admin" {
            return Err(AppError::forbidden("Admin authentication required"));
        }

        Ok(AuthAdmin {
            user_id: auth_user.user_id,
        })
    }
}

// Extract Bearer token dari Authorization header
fn extract_jwt_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| AppError::unauthorized("Authorization header with Bearer token required"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Invalid Authorization header format"))?;

    if !auth_header.starts_with("Bearer ") {
        return Err(AppError::unauthorized("Bearer token format required"));
    }

    Ok(auth_header[7..].to_string())
}

// JWT Authentication middleware dengan database revocation validation
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path().to_string();

    // Gateway IPN callback tidak membawa bearer token; diverifikasi
    // server-to-server via validator API di handler-nya
    if path == "/health" || path.ends_with("/payment/ipn") {
        return Ok(next.run(request).await);
    }

    let headers = request.headers();
    let token = extract_jwt_token(headers)?;

    let claims = jwt::validate_token(&token, &state.db)
        .await
        .map_err(|_| AppError::unauthorized("Token invalid, expired, or revoked"))?;

    let auth_user = AuthUser {
        user_id: claims.sub,
        email: claims.email.clone(),
        role: claims.role.clone(),
    };

    request.extensions_mut().insert(auth_user.clone());

    // Security audit log
    tracing::debug!(
        "User authenticated - ID: {}, Role: {}, Endpoint: {}",
        auth_user.user_id,
        auth_user.role,
        path
    );

    Ok(next.run(request).await)
}
