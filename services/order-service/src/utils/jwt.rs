// JWT validation dengan database trust boundary
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use sqlx::PgPool;
use std::env;
use thiserror::Error;

pub use shared::models::claims::TokenClaims;

// Error handling untuk JWT validation
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Token invalid atau expired")]
    InvalidToken,
    #[error("JWT secret tidak ditemukan")]
    MissingSecret,
    #[error("Token type tidak valid untuk endpoint ini")]
    InvalidTokenType,
    #[error("Token sudah di-revoke")]
    TokenRevoked,
    #[error("Database error saat validasi revocation")]
    DatabaseError,
}

// Decode JWT token dengan strict validation
fn decode_jwt_token(token: &str) -> Result<TokenClaims, JwtError> {
    let secret = env::var("JWT_SECRET").map_err(|_| JwtError::MissingSecret)?;

    // Production safety check untuk prevent default secret
    if !cfg!(debug_assertions) && secret.contains("change-this") {
        return Err(JwtError::MissingSecret);
    }

    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| JwtError::InvalidToken)?;

    Ok(token_data.claims)
}

// Hanya access token yang boleh masuk ke business endpoints
fn validate_token_type(claims: &TokenClaims) -> Result<(), JwtError> {
    if !claims.is_access_token() {
        return Err(JwtError::InvalidTokenType);
    }
    Ok(())
}

// Cek revocation list di database (rows ditulis oleh auth service saat logout/ban)
async fn check_token_revocation(pool: &PgPool, claims: &TokenClaims) -> Result<(), JwtError> {
    let revoked: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE jti = $1)"
    )
    .bind(&claims.jti)
    .fetch_one(pool)
    .await
    .map_err(|_| JwtError::DatabaseError)?;

    if revoked {
        return Err(JwtError::TokenRevoked);
    }

    Ok(())
}

// Public JWT validation function dengan database trust boundary
pub async fn validate_token(token: &str, pool: &PgPool) -> Result<TokenClaims, JwtError> {
    let claims = decode_jwt_token(token)?;

    validate_token_type(&claims)?;

    check_token_revocation(pool, &claims).await?;

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::sync::Mutex;

    // Tests di module ini mutate JWT_SECRET; serialize supaya tidak saling ganggu
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn create_test_token(user_id: i32, email: &str, role: &str, token_type: &str) -> String {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user_id,
            email: email.to_string(),
            role: role.to_string(),
            exp: (now + Duration::minutes(15)).timestamp(),
            iat: now.timestamp(),
            token_type: token_type.to_string(),
            jti: "test-jti-123".to_string(),
        };

        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret("test-secret-key-for-testing-only".as_ref()),
        )
        .unwrap()
    }

    fn with_test_secret<T>(f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock().unwrap();

        let original_secret = std::env::var("JWT_SECRET").ok();
        std::env::set_var("JWT_SECRET", "test-secret-key-for-testing-only");

        let result = f();

        match original_secret {
            Some(val) => std::env::set_var("JWT_SECRET", val),
            None => std::env::remove_var("JWT_SECRET"),
        }

        result
    }

    #[test]
    fn test_decode_valid_access_token() {
        let result = with_test_secret(|| {
            let token = create_test_token(123, "test@example.com", "customer", "access");
            decode_jwt_token(&token)
        });

        let claims = result.expect("valid token should decode");
        assert_eq!(claims.sub, 123);
        assert_eq!(claims.role, "customer");
    }

    #[test]
    fn test_reject_refresh_token() {
        let result = with_test_secret(|| {
            let token = create_test_token(123, "test@example.com", "customer", "refresh");
            decode_jwt_token(&token).and_then(|claims| {
                validate_token_type(&claims)?;
                Ok(claims)
            })
        });

        assert!(matches!(result.unwrap_err(), JwtError::InvalidTokenType));
    }

    #[test]
    fn test_invalid_token() {
        let result = with_test_secret(|| decode_jwt_token("invalid.token.here"));

        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), JwtError::InvalidToken));
    }

    #[test]
    fn test_missing_secret() {
        let _guard = ENV_LOCK.lock().unwrap();

        let original_secret = std::env::var("JWT_SECRET").ok();
        std::env::remove_var("JWT_SECRET");

        let token = create_test_token(123, "test@example.com", "customer", "access");
        let result = decode_jwt_token(&token);

        match original_secret {
            Some(val) => std::env::set_var("JWT_SECRET", val),
            None => std::env::remove_var("JWT_SECRET"),
        }

        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), JwtError::MissingSecret));
    }
}
