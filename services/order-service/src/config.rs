use sqlx::{postgres::PgPoolOptions, PgPool};
use std::env;
use std::time::Duration;

use crate::middleware::rate_limit::RateLimiter;

// Konfigurasi aplikasi dari environment variables
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub environment: String,
    pub jwt_secret: String,
    pub redis_url: String,
    pub catalog_service_url: String,
    pub sslcommerz_store_id: String,
    pub sslcommerz_store_passwd: String,
    pub sslcommerz_api_url: String,
    pub sslcommerz_validator_url: String,
    pub payment_redirect_base_url: String,
    pub public_base_url: String,
}

impl AppConfig {
    // Load konfigurasi dari environment dengan validasi
    pub fn from_env() -> Result<Self, String> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set")?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| "JWT_SECRET must be set")?;

        if !cfg!(debug_assertions) && jwt_secret.contains("change-this") {
            return Err("JWT_SECRET is still the default! Change it for production".to_string());
        }

        let server_host = env::var("ORDER_SERVICE_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        let server_port = env::var("ORDER_SERVICE_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3004);

        let environment = env::var("RUST_ENV")
            .unwrap_or_else(|_| "development".to_string());

        let redis_url = env::var("REDIS_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let catalog_service_url = env::var("CATALOG_SERVICE_URL")
            .unwrap_or_else(|_| "http://localhost:3002".to_string());

        let sslcommerz_store_id = env::var("SSLCOMMERZ_STORE_ID")
            .map_err(|_| "SSLCOMMERZ_STORE_ID must be set")?;

        let sslcommerz_store_passwd = env::var("SSLCOMMERZ_STORE_PASSWD")
            .map_err(|_| "SSLCOMMERZ_STORE_PASSWD must be set")?;

        let sslcommerz_api_url = env::var("SSLCOMMERZ_API_URL")
            .unwrap_or_else(|_| "https://sandbox.sslcommerz.com/gwprocess/v4/api.php".to_string());

        let sslcommerz_validator_url = env::var("SSLCOMMERZ_VALIDATOR_URL").unwrap_or_else(|_| {
            "https://sandbox.sslcommerz.com/validator/api/validationserverAPI.php".to_string()
        });

        let payment_redirect_base_url = env::var("PAYMENT_REDIRECT_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000/payment".to_string());

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3004".to_string());

        Ok(AppConfig {
            database_url,
            server_host,
            server_port,
            environment,
            jwt_secret,
            redis_url,
            catalog_service_url,
            sslcommerz_store_id,
            sslcommerz_store_passwd,
            sslcommerz_api_url,
            sslcommerz_validator_url,
            payment_redirect_base_url,
            public_base_url,
        })
    }

    // Helper cek production mode
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn host(&self) -> &str {
        &self.server_host
    }

    pub fn port(&self) -> u16 {
        self.server_port
    }
}

// Inisialisasi database pool dengan konfigurasi optimal
pub async fn init_db_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    tracing::info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .min_connections(0)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await?;

    tracing::info!("Database connected");
    Ok(pool)
}

// Health check database connection
pub async fn check_db_health(pool: &PgPool) -> bool {
    sqlx::query("SELECT 1")
        .fetch_optional(pool)
        .await
        .is_ok()
}

// Application state yang di-share ke semua handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: AppConfig,
    pub http_client: reqwest::Client,
    pub rate_limiter: RateLimiter,
}

impl axum::extract::FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl axum::extract::FromRef<AppState> for AppConfig {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl axum::extract::FromRef<AppState> for RateLimiter {
    fn from_ref(state: &AppState) -> Self {
        state.rate_limiter.clone()
    }
}

impl AppState {
    // Inisialisasi application state
    pub async fn new(config: AppConfig) -> Result<Self, String> {
        let db = init_db_pool(&config.database_url)
            .await
            .map_err(|e| format!("Failed to init database: {}", e))?;

        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        let rate_limiter = RateLimiter::new(&config.redis_url)
            .map_err(|e| format!("Failed to create rate limiter: {}", e))?;

        Ok(AppState {
            db,
            config,
            http_client,
            rate_limiter,
        })
    }

    // Inisialisasi application state dari environment
    pub async fn from_env() -> Result<Self, String> {
        let config = AppConfig::from_env()?;
        Self::new(config).await
    }
}

// Response untuk health check endpoint
#[derive(Debug, serde::Serialize)]
pub struct HealthStatus {
    pub database: String,
    pub overall: String,
}
