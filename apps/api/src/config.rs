use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub cookie_secure: bool,
    pub anthropic_api_key: String,
    pub stripe: StripeConfig,
    /// Public URL of the web client; used for checkout redirects and reset links.
    pub app_url: String,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub price_pro: String,
    pub price_premium: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            jwt_secret: require_env("JWT_SECRET")?,
            session_ttl_hours: std::env::var("SESSION_TTL_HOURS")
                .unwrap_or_else(|_| "720".to_string())
                .parse::<i64>()
                .context("SESSION_TTL_HOURS must be an integer")?,
            cookie_secure: std::env::var("COOKIE_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            stripe: StripeConfig {
                secret_key: require_env("STRIPE_SECRET_KEY")?,
                webhook_secret: require_env("STRIPE_WEBHOOK_SECRET")?,
                price_pro: require_env("STRIPE_PRICE_PRO")?,
                price_premium: require_env("STRIPE_PRICE_PREMIUM")?,
            },
            app_url: std::env::var("APP_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
