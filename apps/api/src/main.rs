mod ai;
mod auth;
mod billing;
mod config;
mod cover_letters;
mod db;
mod errors;
mod files;
mod jobs;
mod llm_client;
mod lookups;
mod models;
mod plans;
mod resumes;
mod routes;
mod state;
#[cfg(test)]
mod testing;

use anyhow::Result;
use axum::http::{header, HeaderValue, Method};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::mailer::LogMailer;
use crate::auth::password::PasswordHasher;
use crate::auth::session::SessionService;
use crate::auth::store::PgUserStore;
use crate::billing::stripe::StripeClient;
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::llm_client::LlmClient;
use crate::plans::store::{PgUsageStore, RedisAiUsageCounter};
use crate::routes::{build_router, UPLOAD_BODY_LIMIT};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Jobtracker API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL and bring the schema up to date
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    // Initialize Redis (monthly AI usage counters)
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // Initialize external API clients
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized");
    let stripe = StripeClient::new(config.stripe.secret_key.clone())?;
    info!("Stripe client initialized");

    // Build app state
    let state = AppState {
        db: db.clone(),
        llm,
        stripe,
        sessions: SessionService::new(
            &config.jwt_secret,
            config.session_ttl_hours,
            config.cookie_secure,
        ),
        hasher: PasswordHasher::default(),
        users: Arc::new(PgUserStore::new(db.clone())),
        usage: Arc::new(PgUsageStore::new(db)),
        ai_usage: Arc::new(RedisAiUsageCounter::new(redis)),
        mailer: Arc::new(LogMailer),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(RequestBodyLimitLayer::new(UPLOAD_BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config)?);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Allows the web client origin, with credentials so the session cookie is sent.
fn cors_layer(config: &Config) -> Result<CorsLayer> {
    Ok(CorsLayer::new()
        .allow_origin(config.app_url.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}
