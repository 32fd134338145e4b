use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::mailer::Mailer;
use crate::auth::password::PasswordHasher;
use crate::auth::session::SessionService;
use crate::auth::store::UserStore;
use crate::billing::stripe::StripeClient;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::plans::store::{AiUsageCounter, UsageStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub llm: LlmClient,
    pub stripe: StripeClient,
    pub config: Config,
    pub sessions: SessionService,
    pub hasher: PasswordHasher,
    /// User rows, shared by auth and billing reconciliation.
    pub users: Arc<dyn UserStore>,
    /// Count sources for plan limits.
    pub usage: Arc<dyn UsageStore>,
    /// Monthly AI request counter (Redis in production).
    pub ai_usage: Arc<dyn AiUsageCounter>,
    pub mailer: Arc<dyn Mailer>,
}
