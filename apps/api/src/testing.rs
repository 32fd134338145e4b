//! In-memory stand-ins for the persistence seams, used by unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::auth::mailer::Mailer;
use crate::auth::password::PasswordHasher;
use crate::auth::session::SessionService;
use crate::auth::store::{NewUser, SubscriptionUpdate, UserStore, DUPLICATE_EMAIL_MESSAGE};
use crate::billing::stripe::StripeClient;
use crate::config::{Config, StripeConfig};
use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::models::user::User;
use crate::plans::limits::UNLIMITED;
use crate::plans::store::{AiUsageCounter, UsageStore};
use crate::plans::Plan;
use crate::state::AppState;

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
    subscription_writes: Mutex<usize>,
}

impl MemoryUserStore {
    pub fn insert_user(&self, name: &str, email: &str, password_hash: &str) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            plan: Some(Plan::Free.tag().to_string()),
            stripe_customer_id: None,
            stripe_subscription_id: None,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        self.users.lock().unwrap().insert(user.id, user.clone());
        user
    }

    pub fn attach_customer(&self, user_id: Uuid, customer_id: &str) {
        if let Some(user) = self.users.lock().unwrap().get_mut(&user_id) {
            user.stripe_customer_id = Some(customer_id.to_string());
        }
    }

    pub fn get(&self, user_id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&user_id).cloned()
    }

    pub fn subscription_writes(&self) -> usize {
        *self.subscription_writes.lock().unwrap()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.get(id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_customer_id(&self, customer_id: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.stripe_customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        if self.find_by_email(&new_user.email).await?.is_some() {
            return Err(AppError::Conflict(DUPLICATE_EMAIL_MESSAGE.to_string()));
        }
        Ok(self.insert_user(&new_user.name, &new_user.email, &new_user.password_hash))
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if let Some(user) = self.users.lock().unwrap().get_mut(&user_id) {
            user.reset_token_hash = Some(token_hash.to_string());
            user.reset_token_expires_at = Some(expires_at);
        }
        Ok(())
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<User>, AppError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| {
                u.reset_token_hash.as_deref() == Some(token_hash)
                    && u.reset_token_expires_at.is_some_and(|exp| exp > now)
            })
            .cloned()
            .collect())
    }

    async fn complete_password_reset(
        &self,
        user_id: Uuid,
        token_hash: &str,
        password_hash: &str,
    ) -> Result<bool, AppError> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(&user_id) {
            Some(user) if user.reset_token_hash.as_deref() == Some(token_hash) => {
                user.password_hash = password_hash.to_string();
                user.reset_token_hash = None;
                user.reset_token_expires_at = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_subscription(
        &self,
        user_id: Uuid,
        update: SubscriptionUpdate,
    ) -> Result<(), AppError> {
        *self.subscription_writes.lock().unwrap() += 1;
        if let Some(user) = self.users.lock().unwrap().get_mut(&user_id) {
            user.plan = Some(update.plan.tag().to_string());
            if update.customer_id.is_some() {
                user.stripe_customer_id = update.customer_id;
            }
            user.stripe_subscription_id = update.subscription_id;
        }
        Ok(())
    }
}

/// Fixed counts for every user.
#[derive(Default)]
pub struct MemoryUsageStore {
    applied_jobs: i64,
    resumes: i64,
    storage_bytes: i64,
}

impl MemoryUsageStore {
    pub fn with_counts(applied_jobs: i64, resumes: i64, storage_bytes: i64) -> Self {
        Self {
            applied_jobs,
            resumes,
            storage_bytes,
        }
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn applied_job_count(&self, _user_id: Uuid) -> Result<i64, AppError> {
        Ok(self.applied_jobs)
    }

    async fn resume_count(&self, _user_id: Uuid) -> Result<i64, AppError> {
        Ok(self.resumes)
    }

    async fn storage_bytes(&self, _user_id: Uuid) -> Result<i64, AppError> {
        Ok(self.storage_bytes)
    }
}

#[derive(Default)]
pub struct MemoryAiUsageCounter {
    counts: Mutex<HashMap<(Uuid, String), i64>>,
}

#[async_trait]
impl AiUsageCounter for MemoryAiUsageCounter {
    async fn current(&self, user_id: Uuid, period: &str) -> Result<i64, AppError> {
        Ok(self
            .counts
            .lock()
            .unwrap()
            .get(&(user_id, period.to_string()))
            .copied()
            .unwrap_or(0))
    }

    async fn try_consume(
        &self,
        user_id: Uuid,
        period: &str,
        limit: i64,
    ) -> Result<Option<i64>, AppError> {
        let mut counts = self.counts.lock().unwrap();
        let count = counts.entry((user_id, period.to_string())).or_insert(0);
        if limit != UNLIMITED && *count >= limit {
            return Ok(None);
        }
        *count += 1;
        Ok(Some(*count))
    }

    async fn release(&self, user_id: Uuid, period: &str) -> Result<(), AppError> {
        if let Some(count) = self
            .counts
            .lock()
            .unwrap()
            .get_mut(&(user_id, period.to_string()))
        {
            *count -= 1;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    links: Mutex<Vec<String>>,
}

impl RecordingMailer {
    pub fn last_link(&self) -> Option<String> {
        self.links.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_password_reset(
        &self,
        _to: &str,
        _name: &str,
        reset_link: &str,
    ) -> Result<(), AppError> {
        self.links.lock().unwrap().push(reset_link.to_string());
        Ok(())
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/jobtracker_test".to_string(),
        redis_url: "redis://127.0.0.1/".to_string(),
        jwt_secret: "test-secret".to_string(),
        session_ttl_hours: 1,
        cookie_secure: false,
        anthropic_api_key: "test-key".to_string(),
        stripe: StripeConfig {
            secret_key: "sk_test".to_string(),
            webhook_secret: "whsec_test".to_string(),
            price_pro: "price_pro".to_string(),
            price_premium: "price_premium".to_string(),
        },
        app_url: "http://localhost:3000".to_string(),
        port: 0,
        rust_log: "info".to_string(),
    }
}

/// App state over in-memory stores and a lazy pool that never connects.
/// Only routes that fail before touching Postgres can be driven with it.
pub fn test_state(users: Arc<MemoryUserStore>) -> AppState {
    let config = test_config();
    AppState {
        db: PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap(),
        llm: LlmClient::new(config.anthropic_api_key.clone()).unwrap(),
        stripe: StripeClient::new(config.stripe.secret_key.clone()).unwrap(),
        sessions: SessionService::new(&config.jwt_secret, config.session_ttl_hours, false),
        hasher: PasswordHasher::with_cost(4),
        users,
        usage: Arc::new(MemoryUsageStore::default()),
        ai_usage: Arc::new(MemoryAiUsageCounter::default()),
        mailer: Arc::new(RecordingMailer::default()),
        config,
    }
}
