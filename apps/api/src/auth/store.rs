//! User persistence.
//!
//! Auth and billing both read and write user rows through `UserStore`, so the
//! reset flow and webhook reconciliation can run against any backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::is_unique_violation;
use crate::errors::AppError;
use crate::models::user::User;
use crate::plans::Plan;

pub const DUPLICATE_EMAIL_MESSAGE: &str = "An account with this email already exists";

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    /// Already normalized.
    pub email: String,
    pub password_hash: String,
}

/// Billing state written by webhook reconciliation. Every field overwrites,
/// except a `None` customer id which keeps the stored one.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionUpdate {
    pub plan: Plan,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_customer_id(&self, customer_id: &str) -> Result<Option<User>, AppError>;

    /// Fails with `Conflict` when the email is taken.
    async fn create(&self, new_user: NewUser) -> Result<User, AppError>;

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// Users holding `token_hash` whose token has not expired at `now`.
    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<User>, AppError>;

    /// Replaces the password and clears the reset token, only if the user still
    /// holds `token_hash`. Returns false when the token was already consumed.
    async fn complete_password_reset(
        &self,
        user_id: Uuid,
        token_hash: &str,
        password_hash: &str,
    ) -> Result<bool, AppError>;

    async fn update_subscription(
        &self,
        user_id: Uuid,
        update: SubscriptionUpdate,
    ) -> Result<(), AppError>;
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_customer_id(&self, customer_id: &str) -> Result<Option<User>, AppError> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE stripe_customer_id = $1")
                .bind(customer_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, plan)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(Plan::Free.tag())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(DUPLICATE_EMAIL_MESSAGE.to_string())
            } else {
                AppError::Database(e)
            }
        })
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET reset_token_hash = $1, reset_token_expires_at = $2, updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(token_hash)
        .bind(expires_at)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<User>, AppError> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE reset_token_hash = $1 AND reset_token_expires_at > $2",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn complete_password_reset(
        &self,
        user_id: Uuid,
        token_hash: &str,
        password_hash: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1,
                reset_token_hash = NULL,
                reset_token_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $2 AND reset_token_hash = $3
            "#,
        )
        .bind(password_hash)
        .bind(user_id)
        .bind(token_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_subscription(
        &self,
        user_id: Uuid,
        update: SubscriptionUpdate,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET plan = $1,
                stripe_customer_id = COALESCE($2, stripe_customer_id),
                stripe_subscription_id = $3,
                updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(update.plan.tag())
        .bind(update.customer_id)
        .bind(update.subscription_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
