//! Password reset tokens.
//!
//! A token is 32 random bytes, hex encoded, handed to the user by mail. Only
//! its SHA-256 digest is stored. Tokens expire one hour after issuance and are
//! cleared on use.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::auth::mailer::Mailer;
use crate::auth::password::PasswordHasher;
use crate::auth::store::UserStore;
use crate::auth::validation::{normalize_email, validate_password};
use crate::errors::AppError;

pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Response for every reset request, whether or not the account exists.
pub const RESET_REQUESTED_MESSAGE: &str =
    "If an account exists for that email, a password reset link has been sent.";

pub const INVALID_RESET_TOKEN_MESSAGE: &str = "Invalid or expired reset token";

pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Issues a reset token when `email` belongs to a user. Returns normally in
/// both cases so callers cannot tell whether the account exists.
pub async fn request_password_reset(
    users: &dyn UserStore,
    mailer: &dyn Mailer,
    app_url: &str,
    email: &str,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let email = normalize_email(email);
    let Some(user) = users.find_by_email(&email).await? else {
        info!("Password reset requested for unknown email");
        return Ok(());
    };

    let token = generate_reset_token();
    let expires_at = now + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
    users
        .set_reset_token(user.id, &hash_token(&token), expires_at)
        .await?;

    let link = format!("{app_url}/reset-password?token={token}");
    if let Err(e) = mailer.send_password_reset(&user.email, &user.name, &link).await {
        warn!("Failed to deliver password reset email to user {}: {e}", user.id);
    }

    Ok(())
}

/// Consumes `token` and sets a new password. The token must be unexpired and
/// held by exactly one user.
pub async fn reset_password(
    users: &dyn UserStore,
    hasher: &PasswordHasher,
    token: &str,
    new_password: &str,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::Validation(INVALID_RESET_TOKEN_MESSAGE.to_string()));
    }
    validate_password(new_password)?;

    let token_hash = hash_token(token);
    let matches = users.find_by_reset_token(&token_hash, now).await?;
    let [user] = matches.as_slice() else {
        if matches.len() > 1 {
            warn!("Reset token matched {} users; rejecting", matches.len());
        }
        return Err(AppError::Validation(INVALID_RESET_TOKEN_MESSAGE.to_string()));
    };

    let password_hash = hasher.hash(new_password).await?;
    if !users
        .complete_password_reset(user.id, &token_hash, &password_hash)
        .await?
    {
        return Err(AppError::Validation(INVALID_RESET_TOKEN_MESSAGE.to_string()));
    }

    info!("Password reset completed for user {}", user.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryUserStore, RecordingMailer};

    const APP_URL: &str = "http://localhost:3000";

    fn hasher() -> PasswordHasher {
        PasswordHasher::with_cost(4)
    }

    async fn issue_token(users: &MemoryUserStore, email: &str, now: DateTime<Utc>) -> String {
        let mailer = RecordingMailer::default();
        request_password_reset(users, &mailer, APP_URL, email, now)
            .await
            .unwrap();
        let link = mailer.last_link().expect("reset link sent");
        link.split("token=").nth(1).unwrap().to_string()
    }

    #[test]
    fn test_tokens_are_random_hex() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
        assert_ne!(hash_token(&a), a);
    }

    #[tokio::test]
    async fn test_unknown_email_sends_nothing() {
        let users = MemoryUserStore::default();
        let mailer = RecordingMailer::default();
        request_password_reset(&users, &mailer, APP_URL, "ghost@example.com", Utc::now())
            .await
            .unwrap();
        assert!(mailer.last_link().is_none());
    }

    #[tokio::test]
    async fn test_token_lookup_is_case_insensitive_on_email() {
        let users = MemoryUserStore::default();
        users.insert_user("Jane", "jane@example.com", "hash");
        let token = issue_token(&users, "  JANE@example.com ", Utc::now()).await;
        assert_eq!(token.len(), 64);
    }

    #[tokio::test]
    async fn test_reset_succeeds_once() {
        let users = MemoryUserStore::default();
        let user = users.insert_user("Jane", "jane@example.com", "old-hash");
        let now = Utc::now();
        let token = issue_token(&users, "jane@example.com", now).await;

        reset_password(&users, &hasher(), &token, "new-secret", now)
            .await
            .unwrap();
        let updated = users.get(user.id).unwrap();
        assert_ne!(updated.password_hash, "old-hash");
        assert!(updated.reset_token_hash.is_none());

        let reuse = reset_password(&users, &hasher(), &token, "another-secret", now).await;
        assert!(matches!(reuse, Err(AppError::Validation(ref m)) if m == INVALID_RESET_TOKEN_MESSAGE));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let users = MemoryUserStore::default();
        users.insert_user("Jane", "jane@example.com", "old-hash");
        let issued = Utc::now();
        let token = issue_token(&users, "jane@example.com", issued).await;

        let later = issued + Duration::minutes(RESET_TOKEN_TTL_MINUTES + 1);
        let result = reset_password(&users, &hasher(), &token, "new-secret", later).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_token_valid_just_before_expiry() {
        let users = MemoryUserStore::default();
        users.insert_user("Jane", "jane@example.com", "old-hash");
        let issued = Utc::now();
        let token = issue_token(&users, "jane@example.com", issued).await;

        let almost = issued + Duration::minutes(RESET_TOKEN_TTL_MINUTES - 1);
        assert!(reset_password(&users, &hasher(), &token, "new-secret", almost)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_token_shared_by_two_users_rejected() {
        let users = MemoryUserStore::default();
        let a = users.insert_user("Ann", "ann@example.com", "h1");
        let b = users.insert_user("Bob", "bob@example.com", "h2");
        let now = Utc::now();
        let expires = now + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        let token_hash = hash_token("shared");
        users.set_reset_token(a.id, &token_hash, expires).await.unwrap();
        users.set_reset_token(b.id, &token_hash, expires).await.unwrap();

        let result = reset_password(&users, &hasher(), "shared", "new-secret", now).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_short_new_password_rejected() {
        let users = MemoryUserStore::default();
        users.insert_user("Jane", "jane@example.com", "old-hash");
        let now = Utc::now();
        let token = issue_token(&users, "jane@example.com", now).await;

        let result = reset_password(&users, &hasher(), &token, "123", now).await;
        assert!(matches!(result, Err(AppError::Validation(ref m)) if m.contains("Password")));
    }
}
