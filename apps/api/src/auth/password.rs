use bcrypt::{hash, verify, DEFAULT_COST};

use crate::errors::AppError;

/// bcrypt hashing, run off the async executor.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl PasswordHasher {
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, password: &str) -> Result<String, AppError> {
        let password = password.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(e.into()))?
            .map_err(|e| AppError::Internal(e.into()))
    }

    /// Returns `Ok(false)` for a wrong password. A malformed stored hash is
    /// treated as a mismatch rather than surfaced to the caller.
    pub async fn verify(&self, password: &str, hashed: &str) -> Result<bool, AppError> {
        let password = password.to_owned();
        let hashed = hashed.to_owned();
        let outcome = tokio::task::spawn_blocking(move || verify(password, &hashed))
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        match outcome {
            Ok(matches) => Ok(matches),
            Err(e) => {
                tracing::warn!("Stored password hash could not be verified: {e}");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify_password() {
        let hasher = PasswordHasher::with_cost(4);
        let hashed = hasher.hash("SecurePassword123").await.unwrap();

        assert!(hasher.verify("SecurePassword123", &hashed).await.unwrap());
        assert!(!hasher.verify("WrongPassword", &hashed).await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_hash_is_a_mismatch() {
        let hasher = PasswordHasher::with_cost(4);
        assert!(!hasher.verify("anything", "invalid-hash").await.unwrap());
    }
}
