use async_trait::async_trait;
use tracing::{debug, info};

use crate::errors::AppError;

/// Outbound account email.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(
        &self,
        to: &str,
        name: &str,
        reset_link: &str,
    ) -> Result<(), AppError>;
}

/// Writes reset links to the log instead of sending mail. Used until an SMTP
/// transport is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(
        &self,
        to: &str,
        name: &str,
        reset_link: &str,
    ) -> Result<(), AppError> {
        info!("Password reset issued for {to}");
        debug!("Password reset link for {name} <{to}>: {reset_link}");
        Ok(())
    }
}
