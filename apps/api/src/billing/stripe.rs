//! Minimal Stripe REST client: checkout and billing-portal sessions.
//!
//! Requests are form-encoded as the Stripe API expects. Error bodies are
//! decoded into `StripeError::Api` so callers branch on the error type rather
//! than on message text.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

const STRIPE_API_URL: &str = "https://api.stripe.com/v1";

#[derive(Debug, Error)]
pub enum StripeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Stripe API error ({kind}): {message}")]
    Api {
        /// Stripe error type, e.g. `card_error`, `invalid_request_error`.
        kind: String,
        code: Option<String>,
        message: String,
    },

    #[error("Rate limited by Stripe")]
    RateLimited,

    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(rename = "type")]
    kind: String,
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortalSession {
    pub url: String,
}

/// Inputs for a subscription checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutParams<'a> {
    pub user_id: Uuid,
    pub email: &'a str,
    pub customer_id: Option<&'a str>,
    pub plan_tag: &'a str,
    pub price_id: &'a str,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
}

impl StripeClient {
    pub fn new(secret_key: String) -> Result<Self, StripeError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
            secret_key,
        })
    }

    pub async fn create_checkout_session(
        &self,
        params: &CheckoutParams<'_>,
    ) -> Result<CheckoutSession, StripeError> {
        let session: CheckoutSession = self
            .post_form("/checkout/sessions", &checkout_form(params))
            .await?;
        debug!("Created checkout session {} for user {}", session.id, params.user_id);
        Ok(session)
    }

    pub async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, StripeError> {
        let form = vec![
            ("customer", customer_id.to_string()),
            ("return_url", return_url.to_string()),
        ];
        self.post_form("/billing_portal/sessions", &form).await
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<T, StripeError> {
        let response = self
            .client
            .post(format!("{STRIPE_API_URL}{path}"))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(parse_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| StripeError::Parse(e.to_string()))
    }
}

/// Form fields for a subscription checkout session.
pub fn checkout_form(params: &CheckoutParams<'_>) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("mode", "subscription".to_string()),
        ("line_items[0][price]", params.price_id.to_string()),
        ("line_items[0][quantity]", "1".to_string()),
        ("success_url", params.success_url.clone()),
        ("cancel_url", params.cancel_url.clone()),
        ("client_reference_id", params.user_id.to_string()),
        ("metadata[userId]", params.user_id.to_string()),
        ("metadata[planId]", params.plan_tag.to_string()),
        ("subscription_data[metadata][userId]", params.user_id.to_string()),
        ("subscription_data[metadata][planId]", params.plan_tag.to_string()),
    ];

    match params.customer_id {
        Some(customer) => form.push(("customer", customer.to_string())),
        None => form.push(("customer_email", params.email.to_string())),
    }

    form
}

fn parse_error(status: StatusCode, body: &str) -> StripeError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return StripeError::RateLimited;
    }

    match serde_json::from_str::<StripeErrorEnvelope>(body) {
        Ok(envelope) => StripeError::Api {
            kind: envelope.error.kind,
            code: envelope.error.code,
            message: envelope
                .error
                .message
                .unwrap_or_else(|| format!("Stripe returned {status}")),
        },
        Err(_) => StripeError::Api {
            kind: "unknown".to_string(),
            code: None,
            message: format!("Stripe returned {status}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(customer_id: Option<&str>) -> CheckoutParams<'_> {
        CheckoutParams {
            user_id: Uuid::nil(),
            email: "jane@example.com",
            customer_id,
            plan_tag: "pro",
            price_id: "price_123",
            success_url: "http://localhost:3000/dashboard".to_string(),
            cancel_url: "http://localhost:3000/pricing".to_string(),
        }
    }

    fn field<'a>(form: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_checkout_form_for_new_customer_uses_email() {
        let form = checkout_form(&params(None));
        assert_eq!(field(&form, "mode"), Some("subscription"));
        assert_eq!(field(&form, "line_items[0][price]"), Some("price_123"));
        assert_eq!(field(&form, "metadata[planId]"), Some("pro"));
        assert_eq!(field(&form, "customer_email"), Some("jane@example.com"));
        assert!(field(&form, "customer").is_none());
    }

    #[test]
    fn test_checkout_form_reuses_existing_customer() {
        let form = checkout_form(&params(Some("cus_42")));
        assert_eq!(field(&form, "customer"), Some("cus_42"));
        assert!(field(&form, "customer_email").is_none());
        assert_eq!(
            field(&form, "client_reference_id"),
            Some(Uuid::nil().to_string().as_str())
        );
    }

    #[test]
    fn test_parse_card_error() {
        let body = r#"{"error":{"type":"card_error","code":"card_declined","message":"Your card was declined."}}"#;
        match parse_error(StatusCode::PAYMENT_REQUIRED, body) {
            StripeError::Api {
                kind,
                code,
                message,
            } => {
                assert_eq!(kind, "card_error");
                assert_eq!(code.as_deref(), Some("card_declined"));
                assert_eq!(message, "Your card was declined.");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_rate_limit() {
        assert!(matches!(
            parse_error(StatusCode::TOO_MANY_REQUESTS, ""),
            StripeError::RateLimited
        ));
    }

    #[test]
    fn test_parse_unstructured_error() {
        match parse_error(StatusCode::BAD_GATEWAY, "<html>") {
            StripeError::Api { kind, .. } => assert_eq!(kind, "unknown"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
