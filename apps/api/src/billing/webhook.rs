//! Stripe webhook verification and reconciliation.
//!
//! The signature is checked over the raw body before any JSON is parsed.
//! Handled events overwrite billing fields on the user row keyed by Stripe
//! ids, so redelivery of the same event converges on the same state.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::store::{SubscriptionUpdate, UserStore};
use crate::billing::PriceCatalog;
use crate::errors::AppError;
use crate::plans::Plan;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age of a signed payload, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error, PartialEq)]
pub enum WebhookError {
    #[error("missing Stripe-Signature header")]
    MissingSignature,

    #[error("malformed Stripe-Signature header")]
    MalformedHeader,

    #[error("timestamp outside the tolerance window")]
    StaleTimestamp,

    #[error("no signature matches the payload")]
    SignatureMismatch,

    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

/// Verifies a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=...]`)
/// against `payload` using HMAC-SHA256 over `"{t}.{payload}"`.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), WebhookError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader);
    }
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(WebhookError::StaleTimestamp);
    }

    for signature in &signatures {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| WebhookError::SignatureMismatch)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        // verify_slice compares in constant time
        if mac.verify_slice(signature).is_ok() {
            return Ok(());
        }
    }

    Err(WebhookError::SignatureMismatch)
}

// ────────────────────────────────────────────────────────────────────────────
// Event payloads
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CheckoutSessionObject {
    pub client_reference_id: Option<String>,
    pub customer: Option<String>,
    pub subscription: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SubscriptionObject {
    pub id: String,
    pub customer: String,
    pub status: String,
    #[serde(default)]
    pub items: SubscriptionItems,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SubscriptionItem {
    pub price: Price,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Price {
    pub id: String,
}

impl SubscriptionObject {
    fn price_id(&self) -> Option<&str> {
        self.items.data.first().map(|item| item.price.id.as_str())
    }

    fn is_live(&self) -> bool {
        matches!(self.status.as_str(), "active" | "trialing")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BillingEvent {
    CheckoutCompleted(CheckoutSessionObject),
    SubscriptionUpdated(SubscriptionObject),
    SubscriptionDeleted(SubscriptionObject),
    Ignored(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEvent {
    pub id: String,
    pub event: BillingEvent,
}

pub fn parse_event(payload: &[u8]) -> Result<ParsedEvent, WebhookError> {
    let raw: RawEvent = serde_json::from_slice(payload)
        .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

    let object = raw.data.object;
    let invalid = |e: serde_json::Error| WebhookError::InvalidPayload(e.to_string());

    let event = match raw.event_type.as_str() {
        "checkout.session.completed" => {
            BillingEvent::CheckoutCompleted(serde_json::from_value(object).map_err(invalid)?)
        }
        "customer.subscription.updated" => {
            BillingEvent::SubscriptionUpdated(serde_json::from_value(object).map_err(invalid)?)
        }
        "customer.subscription.deleted" => {
            BillingEvent::SubscriptionDeleted(serde_json::from_value(object).map_err(invalid)?)
        }
        _ => BillingEvent::Ignored(raw.event_type),
    };

    Ok(ParsedEvent { id: raw.id, event })
}

// ────────────────────────────────────────────────────────────────────────────
// Reconciliation
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Updated { user_id: Uuid, plan: Plan },
    NoMatchingUser,
    Ignored,
}

/// Applies a verified billing event to local user state.
pub async fn apply_event(
    users: &dyn UserStore,
    prices: &PriceCatalog,
    event: BillingEvent,
) -> Result<EventOutcome, AppError> {
    match event {
        BillingEvent::CheckoutCompleted(session) => {
            let user_ref = session
                .client_reference_id
                .as_deref()
                .or_else(|| session.metadata.get("userId").map(String::as_str));
            let Some(user_id) = user_ref.and_then(|s| Uuid::parse_str(s).ok()) else {
                warn!("checkout.session.completed without a usable user reference");
                return Ok(EventOutcome::NoMatchingUser);
            };
            if users.find_by_id(user_id).await?.is_none() {
                warn!("checkout.session.completed for unknown user {user_id}");
                return Ok(EventOutcome::NoMatchingUser);
            }

            let plan = Plan::from_tag(session.metadata.get("planId").map(String::as_str));
            users
                .update_subscription(
                    user_id,
                    SubscriptionUpdate {
                        plan,
                        customer_id: session.customer,
                        subscription_id: session.subscription,
                    },
                )
                .await?;
            info!("Checkout completed: user {user_id} now on {plan}");
            Ok(EventOutcome::Updated { user_id, plan })
        }

        BillingEvent::SubscriptionUpdated(subscription) => {
            let Some(user) = users.find_by_customer_id(&subscription.customer).await? else {
                info!(
                    "subscription.updated for customer {} with no local user",
                    subscription.customer
                );
                return Ok(EventOutcome::NoMatchingUser);
            };

            let plan = if subscription.is_live() {
                subscription
                    .price_id()
                    .map(|price| prices.plan_for_price(price))
                    .unwrap_or(Plan::Free)
            } else {
                Plan::Free
            };

            users
                .update_subscription(
                    user.id,
                    SubscriptionUpdate {
                        plan,
                        customer_id: None,
                        subscription_id: Some(subscription.id),
                    },
                )
                .await?;
            info!(
                "Subscription updated ({}): user {} now on {plan}",
                subscription.status, user.id
            );
            Ok(EventOutcome::Updated {
                user_id: user.id,
                plan,
            })
        }

        BillingEvent::SubscriptionDeleted(subscription) => {
            let Some(user) = users.find_by_customer_id(&subscription.customer).await? else {
                info!(
                    "subscription.deleted for customer {} with no local user",
                    subscription.customer
                );
                return Ok(EventOutcome::NoMatchingUser);
            };

            if let Some(current) = user.stripe_subscription_id.as_deref() {
                if current != subscription.id {
                    info!(
                        "Ignoring deletion of superseded subscription {} for user {} (current {current})",
                        subscription.id, user.id
                    );
                    return Ok(EventOutcome::Ignored);
                }
            }

            users
                .update_subscription(
                    user.id,
                    SubscriptionUpdate {
                        plan: Plan::Free,
                        customer_id: None,
                        subscription_id: None,
                    },
                )
                .await?;
            info!("Subscription deleted: user {} back on Free", user.id);
            Ok(EventOutcome::Updated {
                user_id: user.id,
                plan: Plan::Free,
            })
        }

        BillingEvent::Ignored(event_type) => {
            info!("Ignoring unhandled Stripe event type {event_type}");
            Ok(EventOutcome::Ignored)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryUserStore;
    use serde_json::json;

    const SECRET: &str = "whsec_test";

    fn sign(payload: &[u8], timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn prices() -> PriceCatalog {
        PriceCatalog {
            pro: "price_pro".to_string(),
            premium: "price_premium".to_string(),
        }
    }

    fn subscription(customer: &str, status: &str, price: &str) -> SubscriptionObject {
        SubscriptionObject {
            id: "sub_1".to_string(),
            customer: customer.to_string(),
            status: status.to_string(),
            items: SubscriptionItems {
                data: vec![SubscriptionItem {
                    price: Price {
                        id: price.to_string(),
                    },
                }],
            },
        }
    }

    #[test]
    fn test_valid_signature_accepted() {
        let payload = br#"{"id":"evt_1"}"#;
        let now = 1_700_000_000;
        assert_eq!(verify_signature(payload, &sign(payload, now), SECRET, now), Ok(()));
    }

    #[test]
    fn test_any_matching_v1_accepted() {
        let payload = br#"{"id":"evt_1"}"#;
        let now = 1_700_000_000;
        let header = format!("{},v1=deadbeef", sign(payload, now));
        assert!(verify_signature(payload, &header, SECRET, now).is_ok());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let now = 1_700_000_000;
        let header = sign(br#"{"id":"evt_1"}"#, now);
        assert_eq!(
            verify_signature(br#"{"id":"evt_2"}"#, &header, SECRET, now),
            Err(WebhookError::SignatureMismatch)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = b"{}";
        let now = 1_700_000_000;
        assert_eq!(
            verify_signature(payload, &sign(payload, now), "whsec_other", now),
            Err(WebhookError::SignatureMismatch)
        );
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let payload = b"{}";
        let signed_at = 1_700_000_000;
        let now = signed_at + SIGNATURE_TOLERANCE_SECS + 1;
        assert_eq!(
            verify_signature(payload, &sign(payload, signed_at), SECRET, now),
            Err(WebhookError::StaleTimestamp)
        );
    }

    #[test]
    fn test_malformed_header_rejected() {
        for header in ["", "garbage", "t=abc,v1=00", "t=1700000000", "v1=abcd"] {
            assert_eq!(
                verify_signature(b"{}", header, SECRET, 1_700_000_000),
                Err(WebhookError::MalformedHeader),
                "header {header:?}"
            );
        }
    }

    #[test]
    fn test_parse_checkout_completed() {
        let payload = json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": "cs_1",
                "client_reference_id": "8f8f8f8f-0000-0000-0000-000000000000",
                "customer": "cus_1",
                "subscription": "sub_1",
                "metadata": {"planId": "pro"}
            }}
        });
        let parsed = parse_event(payload.to_string().as_bytes()).unwrap();
        assert_eq!(parsed.id, "evt_1");
        match parsed.event {
            BillingEvent::CheckoutCompleted(session) => {
                assert_eq!(session.customer.as_deref(), Some("cus_1"));
                assert_eq!(session.metadata.get("planId").map(String::as_str), Some("pro"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_unhandled_type_is_ignored() {
        let payload = json!({"id": "evt_2", "type": "invoice.paid", "data": {"object": {}}});
        let parsed = parse_event(payload.to_string().as_bytes()).unwrap();
        assert_eq!(parsed.event, BillingEvent::Ignored("invoice.paid".to_string()));
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(matches!(
            parse_event(b"not json"),
            Err(WebhookError::InvalidPayload(_))
        ));
    }

    #[tokio::test]
    async fn test_subscription_deleted_for_unknown_customer_writes_nothing() {
        let users = MemoryUserStore::default();
        users.insert_user("Jane", "jane@example.com", "hash");

        let outcome = apply_event(
            &users,
            &prices(),
            BillingEvent::SubscriptionDeleted(subscription("cus_missing", "canceled", "price_pro")),
        )
        .await
        .unwrap();

        assert_eq!(outcome, EventOutcome::NoMatchingUser);
        assert_eq!(users.subscription_writes(), 0);
    }

    #[tokio::test]
    async fn test_checkout_completed_sets_plan_and_ids() {
        let users = MemoryUserStore::default();
        let user = users.insert_user("Jane", "jane@example.com", "hash");

        let session = CheckoutSessionObject {
            client_reference_id: Some(user.id.to_string()),
            customer: Some("cus_1".to_string()),
            subscription: Some("sub_1".to_string()),
            metadata: HashMap::from([("planId".to_string(), "premium".to_string())]),
        };
        let outcome = apply_event(&users, &prices(), BillingEvent::CheckoutCompleted(session))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            EventOutcome::Updated {
                user_id: user.id,
                plan: Plan::Premium
            }
        );
        let stored = users.get(user.id).unwrap();
        assert_eq!(stored.plan(), Plan::Premium);
        assert_eq!(stored.stripe_customer_id.as_deref(), Some("cus_1"));
        assert_eq!(stored.stripe_subscription_id.as_deref(), Some("sub_1"));
    }

    #[tokio::test]
    async fn test_checkout_with_unknown_plan_tag_falls_back_to_free() {
        let users = MemoryUserStore::default();
        let user = users.insert_user("Jane", "jane@example.com", "hash");

        let session = CheckoutSessionObject {
            client_reference_id: Some(user.id.to_string()),
            customer: Some("cus_1".to_string()),
            subscription: Some("sub_1".to_string()),
            metadata: HashMap::from([("planId".to_string(), "platinum".to_string())]),
        };
        apply_event(&users, &prices(), BillingEvent::CheckoutCompleted(session))
            .await
            .unwrap();
        assert_eq!(users.get(user.id).unwrap().plan(), Plan::Free);
    }

    #[tokio::test]
    async fn test_subscription_updated_maps_price_and_status() {
        let users = MemoryUserStore::default();
        let user = users.insert_user("Jane", "jane@example.com", "hash");
        users.attach_customer(user.id, "cus_1");

        apply_event(
            &users,
            &prices(),
            BillingEvent::SubscriptionUpdated(subscription("cus_1", "active", "price_premium")),
        )
        .await
        .unwrap();
        assert_eq!(users.get(user.id).unwrap().plan(), Plan::Premium);

        apply_event(
            &users,
            &prices(),
            BillingEvent::SubscriptionUpdated(subscription("cus_1", "past_due", "price_premium")),
        )
        .await
        .unwrap();
        assert_eq!(users.get(user.id).unwrap().plan(), Plan::Free);
    }

    #[tokio::test]
    async fn test_deleting_superseded_subscription_keeps_plan() {
        let users = MemoryUserStore::default();
        let user = users.insert_user("Jane", "jane@example.com", "hash");
        users
            .update_subscription(
                user.id,
                SubscriptionUpdate {
                    plan: Plan::Premium,
                    customer_id: Some("cus_1".to_string()),
                    subscription_id: Some("sub_2".to_string()),
                },
            )
            .await
            .unwrap();
        let writes = users.subscription_writes();

        let outcome = apply_event(
            &users,
            &prices(),
            BillingEvent::SubscriptionDeleted(subscription("cus_1", "canceled", "price_pro")),
        )
        .await
        .unwrap();

        assert_eq!(outcome, EventOutcome::Ignored);
        assert_eq!(users.subscription_writes(), writes);
        let stored = users.get(user.id).unwrap();
        assert_eq!(stored.plan(), Plan::Premium);
        assert_eq!(stored.stripe_subscription_id.as_deref(), Some("sub_2"));
    }

    #[tokio::test]
    async fn test_redelivered_deletion_is_idempotent() {
        let users = MemoryUserStore::default();
        let user = users.insert_user("Jane", "jane@example.com", "hash");
        users.attach_customer(user.id, "cus_1");

        let event = BillingEvent::SubscriptionDeleted(subscription("cus_1", "canceled", "price_pro"));
        apply_event(&users, &prices(), event.clone()).await.unwrap();
        let first = users.get(user.id).unwrap();
        apply_event(&users, &prices(), event).await.unwrap();
        let second = users.get(user.id).unwrap();

        assert_eq!(first.plan, second.plan);
        assert_eq!(second.plan(), Plan::Free);
        assert!(second.stripe_subscription_id.is_none());
        assert_eq!(second.stripe_customer_id.as_deref(), Some("cus_1"));
    }
}
