//! Axum route handlers for billing and the Stripe webhook.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::auth::AuthUser;
use crate::billing::stripe::CheckoutParams;
use crate::billing::webhook::{apply_event, parse_event, verify_signature, WebhookError};
use crate::billing::PriceCatalog;
use crate::errors::AppError;
use crate::plans::Plan;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub plan_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PortalResponse {
    pub url: String,
}

/// POST /api/v1/billing/checkout
pub async fn handle_checkout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let Json(req) = payload?;
    let plan = Plan::parse_paid(&req.plan_id).ok_or_else(|| {
        AppError::Validation("planId must be one of: pro, premium".to_string())
    })?;

    let prices = PriceCatalog::from_config(&state.config.stripe);
    let price_id = prices
        .price_for(plan)
        .ok_or_else(|| AppError::Validation(format!("No price configured for {plan}")))?;

    let app_url = &state.config.app_url;
    let params = CheckoutParams {
        user_id: user.id,
        email: &user.email,
        customer_id: user.stripe_customer_id.as_deref(),
        plan_tag: plan.tag(),
        price_id,
        success_url: format!("{app_url}/dashboard?checkout=success&session_id={{CHECKOUT_SESSION_ID}}"),
        cancel_url: format!("{app_url}/pricing?checkout=cancelled"),
    };

    let session = state.stripe.create_checkout_session(&params).await?;
    info!("User {} started checkout for {plan}", user.id);

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        url: session.url,
    }))
}

/// POST /api/v1/billing/portal
pub async fn handle_portal(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<PortalResponse>, AppError> {
    let customer_id = user.stripe_customer_id.as_deref().ok_or_else(|| {
        AppError::Validation("No billing account exists for this user".to_string())
    })?;

    let return_url = format!("{}/settings/billing", state.config.app_url);
    let session = state
        .stripe
        .create_portal_session(customer_id, &return_url)
        .await?;

    Ok(Json(PortalResponse { url: session.url }))
}

/// POST /api/v1/webhooks/stripe
///
/// Takes the raw body so the signature is checked over the exact bytes Stripe
/// signed.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let verified = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingSignature)
        .and_then(|signature| {
            verify_signature(
                &body,
                signature,
                &state.config.stripe.webhook_secret,
                Utc::now().timestamp(),
            )
        });

    if let Err(e) = verified {
        warn!("Rejected Stripe webhook: {e}");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("Webhook signature verification failed: {e}") })),
        )
            .into_response();
    }

    let parsed = match parse_event(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Unparseable Stripe webhook: {e}");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    let prices = PriceCatalog::from_config(&state.config.stripe);
    match apply_event(state.users.as_ref(), &prices, parsed.event).await {
        Ok(outcome) => {
            info!("Stripe event {} handled: {outcome:?}", parsed.id);
            Json(json!({ "received": true })).into_response()
        }
        Err(e) => {
            error!("Stripe event {} failed: {e}", parsed.id);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Webhook handler failed" })),
            )
                .into_response()
        }
    }
}
