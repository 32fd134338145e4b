//! Limit checks run by handlers before committing a gated write.
//!
//! Job, resume, and storage checks read the current count and compare it
//! to the plan limit. Two concurrent requests can both pass and commit, so
//! those limits may be exceeded by one; that slack is accepted. AI requests
//! are consumed atomically through `AiUsageCounter::try_consume`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::plans::limits::{Plan, PlanLimits};
use crate::plans::store::{month_period, AiUsageCounter, UsageStore};
use crate::plans::usage::{bytes_to_mb, evaluate, LimitDecision, UsageCheck, UsageKind};

fn into_result(decision: LimitDecision) -> Result<(), AppError> {
    if decision.allowed {
        Ok(())
    } else {
        Err(AppError::PlanLimit(
            decision
                .message
                .unwrap_or_else(|| "Plan limit reached".to_string()),
        ))
    }
}

/// Checks that one more job may be marked applied.
///
/// A job that is already applied is already counted, so re-saving it
/// bypasses the check.
pub async fn ensure_can_mark_applied(
    usage: &dyn UsageStore,
    user_id: Uuid,
    plan: Plan,
    already_applied: bool,
) -> Result<(), AppError> {
    if already_applied {
        return Ok(());
    }
    let current = usage.applied_job_count(user_id).await?;
    into_result(evaluate(
        UsageCheck::count(UsageKind::JobsApplied, current),
        plan.limits().jobs_applied,
        plan,
    ))
}

pub async fn ensure_can_add_resume(
    usage: &dyn UsageStore,
    user_id: Uuid,
    plan: Plan,
) -> Result<(), AppError> {
    let current = usage.resume_count(user_id).await?;
    into_result(evaluate(
        UsageCheck::count(UsageKind::Resumes, current),
        plan.limits().resumes,
        plan,
    ))
}

/// Checks that storing `incoming_bytes` more keeps the user within the
/// storage limit.
pub async fn ensure_storage_available(
    usage: &dyn UsageStore,
    user_id: Uuid,
    plan: Plan,
    incoming_bytes: i64,
) -> Result<(), AppError> {
    let current_mb = bytes_to_mb(usage.storage_bytes(user_id).await?);
    into_result(evaluate(
        UsageCheck::storage(current_mb, bytes_to_mb(incoming_bytes)),
        plan.limits().storage_mb,
        plan,
    ))
}

/// A consumed AI request. Hand it back with [`release_ai_request`] if the
/// provider call never started.
#[derive(Debug, Clone)]
pub struct AiGrant {
    pub period: String,
    pub used: i64,
}

pub async fn consume_ai_request(
    counter: &dyn AiUsageCounter,
    user_id: Uuid,
    plan: Plan,
    now: DateTime<Utc>,
) -> Result<AiGrant, AppError> {
    let period = month_period(now);
    let limit = plan.limits().ai_requests_per_month;

    match counter.try_consume(user_id, &period, limit).await? {
        Some(used) => {
            info!("AI request {used} of {limit} for user {user_id} in {period}");
            Ok(AiGrant { period, used })
        }
        None => into_result(evaluate(
            UsageCheck::count(UsageKind::AiRequests, limit),
            limit,
            plan,
        ))
        .map(|_| AiGrant { period, used: limit }),
    }
}

pub async fn release_ai_request(
    counter: &dyn AiUsageCounter,
    user_id: Uuid,
    grant: &AiGrant,
) -> Result<(), AppError> {
    counter.release(user_id, &grant.period).await
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub plan: Plan,
    pub plan_name: &'static str,
    pub limits: PlanLimits,
    pub jobs_applied: i64,
    pub resumes: i64,
    pub storage_mb: f64,
    pub ai_requests_this_month: i64,
}

/// Current usage of every kind alongside the plan limits.
pub async fn usage_summary(
    usage: &dyn UsageStore,
    counter: &dyn AiUsageCounter,
    user_id: Uuid,
    plan: Plan,
    now: DateTime<Utc>,
) -> Result<UsageSummary, AppError> {
    Ok(UsageSummary {
        plan,
        plan_name: plan.display_name(),
        limits: plan.limits(),
        jobs_applied: usage.applied_job_count(user_id).await?,
        resumes: usage.resume_count(user_id).await?,
        storage_mb: bytes_to_mb(usage.storage_bytes(user_id).await?),
        ai_requests_this_month: counter.current(user_id, &month_period(now)).await?,
    })
}
