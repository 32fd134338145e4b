use serde::Serialize;

use crate::plans::limits::{Plan, UNLIMITED};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// A countable resource gated by plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UsageKind {
    JobsApplied,
    Resumes,
    StorageMb,
    AiRequests,
}

impl UsageKind {
    /// Storage is checked prospectively (current + incoming); every other
    /// kind is a strict count check.
    fn is_prospective(self) -> bool {
        matches!(self, UsageKind::StorageMb)
    }
}

/// Current usage of one kind plus the amount a pending write would add.
#[derive(Debug, Clone, Copy)]
pub struct UsageCheck {
    pub kind: UsageKind,
    pub current: f64,
    /// Only consulted for prospective kinds.
    pub increment: f64,
}

impl UsageCheck {
    pub fn count(kind: UsageKind, current: i64) -> Self {
        Self {
            kind,
            current: current as f64,
            increment: 0.0,
        }
    }

    pub fn storage(current_mb: f64, incoming_mb: f64) -> Self {
        Self {
            kind: UsageKind::StorageMb,
            current: current_mb,
            increment: incoming_mb,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Headroom left under the limit; `None` when unlimited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<f64>,
}

/// Decides whether a usage check passes under `limit` for `plan`.
///
/// `limit == -1` always allows. Count kinds allow iff `current < limit`;
/// storage allows iff `current + increment <= limit`.
pub fn evaluate(check: UsageCheck, limit: i64, plan: Plan) -> LimitDecision {
    if limit == UNLIMITED {
        return LimitDecision {
            allowed: true,
            message: None,
            remaining: None,
        };
    }

    let limit_f = limit as f64;
    let remaining = round2((limit_f - check.current).max(0.0));

    let allowed = if check.kind.is_prospective() {
        round2(check.current + check.increment) <= limit_f
    } else {
        check.current < limit_f
    };

    let message = (!allowed).then(|| limit_message(check.kind, limit, plan, remaining));

    LimitDecision {
        allowed,
        message,
        remaining: Some(remaining),
    }
}

fn limit_message(kind: UsageKind, limit: i64, plan: Plan, remaining: f64) -> String {
    match kind {
        UsageKind::JobsApplied => format!(
            "You have reached the limit of {limit} applied jobs on the {plan} plan. \
             Upgrade your plan to track more applications."
        ),
        UsageKind::Resumes => format!(
            "You have reached the limit of {limit} resumes on the {plan} plan. \
             Upgrade your plan to add more resumes."
        ),
        UsageKind::StorageMb => format!(
            "This upload would exceed your {limit}MB storage limit on the {plan} plan. \
             You have {remaining}MB remaining."
        ),
        UsageKind::AiRequests => format!(
            "You have used all {limit} AI requests for this month on the {plan} plan. \
             Upgrade your plan for more AI requests."
        ),
    }
}

/// Converts a byte count to megabytes rounded to two decimals.
pub fn bytes_to_mb(bytes: i64) -> f64 {
    round2(bytes.max(0) as f64 / BYTES_PER_MB)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
