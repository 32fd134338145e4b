//! Plan tiers, usage limits, and the checks that gate feature usage.
//!
//! `limits` holds the static per-plan table, `usage` the pure limit
//! evaluation, `store` the count sources, and `enforcement` the async checks
//! handlers call before committing a write.

pub mod enforcement;
pub mod handlers;
pub mod limits;
pub mod store;
pub mod usage;

pub use limits::{Plan, PlanLimits, UNLIMITED};
pub use usage::{evaluate, LimitDecision, UsageCheck, UsageKind};
