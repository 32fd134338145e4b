use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel limit value meaning "no cap".
pub const UNLIMITED: i64 = -1;

/// Subscription tier. Stored on the user row as a lowercase tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Pro,
    Premium,
}

/// Numeric caps for one plan. `UNLIMITED` (-1) disables a cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimits {
    pub jobs_applied: i64,
    pub resumes: i64,
    pub storage_mb: i64,
    pub ai_requests_per_month: i64,
}

const FREE_LIMITS: PlanLimits = PlanLimits {
    jobs_applied: 10,
    resumes: 3,
    storage_mb: 5,
    ai_requests_per_month: 5,
};

const PRO_LIMITS: PlanLimits = PlanLimits {
    jobs_applied: 100,
    resumes: 10,
    storage_mb: 50,
    ai_requests_per_month: 100,
};

const PREMIUM_LIMITS: PlanLimits = PlanLimits {
    jobs_applied: UNLIMITED,
    resumes: UNLIMITED,
    storage_mb: 500,
    ai_requests_per_month: UNLIMITED,
};

impl Plan {
    pub const ALL: [Plan; 3] = [Plan::Free, Plan::Pro, Plan::Premium];

    /// Resolves a stored tag. Missing or unrecognised tags resolve to `Free`,
    /// the most restrictive tier.
    pub fn from_tag(tag: Option<&str>) -> Plan {
        match tag.map(|t| t.trim().to_ascii_lowercase()).as_deref() {
            Some("pro") => Plan::Pro,
            Some("premium") => Plan::Premium,
            _ => Plan::Free,
        }
    }

    /// Parses a tag strictly; used where an unknown value must be rejected
    /// rather than defaulted (checkout requests).
    pub fn parse_paid(tag: &str) -> Option<Plan> {
        match tag.trim() {
            "pro" => Some(Plan::Pro),
            "premium" => Some(Plan::Premium),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
            Plan::Premium => "premium",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Plan::Free => "Free",
            Plan::Pro => "Pro",
            Plan::Premium => "Premium",
        }
    }

    pub fn limits(self) -> PlanLimits {
        match self {
            Plan::Free => FREE_LIMITS,
            Plan::Pro => PRO_LIMITS,
            Plan::Premium => PREMIUM_LIMITS,
        }
    }

    pub fn is_paid(self) -> bool {
        self != Plan::Free
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tags_resolve() {
        assert_eq!(Plan::from_tag(Some("free")), Plan::Free);
        assert_eq!(Plan::from_tag(Some("pro")), Plan::Pro);
        assert_eq!(Plan::from_tag(Some("premium")), Plan::Premium);
        assert_eq!(Plan::from_tag(Some(" Premium ")), Plan::Premium);
    }

    #[test]
    fn test_missing_tag_resolves_to_free() {
        assert_eq!(Plan::from_tag(None), Plan::Free);
        assert_eq!(Plan::from_tag(None).limits(), FREE_LIMITS);
    }

    #[test]
    fn test_unknown_tag_resolves_to_free() {
        for tag in ["", "enterprise", "gold", "pro-annual", "null"] {
            assert_eq!(Plan::from_tag(Some(tag)), Plan::Free, "tag {tag:?}");
        }
    }

    #[test]
    fn test_parse_paid_rejects_free_and_unknown() {
        assert_eq!(Plan::parse_paid("pro"), Some(Plan::Pro));
        assert_eq!(Plan::parse_paid("premium"), Some(Plan::Premium));
        assert_eq!(Plan::parse_paid("free"), None);
        assert_eq!(Plan::parse_paid("business"), None);
    }

    #[test]
    fn test_free_plan_caps_jobs_at_ten() {
        assert_eq!(Plan::Free.limits().jobs_applied, 10);
    }

    #[test]
    fn test_plan_serializes_as_lowercase_tag() {
        assert_eq!(serde_json::to_string(&Plan::Premium).unwrap(), "\"premium\"");
    }
}
