//! Stripe billing: hosted checkout, customer portal, and webhook
//! reconciliation of subscription state onto user rows.

pub mod handlers;
pub mod stripe;
pub mod webhook;

use crate::config::StripeConfig;
use crate::plans::Plan;

/// Two-way mapping between paid plans and Stripe price ids.
#[derive(Debug, Clone)]
pub struct PriceCatalog {
    pub pro: String,
    pub premium: String,
}

impl PriceCatalog {
    pub fn from_config(config: &StripeConfig) -> Self {
        Self {
            pro: config.price_pro.clone(),
            premium: config.price_premium.clone(),
        }
    }

    /// Price id for a paid plan; `None` for free.
    pub fn price_for(&self, plan: Plan) -> Option<&str> {
        match plan {
            Plan::Free => None,
            Plan::Pro => Some(&self.pro),
            Plan::Premium => Some(&self.premium),
        }
    }

    /// Plan for a price id. Unknown prices resolve to free.
    pub fn plan_for_price(&self, price_id: &str) -> Plan {
        if price_id == self.pro {
            Plan::Pro
        } else if price_id == self.premium {
            Plan::Premium
        } else {
            Plan::Free
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PriceCatalog {
        PriceCatalog {
            pro: "price_pro".to_string(),
            premium: "price_premium".to_string(),
        }
    }

    #[test]
    fn test_price_lookup_both_ways() {
        let prices = catalog();
        for plan in [Plan::Pro, Plan::Premium] {
            let price = prices.price_for(plan).unwrap();
            assert_eq!(prices.plan_for_price(price), plan);
        }
        assert!(prices.price_for(Plan::Free).is_none());
    }

    #[test]
    fn test_unknown_price_is_free() {
        assert_eq!(catalog().plan_for_price("price_legacy"), Plan::Free);
    }
}
