//! Static plan catalog.
//!
//! Plans define default resource ceilings and feature flags. A tenant's
//! effective limit for a resource is its per-tenant override when set,
//! otherwise the plan default. `UNLIMITED` is the sentinel for "no ceiling";
//! any negative limit is treated as unlimited.

use serde::Serialize;

use crate::models::TenantPlan;

/// Sentinel limit meaning "no ceiling".
pub const UNLIMITED: i64 = -1;

#[derive(Debug, Clone, Serialize)]
pub struct PlanDefinition {
    pub plan: TenantPlan,
    pub name: &'static str,
    pub max_users: i64,
    pub max_posts: i64,
    pub max_storage_gb: i64,
    pub monthly_price_cents: i64,
    pub features: &'static [&'static str],
}

impl PlanDefinition {
    pub fn has_feature(&self, key: &str) -> bool {
        self.features.contains(&key)
    }
}

const PLAN_CATALOG: &[PlanDefinition] = &[
    PlanDefinition {
        plan: TenantPlan::Free,
        name: "Free",
        max_users: 1,
        max_posts: 10,
        max_storage_gb: 1,
        monthly_price_cents: 0,
        features: &[],
    },
    PlanDefinition {
        plan: TenantPlan::Starter,
        name: "Starter",
        max_users: 5,
        max_posts: 100,
        max_storage_gb: 10,
        monthly_price_cents: 900,
        features: &["webhooks", "custom_domains"],
    },
    PlanDefinition {
        plan: TenantPlan::Professional,
        name: "Professional",
        max_users: 25,
        max_posts: 1000,
        max_storage_gb: 100,
        monthly_price_cents: 2900,
        features: &["webhooks", "custom_domains", "scheduled_posts", "api_access"],
    },
    PlanDefinition {
        plan: TenantPlan::Enterprise,
        name: "Enterprise",
        max_users: UNLIMITED,
        max_posts: UNLIMITED,
        max_storage_gb: UNLIMITED,
        monthly_price_cents: 9900,
        features: &[
            "webhooks",
            "custom_domains",
            "scheduled_posts",
            "api_access",
            "priority_support",
        ],
    },
];

/// Look up the static definition for a plan. Every `TenantPlan` variant has
/// an entry, so this never fails.
pub fn plan_definition(plan: TenantPlan) -> &'static PlanDefinition {
    PLAN_CATALOG
        .iter()
        .find(|p| p.plan == plan)
        .unwrap_or(&PLAN_CATALOG[0])
}

pub fn plan_catalog() -> &'static [PlanDefinition] {
    PLAN_CATALOG
}

/// Decide whether a resource count is within a limit.
/// Negative limits are the unlimited sentinel and always pass.
pub fn within_limit(current: i64, limit: i64) -> bool {
    limit < 0 || current < limit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_plan_has_a_definition() {
        for plan in [
            TenantPlan::Free,
            TenantPlan::Starter,
            TenantPlan::Professional,
            TenantPlan::Enterprise,
        ] {
            assert_eq!(plan_definition(plan).plan, plan);
        }
    }

    #[test]
    fn test_within_limit_matrix() {
        // Below, at, and above the ceiling.
        assert!(within_limit(0, 10));
        assert!(within_limit(9, 10));
        assert!(!within_limit(10, 10));
        assert!(!within_limit(11, 10));
        // Zero ceiling blocks everything.
        assert!(!within_limit(0, 0));
        // Unlimited sentinel always passes.
        assert!(within_limit(0, UNLIMITED));
        assert!(within_limit(1_000_000, UNLIMITED));
        assert!(within_limit(i64::MAX, -5));
    }

    #[test]
    fn test_enterprise_is_unlimited() {
        let def = plan_definition(TenantPlan::Enterprise);
        assert_eq!(def.max_users, UNLIMITED);
        assert_eq!(def.max_posts, UNLIMITED);
        assert_eq!(def.max_storage_gb, UNLIMITED);
    }

    #[test]
    fn test_catalog_serializes() {
        let json = serde_json::to_value(plan_catalog()).expect("serialize catalog");
        let plans = json.as_array().expect("array");
        assert_eq!(plans.len(), 4);
        assert_eq!(plans[1]["name"], "Starter");
        assert_eq!(plans[1]["features"][0], "webhooks");
    }

    #[test]
    fn test_feature_flags() {
        assert!(!plan_definition(TenantPlan::Free).has_feature("webhooks"));
        assert!(plan_definition(TenantPlan::Starter).has_feature("webhooks"));
        assert!(!plan_definition(TenantPlan::Starter).has_feature("api_access"));
        assert!(plan_definition(TenantPlan::Professional).has_feature("api_access"));
    }
}
