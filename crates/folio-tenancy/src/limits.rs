//! Plan limit enforcement.
//!
//! Effective limits come from the tenant's per-tenant override when set,
//! otherwise from the plan catalog. A negative limit means unlimited.

use chrono::Utc;
use folio_core::models::Tenant;
use folio_core::plan::{plan_definition, within_limit};
use folio_core::AppError;

use crate::context::TenantContext;

#[derive(Clone, Copy, Default)]
pub struct LimitsEngine;

impl LimitsEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn effective_max_users(&self, tenant: &Tenant) -> i64 {
        tenant
            .max_users
            .unwrap_or_else(|| plan_definition(tenant.plan).max_users)
    }

    pub fn effective_max_posts(&self, tenant: &Tenant) -> i64 {
        tenant
            .max_posts
            .unwrap_or_else(|| plan_definition(tenant.plan).max_posts)
    }

    pub fn effective_max_storage_gb(&self, tenant: &Tenant) -> i64 {
        tenant
            .max_storage_gb
            .unwrap_or_else(|| plan_definition(tenant.plan).max_storage_gb)
    }

    /// A tenant is within its subscription while active and neither the
    /// trial nor the paid period has lapsed. Missing end dates never
    /// expire.
    pub fn is_within_subscription(&self, tenant: &Tenant) -> bool {
        if !tenant.is_active {
            return false;
        }
        let now = Utc::now();
        if let Some(trial_end) = tenant.trial_ends_at {
            if tenant.subscription_ends_at.is_none() && trial_end < now {
                return false;
            }
        }
        if let Some(sub_end) = tenant.subscription_ends_at {
            if sub_end < now {
                return false;
            }
        }
        true
    }

    /// Feature flags: a per-tenant override in `settings.features` wins,
    /// otherwise the plan's feature list decides.
    pub fn has_feature(&self, tenant: &Tenant, feature: &str) -> bool {
        if let Some(flag) = tenant
            .settings
            .get("features")
            .and_then(|f| f.get(feature))
            .and_then(|v| v.as_bool())
        {
            return flag;
        }
        plan_definition(tenant.plan).has_feature(feature)
    }

    pub async fn can_add_user(&self, ctx: &TenantContext) -> Result<bool, AppError> {
        let current = ctx.content().count_users().await?;
        Ok(within_limit(current, self.effective_max_users(ctx.tenant())))
    }

    pub async fn can_add_post(&self, ctx: &TenantContext) -> Result<bool, AppError> {
        let current = ctx.content().count_posts().await?;
        Ok(within_limit(current, self.effective_max_posts(ctx.tenant())))
    }

    pub async fn ensure_can_add_user(&self, ctx: &TenantContext) -> Result<(), AppError> {
        self.ensure_subscription(ctx.tenant())?;
        let current = ctx.content().count_users().await?;
        let limit = self.effective_max_users(ctx.tenant());
        if within_limit(current, limit) {
            Ok(())
        } else {
            Err(AppError::LimitExceeded {
                resource: "users".to_string(),
                current,
                limit,
            })
        }
    }

    pub async fn ensure_can_add_post(&self, ctx: &TenantContext) -> Result<(), AppError> {
        self.ensure_subscription(ctx.tenant())?;
        let current = ctx.content().count_posts().await?;
        let limit = self.effective_max_posts(ctx.tenant());
        if within_limit(current, limit) {
            Ok(())
        } else {
            Err(AppError::LimitExceeded {
                resource: "posts".to_string(),
                current,
                limit,
            })
        }
    }

    fn ensure_subscription(&self, tenant: &Tenant) -> Result<(), AppError> {
        if self.is_within_subscription(tenant) {
            Ok(())
        } else {
            Err(AppError::SubscriptionExpired(format!(
                "Subscription expired for tenant {}",
                tenant.id
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use folio_core::models::TenantPlan;
    use folio_core::plan::UNLIMITED;
    use serde_json::json;
    use uuid::Uuid;

    fn tenant(plan: TenantPlan) -> Tenant {
        Tenant {
            id: Uuid::new_v4(),
            name: "Acme".to_string(),
            email: "owner@acme.test".to_string(),
            plan,
            is_active: true,
            trial_ends_at: None,
            subscription_ends_at: None,
            max_users: None,
            max_posts: None,
            max_storage_gb: None,
            settings: json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_effective_limits_fall_back_to_plan() {
        let engine = LimitsEngine::new();
        let t = tenant(TenantPlan::Free);
        assert_eq!(engine.effective_max_users(&t), 1);
        assert_eq!(engine.effective_max_posts(&t), 10);
    }

    #[test]
    fn test_override_wins_over_plan() {
        let engine = LimitsEngine::new();
        let mut t = tenant(TenantPlan::Free);
        t.max_users = Some(50);
        assert_eq!(engine.effective_max_users(&t), 50);
        t.max_users = Some(UNLIMITED);
        assert_eq!(engine.effective_max_users(&t), UNLIMITED);
    }

    #[test]
    fn test_subscription_windows() {
        let engine = LimitsEngine::new();
        let mut t = tenant(TenantPlan::Starter);
        assert!(engine.is_within_subscription(&t));

        t.is_active = false;
        assert!(!engine.is_within_subscription(&t));
        t.is_active = true;

        t.trial_ends_at = Some(Utc::now() - Duration::days(1));
        assert!(!engine.is_within_subscription(&t));

        // A paid subscription supersedes an expired trial.
        t.subscription_ends_at = Some(Utc::now() + Duration::days(30));
        assert!(engine.is_within_subscription(&t));

        t.subscription_ends_at = Some(Utc::now() - Duration::days(1));
        assert!(!engine.is_within_subscription(&t));
    }

    #[test]
    fn test_feature_flags() {
        let engine = LimitsEngine::new();
        let mut t = tenant(TenantPlan::Free);
        assert!(!engine.has_feature(&t, "webhooks"));

        let starter = tenant(TenantPlan::Starter);
        assert!(engine.has_feature(&starter, "webhooks"));
        assert!(!engine.has_feature(&starter, "api_access"));

        t.settings = json!({"features": {"webhooks": true}});
        assert!(engine.has_feature(&t, "webhooks"));

        let mut pro = tenant(TenantPlan::Professional);
        pro.settings = json!({"features": {"webhooks": false}});
        assert!(!engine.has_feature(&pro, "webhooks"));
    }
}
