use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Subscription plan tiers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "tenant_plan", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TenantPlan {
    Free,
    Starter,
    Professional,
    Enterprise,
}

impl Display for TenantPlan {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TenantPlan::Free => write!(f, "free"),
            TenantPlan::Starter => write!(f, "starter"),
            TenantPlan::Professional => write!(f, "professional"),
            TenantPlan::Enterprise => write!(f, "enterprise"),
        }
    }
}

impl FromStr for TenantPlan {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(TenantPlan::Free),
            "starter" => Ok(TenantPlan::Starter),
            "professional" => Ok(TenantPlan::Professional),
            "enterprise" => Ok(TenantPlan::Enterprise),
            _ => Err(anyhow::anyhow!("Invalid plan: {}", s)),
        }
    }
}

/// Tenant identity record in the central database.
///
/// Exactly one isolated database exists per active tenant; its name is
/// derived deterministically from the id (see `Tenant::database_name`).
/// The `max_*` columns are per-tenant overrides; `None` falls back to the
/// plan default and `-1` means unlimited.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub plan: TenantPlan,
    pub is_active: bool,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub subscription_ends_at: Option<DateTime<Utc>>,
    pub max_users: Option<i64>,
    pub max_posts: Option<i64>,
    pub max_storage_gb: Option<i64>,
    pub settings: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// Deterministic name of this tenant's isolated database.
    pub fn database_name(&self) -> String {
        database_name_for(self.id)
    }
}

/// `folio_tenant_<uuid without hyphens>`. Hyphens are not valid in a
/// Postgres identifier without quoting, so the simple form is used.
pub fn database_name_for(tenant_id: Uuid) -> String {
    format!("folio_tenant_{}", tenant_id.simple())
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTenantRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid contact email"))]
    pub email: String,
    #[validate(length(min = 1, max = 253, message = "Domain must be 1-253 characters"))]
    pub domain: String,
    pub plan: TenantPlan,
    #[serde(default)]
    pub trial: bool,
    #[serde(default)]
    pub seed: bool,
}

#[derive(Debug, Serialize)]
pub struct TenantResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub plan: TenantPlan,
    pub is_active: bool,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub subscription_ends_at: Option<DateTime<Utc>>,
    pub domains: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl TenantResponse {
    pub fn from_tenant(tenant: Tenant, domains: Vec<String>) -> Self {
        Self {
            id: tenant.id,
            name: tenant.name,
            email: tenant.email,
            plan: tenant.plan,
            is_active: tenant.is_active,
            trial_ends_at: tenant.trial_ends_at,
            subscription_ends_at: tenant.subscription_ends_at,
            domains,
            created_at: tenant.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_name_is_deterministic_and_identifier_safe() {
        let id = Uuid::parse_str("a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8").unwrap();
        let name = database_name_for(id);
        assert_eq!(name, "folio_tenant_a1a2a3a4b1b2c1c2d1d2d3d4d5d6d7d8");
        assert_eq!(name, database_name_for(id));
        assert!(name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
    }

    #[test]
    fn test_plan_round_trip() {
        for s in ["free", "starter", "professional", "enterprise"] {
            let plan: TenantPlan = s.parse().unwrap();
            assert_eq!(plan.to_string(), s);
        }
        assert!("premium".parse::<TenantPlan>().is_err());
    }
}
