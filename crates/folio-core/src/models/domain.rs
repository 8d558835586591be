use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hostname → tenant mapping in the central database.
///
/// Hostnames are stored lowercased without a port and are globally unique.
/// Every active tenant keeps at least one domain; the repository refuses to
/// delete the last one.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Domain {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub hostname: String,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}
