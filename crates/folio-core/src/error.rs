//! Error types module
//!
//! All request-path errors are unified under the `AppError` enum. The tenant
//! lifecycle operations have their own phase-tagged error types
//! (`ProvisioningError`, `DestructionError`) because their callers need to
//! know exactly which step failed to decide on remediation.

use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like resource limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
/// This trait allows errors to self-describe their HTTP response characteristics.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "TENANT_NOT_RESOLVED")
    fn error_code(&self) -> &'static str;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    #[error("No tenant registered for host: {0}")]
    TenantNotResolved(String),

    #[error("Tenant context conflict: {active} is active, attempted {attempted}")]
    TenantContextConflict {
        active: uuid::Uuid,
        attempted: uuid::Uuid,
    },

    #[error("No active tenant context")]
    NoTenantContext,

    #[error("Limit exceeded: {resource} usage {current}/{limit}")]
    LimitExceeded {
        resource: String,
        current: i64,
        limit: i64,
    },

    #[error("Subscription expired: {0}")]
    SubscriptionExpired(String),

    #[error("Domain already registered: {0}")]
    DomainTaken(String),

    #[error("Cannot delete the last domain of tenant {0}")]
    LastDomain(uuid::Uuid),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),

    #[error(transparent)]
    Destruction(#[from] DestructionError),
}

impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata per variant: (http_status, error_code, sensitive, log_level).
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        AppError::Database(_) => (500, "DATABASE_ERROR", true, LogLevel::Error),
        AppError::InvalidInput(_) => (400, "INVALID_INPUT", false, LogLevel::Debug),
        AppError::BadRequest(_) => (400, "BAD_REQUEST", false, LogLevel::Debug),
        AppError::NotFound(_) => (404, "NOT_FOUND", false, LogLevel::Debug),
        AppError::TenantNotFound(_) => (404, "TENANT_NOT_FOUND", false, LogLevel::Debug),
        AppError::TenantNotResolved(_) => (404, "TENANT_NOT_RESOLVED", false, LogLevel::Debug),
        AppError::TenantContextConflict { .. } => {
            (500, "TENANT_CONTEXT_CONFLICT", true, LogLevel::Error)
        }
        AppError::NoTenantContext => (500, "NO_TENANT_CONTEXT", true, LogLevel::Error),
        AppError::LimitExceeded { .. } => (402, "LIMIT_EXCEEDED", false, LogLevel::Warn),
        AppError::SubscriptionExpired(_) => (402, "SUBSCRIPTION_EXPIRED", false, LogLevel::Debug),
        AppError::DomainTaken(_) => (409, "DOMAIN_TAKEN", false, LogLevel::Debug),
        AppError::LastDomain(_) => (409, "LAST_DOMAIN", false, LogLevel::Debug),
        AppError::Unauthorized(_) => (401, "UNAUTHORIZED", false, LogLevel::Debug),
        AppError::Internal(_) => (500, "INTERNAL_ERROR", true, LogLevel::Error),
        AppError::InternalWithSource { .. } => (500, "INTERNAL_ERROR", true, LogLevel::Error),
        AppError::Provisioning(_) => (500, "PROVISIONING_FAILED", false, LogLevel::Error),
        AppError::Destruction(_) => (500, "DESTRUCTION_FAILED", false, LogLevel::Error),
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
            AppError::TenantContextConflict { .. } | AppError::NoTenantContext => {
                "Internal server error".to_string()
            }
            // Phase + message, never a stack trace.
            AppError::Provisioning(e) => {
                format!("Tenant provisioning failed at phase {}", e.phase)
            }
            AppError::Destruction(e) => {
                format!("Tenant destruction failed at phase {}", e.phase)
            }
            other => other.to_string(),
        }
    }
}

/// Phase of tenant provisioning that failed.
///
/// Everything up to and including the central transaction is atomic; these
/// phases are the post-commit steps that need compensating rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningPhase {
    DbCreate,
    Migrate,
    Seed,
}

impl std::fmt::Display for ProvisioningPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProvisioningPhase::DbCreate => write!(f, "db-create"),
            ProvisioningPhase::Migrate => write!(f, "migrate"),
            ProvisioningPhase::Seed => write!(f, "seed"),
        }
    }
}

/// Provisioning failed at a specific phase. The central rows and any
/// partially created database have already been rolled back by the time this
/// surfaces; the caller decides whether to retry from scratch.
#[derive(Debug, thiserror::Error)]
#[error("Tenant provisioning failed at phase {phase}: {source}")]
pub struct ProvisioningError {
    pub phase: ProvisioningPhase,
    #[source]
    pub source: anyhow::Error,
}

impl ProvisioningError {
    pub fn new(phase: ProvisioningPhase, source: impl Into<anyhow::Error>) -> Self {
        Self {
            phase,
            source: source.into(),
        }
    }
}

/// Phase of tenant destruction that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestructionPhase {
    /// Central row deletion failed; nothing was dropped (fail closed).
    CentralDelete,
    /// Central rows are gone but the physical database drop failed; the
    /// database name is carried for manual reconciliation.
    DbDrop,
}

impl std::fmt::Display for DestructionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DestructionPhase::CentralDelete => write!(f, "central-delete"),
            DestructionPhase::DbDrop => write!(f, "db-drop"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Tenant destruction failed at phase {phase}: {source}")]
pub struct DestructionError {
    pub phase: DestructionPhase,
    /// Database name left behind when the drop fails after the central
    /// delete committed. `None` for central-delete failures.
    pub orphaned_database: Option<String>,
    #[source]
    pub source: anyhow::Error,
}

impl DestructionError {
    pub fn central_delete(source: impl Into<anyhow::Error>) -> Self {
        Self {
            phase: DestructionPhase::CentralDelete,
            orphaned_database: None,
            source: source.into(),
        }
    }

    pub fn db_drop(database: String, source: impl Into<anyhow::Error>) -> Self {
        Self {
            phase: DestructionPhase::DbDrop,
            orphaned_database: Some(database),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_database() {
        let err = AppError::from(sqlx::Error::PoolClosed);
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert_eq!(err.client_message(), "Failed to access database");
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_limit_exceeded() {
        let err = AppError::LimitExceeded {
            resource: "posts".to_string(),
            current: 100,
            limit: 50,
        };
        assert_eq!(err.http_status_code(), 402);
        assert_eq!(err.error_code(), "LIMIT_EXCEEDED");
        assert!(err.client_message().contains("posts"));
        assert!(err.client_message().contains("100"));
        assert!(err.client_message().contains("50"));
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_error_metadata_tenant_not_resolved() {
        let err = AppError::TenantNotResolved("unknown.example.com".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "TENANT_NOT_RESOLVED");
        assert!(err.client_message().contains("unknown.example.com"));
    }

    #[test]
    fn test_context_conflict_is_masked() {
        let err = AppError::TenantContextConflict {
            active: uuid::Uuid::new_v4(),
            attempted: uuid::Uuid::new_v4(),
        };
        // Cross-tenant details never reach the client.
        assert_eq!(err.client_message(), "Internal server error");
        assert!(err.is_sensitive());
    }

    #[test]
    fn test_provisioning_error_carries_phase() {
        let err = ProvisioningError::new(
            ProvisioningPhase::Migrate,
            anyhow::anyhow!("relation already exists"),
        );
        assert_eq!(err.phase, ProvisioningPhase::Migrate);
        assert!(err.to_string().contains("migrate"));
        assert!(err.to_string().contains("relation already exists"));
    }

    #[test]
    fn test_provisioning_client_message_has_phase_no_cause() {
        let err = AppError::from(ProvisioningError::new(
            ProvisioningPhase::DbCreate,
            anyhow::anyhow!("connection refused at 10.0.0.3"),
        ));
        let msg = err.client_message();
        assert!(msg.contains("db-create"));
        assert!(!msg.contains("10.0.0.3"));
    }

    #[test]
    fn test_destruction_error_db_drop_keeps_database_name() {
        let err = DestructionError::db_drop(
            "folio_tenant_abc".to_string(),
            anyhow::anyhow!("database is being accessed by other users"),
        );
        assert_eq!(err.phase, DestructionPhase::DbDrop);
        assert_eq!(err.orphaned_database.as_deref(), Some("folio_tenant_abc"));
    }
}
