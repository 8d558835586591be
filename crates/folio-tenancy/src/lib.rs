//! Tenant lifecycle and isolation.
//!
//! Everything that touches a tenant's isolated database goes through a
//! `TenantContext`, obtained by activating a `TenantSession` for the
//! duration of one unit of work. The provisioner owns creation and
//! destruction of the physical databases with compensating rollback; the
//! migrator, seeders and backup only ever accept a context, so they cannot
//! be pointed at the central database by mistake.

pub mod backup;
pub mod context;
pub mod limits;
pub mod migrations;
pub mod pools;
pub mod provisioner;
pub mod reporting;
pub mod resolver;
pub mod seed;

pub use backup::backup_tenant;
pub use context::{ActiveTenant, TenantContext, TenantSession};
pub use limits::LimitsEngine;
pub use migrations::Migrator;
pub use pools::TenantPools;
pub use provisioner::TenantProvisioner;
pub use reporting::{PlatformReport, ReportingService, TenantUsage};
pub use resolver::{normalize_host, DomainResolver, ResolvedHost};
