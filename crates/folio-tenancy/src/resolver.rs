//! Hostname to tenant resolution.

use folio_core::models::Tenant;
use folio_core::AppError;
use sqlx::PgPool;

use folio_db::{DomainRepository, TenantRepository};

/// Canonicalize a host header value: lowercase, strip any port suffix
/// and a trailing dot.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().to_ascii_lowercase();
    let host = match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host.as_str(),
    };
    host.strip_suffix('.').unwrap_or(host).to_string()
}

#[derive(Debug, Clone)]
pub enum ResolvedHost {
    /// The platform's own domain, serving the admin surface.
    Central,
    /// A tenant's registered domain.
    Tenant(Tenant),
}

#[derive(Clone)]
pub struct DomainResolver {
    central_domains: Vec<String>,
    domains: DomainRepository,
    tenants: TenantRepository,
}

impl DomainResolver {
    pub fn new(pool: PgPool, central_domains: Vec<String>) -> Self {
        Self {
            central_domains: central_domains
                .into_iter()
                .map(|d| normalize_host(&d))
                .collect(),
            domains: DomainRepository::new(pool.clone()),
            tenants: TenantRepository::new(pool),
        }
    }

    /// Resolve a raw host header. Unknown hostnames and hostnames whose
    /// tenant has been deactivated both resolve to an error.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, host: &str) -> Result<ResolvedHost, AppError> {
        let hostname = normalize_host(host);

        if self.central_domains.iter().any(|d| d == &hostname) {
            return Ok(ResolvedHost::Central);
        }

        let domain = self
            .domains
            .find_by_hostname(&hostname)
            .await?
            .ok_or_else(|| AppError::TenantNotResolved(hostname.clone()))?;

        let tenant = self.tenants.get_required(domain.tenant_id).await?;
        if !tenant.is_active {
            return Err(AppError::TenantNotResolved(hostname));
        }

        Ok(ResolvedHost::Tenant(tenant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host_lowercases() {
        assert_eq!(normalize_host("Blog.Example.COM"), "blog.example.com");
    }

    #[test]
    fn test_normalize_host_strips_port() {
        assert_eq!(normalize_host("example.com:8080"), "example.com");
        assert_eq!(normalize_host("localhost:3000"), "localhost");
    }

    #[test]
    fn test_normalize_host_keeps_non_port_colon_segments() {
        // Not a port, leave it alone.
        assert_eq!(normalize_host("example.com:abc"), "example.com:abc");
    }

    #[test]
    fn test_normalize_host_strips_trailing_dot() {
        assert_eq!(normalize_host("example.com."), "example.com");
        assert_eq!(normalize_host("Example.COM.:443"), "example.com");
    }
}
