//! Tenant service - registry CRUD and connection validation

use std::sync::Arc;

use url::Url;
use uuid::Uuid;

use crate::adapters::DuckDbRegistry;
use crate::domain::result::{Error, Result};
use crate::domain::Tenant;
use crate::ports::TenantRegistry;

/// Service for managing tenant registrations
pub struct TenantService {
    registry: Arc<DuckDbRegistry>,
}

impl TenantService {
    pub fn new(registry: Arc<DuckDbRegistry>) -> Self {
        Self { registry }
    }

    /// Register a new tenant. Connection settings are optional at creation;
    /// an unconfigured tenant simply cannot be reconciled yet.
    pub fn add(
        &self,
        slug: &str,
        name: &str,
        database_url: Option<String>,
        service_key: Option<String>,
        anon_key: Option<String>,
    ) -> Result<Tenant> {
        validate_slug(slug)?;
        if let Some(url) = database_url.as_deref() {
            validate_database_url(url)?;
        }
        if self.registry.get_tenant(slug)?.is_some() {
            return Err(Error::validation(format!(
                "tenant with slug '{}' already exists",
                slug
            )));
        }

        let mut tenant = Tenant::new(Uuid::new_v4(), slug, name);
        tenant.database_url = database_url;
        tenant.service_key = service_key;
        tenant.anon_key = anon_key;

        self.registry.add_tenant(&tenant)?;
        Ok(tenant)
    }

    /// All registered tenants, ordered by slug
    pub fn list(&self) -> Result<Vec<Tenant>> {
        self.registry.list_tenants()
    }

    /// One tenant by slug
    pub fn get(&self, slug: &str) -> Result<Tenant> {
        self.registry
            .get_tenant(slug)?
            .ok_or_else(|| Error::not_found(format!("tenant {}", slug)))
    }

    /// Remove a tenant registration (its remote database is untouched)
    pub fn remove(&self, slug: &str) -> Result<()> {
        self.registry.remove_tenant(slug)
    }

    /// Update a tenant's connection settings. Passing None leaves the
    /// corresponding field unchanged.
    pub fn set_connection(
        &self,
        slug: &str,
        database_url: Option<String>,
        service_key: Option<String>,
        anon_key: Option<String>,
    ) -> Result<Tenant> {
        let mut tenant = self.get(slug)?;
        if let Some(url) = database_url {
            validate_database_url(&url)?;
            tenant.database_url = Some(url);
        }
        if let Some(key) = service_key {
            tenant.service_key = Some(key);
        }
        if let Some(key) = anon_key {
            tenant.anon_key = Some(key);
        }
        self.registry.update_tenant(&tenant)?;
        self.get(slug)
    }
}

/// Slugs are lowercase alphanumerics and hyphens, used verbatim on the
/// command line and as the registry key
fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() {
        return Err(Error::validation("slug must not be empty"));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(Error::validation(
            "slug may only contain lowercase letters, digits and hyphens",
        ));
    }
    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(Error::validation("slug must not start or end with a hyphen"));
    }
    Ok(())
}

fn validate_database_url(url: &str) -> Result<()> {
    let parsed =
        Url::parse(url).map_err(|e| Error::validation(format!("invalid database URL: {}", e)))?;
    if parsed.scheme() != "https" {
        return Err(Error::validation("database URL must use HTTPS"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, TenantService) {
        let dir = TempDir::new().unwrap();
        let registry =
            Arc::new(DuckDbRegistry::new(&dir.path().join("registry.duckdb")).unwrap());
        registry.ensure_schema().unwrap();
        let service = TenantService::new(registry);
        (dir, service)
    }

    #[test]
    fn test_add_and_get() {
        let (_dir, service) = setup();
        let tenant = service
            .add(
                "acme",
                "Acme Corp",
                Some("https://acme.example.co".to_string()),
                Some("key".to_string()),
                None,
            )
            .unwrap();
        assert!(tenant.is_configured());

        let loaded = service.get("acme").unwrap();
        assert_eq!(loaded.name, "Acme Corp");
        assert_eq!(loaded.applied_version, 0);
    }

    #[test]
    fn test_duplicate_slug_rejected() {
        let (_dir, service) = setup();
        service.add("acme", "Acme", None, None, None).unwrap();
        let result = service.add("acme", "Other", None, None, None);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_slug_validation() {
        let (_dir, service) = setup();
        for bad in ["", "Acme", "ac me", "-acme", "acme-", "a_b"] {
            assert!(
                matches!(service.add(bad, "x", None, None, None), Err(Error::Validation(_))),
                "accepted bad slug {:?}",
                bad
            );
        }
        assert!(service.add("acme-2", "x", None, None, None).is_ok());
    }

    #[test]
    fn test_database_url_must_be_https() {
        let (_dir, service) = setup();
        let result = service.add(
            "acme",
            "Acme",
            Some("http://acme.example.co".to_string()),
            None,
            None,
        );
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_set_connection_merges_fields() {
        let (_dir, service) = setup();
        service.add("acme", "Acme", None, None, None).unwrap();

        let tenant = service
            .set_connection(
                "acme",
                Some("https://acme.example.co".to_string()),
                Some("service".to_string()),
                None,
            )
            .unwrap();
        assert!(tenant.is_configured());

        // Updating just the anon key keeps the rest
        let tenant = service
            .set_connection("acme", None, None, Some("anon".to_string()))
            .unwrap();
        assert_eq!(tenant.database_url.as_deref(), Some("https://acme.example.co"));
        assert_eq!(tenant.service_key.as_deref(), Some("service"));
        assert_eq!(tenant.anon_key.as_deref(), Some("anon"));
    }

    #[test]
    fn test_remove_missing_tenant_is_not_found() {
        let (_dir, service) = setup();
        assert!(matches!(service.remove("ghost"), Err(Error::NotFound(_))));
    }
}
