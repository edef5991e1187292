//! Tenant domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant: an isolated customer account with its own hosted Postgres database.
///
/// The connection fields mirror what the control plane stores per tenant: the
/// database's REST base URL plus a service key (preferred for DDL) and an anon
/// key fallback. `applied_version` is the highest catalog unit known to have
/// been applied to this tenant's database; 0 means reachable-but-unmigrated,
/// which is distinct from "no connection configured at all".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    /// Short unique identifier used on the command line (e.g. "acme")
    pub slug: String,
    pub name: String,
    pub database_url: Option<String>,
    pub service_key: Option<String>,
    pub anon_key: Option<String>,
    /// Highest catalog version successfully applied (0 = unmigrated)
    pub applied_version: u32,
    /// SHA-256 over the catalog bodies acknowledged by a manual mark-complete,
    /// if the operator ever took that path
    pub confirmed_digest: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// Create a new tenant with required fields
    pub fn new(id: Uuid, slug: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            slug: slug.into(),
            name: name.into(),
            database_url: None,
            service_key: None,
            anon_key: None,
            applied_version: 0,
            confirmed_digest: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this tenant has a usable database connection configured
    pub fn is_configured(&self) -> bool {
        self.database_url.is_some() && self.api_key().is_some()
    }

    /// The API key to use for DDL execution (service key preferred)
    pub fn api_key(&self) -> Option<&str> {
        self.service_key
            .as_deref()
            .or(self.anon_key.as_deref())
            .filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tenant_starts_unmigrated_and_unconfigured() {
        let tenant = Tenant::new(Uuid::new_v4(), "acme", "Acme Corp");
        assert_eq!(tenant.applied_version, 0);
        assert!(!tenant.is_configured());
        assert!(tenant.confirmed_digest.is_none());
    }

    #[test]
    fn test_service_key_preferred_over_anon_key() {
        let mut tenant = Tenant::new(Uuid::new_v4(), "acme", "Acme Corp");
        tenant.database_url = Some("https://acme.example.co".to_string());
        tenant.anon_key = Some("anon".to_string());
        assert_eq!(tenant.api_key(), Some("anon"));
        assert!(tenant.is_configured());

        tenant.service_key = Some("service".to_string());
        assert_eq!(tenant.api_key(), Some("service"));
    }

    #[test]
    fn test_empty_key_does_not_count_as_configured() {
        let mut tenant = Tenant::new(Uuid::new_v4(), "acme", "Acme Corp");
        tenant.database_url = Some("https://acme.example.co".to_string());
        tenant.service_key = Some(String::new());
        assert!(!tenant.is_configured());
    }
}
