//! HTTP schema executor
//!
//! Talks to a tenant database's auto-generated REST interface and invokes the
//! `exec_sql` RPC installed by the bootstrap script. A 404 on the RPC path is
//! the one signal that the entry point itself is absent; it maps to the typed
//! `CapabilityMissing` variant so the driver never inspects message text.

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value as JsonValue;
use url::Url;

use crate::domain::result::{Error, Result};
use crate::domain::Tenant;
use crate::ports::{ExecutorError, ExecutorFactory, SchemaExecutor};

/// Default request timeout for the RPC call
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP client for one tenant's exec_sql entry point
#[derive(Debug)]
pub struct HttpSchemaExecutor {
    client: Client,
    rpc_url: String,
    api_key: String,
}

impl HttpSchemaExecutor {
    /// Create an executor for a tenant database's REST base URL
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::validation(format!("Invalid database URL: {}", e)))?;

        if parsed.scheme() != "https" {
            return Err(Error::validation("Tenant database URL must use HTTPS"));
        }
        if api_key.is_empty() {
            return Err(Error::validation("Tenant API key must not be empty"));
        }

        let rpc_url = format!("{}/rest/v1/rpc/exec_sql", base_url.trim_end_matches('/'));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self {
            client,
            rpc_url,
            api_key: api_key.to_string(),
        })
    }
}

impl SchemaExecutor for HttpSchemaExecutor {
    fn execute(&self, sql: &str) -> std::result::Result<(), ExecutorError> {
        let response = self
            .client
            .post(&self.rpc_url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "sql_query": sql }))
            .send()
            .map_err(|e| ExecutorError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| ExecutorError::Transport(e.to_string()))?;

        classify_response(status, &body)
    }
}

/// Classify an exec_sql RPC response.
///
/// The RPC wraps errors in its own JSON envelope (`success`/`error`), so an
/// HTTP 200 can still mean the SQL failed. A 404 on the RPC path means the
/// function was never installed.
fn classify_response(status: u16, body: &str) -> std::result::Result<(), ExecutorError> {
    match status {
        404 => Err(ExecutorError::CapabilityMissing),
        200 => match serde_json::from_str::<JsonValue>(body) {
            Ok(JsonValue::Object(obj)) => {
                if obj.get("success").and_then(JsonValue::as_bool) == Some(false) {
                    let message = obj
                        .get("error")
                        .and_then(JsonValue::as_str)
                        .unwrap_or("unknown execution error");
                    Err(ExecutorError::Execution(message.to_string()))
                } else {
                    // Explicit success, or no clear envelope: some entry
                    // point paths return nothing on success
                    Ok(())
                }
            }
            _ => Ok(()),
        },
        _ => Err(ExecutorError::Execution(format!(
            "HTTP {}: {}",
            status,
            truncate(body, 500)
        ))),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Builds HTTP executors from tenant connection configuration
pub struct HttpExecutorFactory {
    timeout: Duration,
}

impl HttpExecutorFactory {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl Default for HttpExecutorFactory {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_SECS)
    }
}

impl ExecutorFactory for HttpExecutorFactory {
    fn for_tenant(&self, tenant: &Tenant) -> Result<Box<dyn SchemaExecutor>> {
        let base_url = tenant.database_url.as_deref().ok_or_else(|| {
            Error::not_configured(format!("{} has no database URL", tenant.slug))
        })?;
        let api_key = tenant
            .api_key()
            .ok_or_else(|| Error::not_configured(format!("{} has no API key", tenant.slug)))?;

        let executor = HttpSchemaExecutor::new(base_url, api_key, self.timeout)?;
        Ok(Box::new(executor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_rejects_non_https_url() {
        let result = HttpSchemaExecutor::new("http://acme.example.co", "key", Duration::from_secs(5));
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_rejects_empty_key() {
        let result = HttpSchemaExecutor::new("https://acme.example.co", "", Duration::from_secs(5));
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_rpc_url_trims_trailing_slash() {
        let executor =
            HttpSchemaExecutor::new("https://acme.example.co/", "key", Duration::from_secs(5))
                .unwrap();
        assert_eq!(executor.rpc_url, "https://acme.example.co/rest/v1/rpc/exec_sql");
    }

    #[test]
    fn test_classify_404_as_capability_missing() {
        let result = classify_response(404, r#"{"message":"function not found"}"#);
        assert!(matches!(result, Err(ExecutorError::CapabilityMissing)));
    }

    #[test]
    fn test_classify_envelope_success() {
        assert!(classify_response(200, r#"{"success":true,"message":"ok"}"#).is_ok());
    }

    #[test]
    fn test_classify_envelope_error() {
        let result =
            classify_response(200, r#"{"success":false,"error":"relation already exists"}"#);
        match result {
            Err(ExecutorError::Execution(msg)) => assert_eq!(msg, "relation already exists"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_classify_unclear_200_is_success() {
        // The RPC returns an empty body on some paths; treat as success
        assert!(classify_response(200, "").is_ok());
        assert!(classify_response(200, "[]").is_ok());
    }

    #[test]
    fn test_classify_other_status_as_execution_error() {
        let result = classify_response(500, "boom");
        match result {
            Err(ExecutorError::Execution(msg)) => assert!(msg.contains("HTTP 500")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_factory_requires_configuration() {
        let factory = HttpExecutorFactory::default();
        let tenant = Tenant::new(Uuid::new_v4(), "acme", "Acme Corp");
        assert!(matches!(
            factory.for_tenant(&tenant),
            Err(Error::NotConfigured(_))
        ));
    }
}
