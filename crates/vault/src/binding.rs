//! Brokered service binding lookup (Cloud Foundry `VCAP_SERVICES`)

use ccr_secrets::SecretError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Environment variable carrying the platform's service bindings
pub const VCAP_SERVICES: &str = "VCAP_SERVICES";

/// Service name the Vault broker registers under by default
pub const DEFAULT_SERVICE_NAME: &str = "hsdp-vault";

/// Which broker-created secret path to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingScope {
    /// Shared by every app in the org
    Org,
    /// Shared by every app in the space
    Space,
    /// Private to the bound service instance
    Service,
}

impl BindingScope {
    /// Credential key holding this scope's broker path
    #[must_use]
    pub const fn path_key(self) -> &'static str {
        match self {
            Self::Org => "org_secret_path",
            Self::Space => "space_secret_path",
            Self::Service => "service_secret_path",
        }
    }
}

impl std::fmt::Display for BindingScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Org => "org",
            Self::Space => "space",
            Self::Service => "service",
        };
        write!(f, "{s}")
    }
}

/// Credential bundle the broker places in the binding
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct BrokerCredentials {
    /// Vault address
    pub endpoint: Option<String>,
    /// AppRole role id
    pub role_id: Option<String>,
    /// AppRole secret id
    pub secret_id: Option<String>,
    /// Org-scoped broker path
    pub org_secret_path: Option<String>,
    /// Space-scoped broker path
    pub space_secret_path: Option<String>,
    /// Service-scoped broker path
    pub service_secret_path: Option<String>,
}

impl BrokerCredentials {
    /// Broker path for `scope`, if present
    #[must_use]
    pub fn secret_path(&self, scope: BindingScope) -> Option<&str> {
        match scope {
            BindingScope::Org => self.org_secret_path.as_deref(),
            BindingScope::Space => self.space_secret_path.as_deref(),
            BindingScope::Service => self.service_secret_path.as_deref(),
        }
    }
}

/// Capability that yields the broker credential bundle
pub trait BindingLookup {
    /// Credentials of the configured service
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::Config`] when binding data is unavailable,
    /// malformed, or lacks the service or its credentials.
    fn broker_credentials(&self) -> Result<BrokerCredentials, SecretError>;
}

#[derive(Debug, Deserialize)]
struct ServiceInstance {
    #[serde(default)]
    credentials: Option<BrokerCredentials>,
}

/// Binding data in the `VCAP_SERVICES` JSON format.
#[derive(Debug, Clone)]
pub struct VcapServices {
    raw: Option<String>,
    service_name: String,
}

impl VcapServices {
    /// Use literal binding JSON (`None` means no binding data)
    #[must_use]
    pub fn new(raw: Option<String>, service_name: impl Into<String>) -> Self {
        Self {
            raw,
            service_name: service_name.into(),
        }
    }

    /// Read binding JSON from the `VCAP_SERVICES` environment variable
    #[must_use]
    pub fn from_env(service_name: impl Into<String>) -> Self {
        Self::new(std::env::var(VCAP_SERVICES).ok(), service_name)
    }

    /// The service whose credentials are looked up
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl BindingLookup for VcapServices {
    fn broker_credentials(&self) -> Result<BrokerCredentials, SecretError> {
        let raw = self.raw.as_deref().ok_or_else(|| {
            SecretError::config(format!("binding unavailable: {VCAP_SERVICES} does not exist"))
        })?;

        let mut services: HashMap<String, Value> = serde_json::from_str(raw).map_err(|e| {
            SecretError::config(format!(
                "binding unavailable: {VCAP_SERVICES} is not valid JSON: {e}"
            ))
        })?;

        let instances = services.remove(&self.service_name).ok_or_else(|| {
            SecretError::config(format!(
                "service instance missing: '{}' is not bound to this application",
                self.service_name
            ))
        })?;

        let instances: Vec<ServiceInstance> = serde_json::from_value(instances).map_err(|e| {
            SecretError::config(format!(
                "binding unavailable: malformed '{}' binding: {e}",
                self.service_name
            ))
        })?;

        let credentials = instances
            .into_iter()
            .find_map(|instance| instance.credentials)
            .ok_or_else(|| {
                SecretError::config(format!(
                    "credentials missing in binding for '{}'",
                    self.service_name
                ))
            })?;

        tracing::debug!(service = %self.service_name, "Loaded broker credentials from binding");
        Ok(credentials)
    }
}
