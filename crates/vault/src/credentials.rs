//! Vault access credentials

use secrecy::{ExposeSecret, SecretString};

/// Everything needed to query the store: endpoint, secret path and AppRole
/// credentials. All four are always present together.
#[derive(Clone)]
pub struct StoreCredentials {
    /// Vault address, e.g. `https://vault.example.com`
    pub url: String,
    /// Logical secret path, e.g. `secret/myapp/config`
    pub path: String,
    role_id: SecretString,
    secret_id: SecretString,
}

impl StoreCredentials {
    /// Create a complete set of credentials
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        path: impl Into<String>,
        role_id: impl Into<String>,
        secret_id: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            path: path.into(),
            role_id: SecretString::from(role_id.into()),
            secret_id: SecretString::from(secret_id.into()),
        }
    }

    /// AppRole role id
    #[must_use]
    pub fn role_id(&self) -> &str {
        self.role_id.expose_secret()
    }

    /// AppRole secret id
    #[must_use]
    pub fn secret_id(&self) -> &str {
        self.secret_id.expose_secret()
    }
}

impl std::fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("url", &self.url)
            .field("path", &self.path)
            .field("role_id", &"[REDACTED]")
            .field("secret_id", &"[REDACTED]")
            .finish()
    }
}
