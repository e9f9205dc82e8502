//! Vault-backed secret source

use crate::StoreCredentials;
use async_trait::async_trait;
use ccr_secrets::{SecretError, SecretMapping, SecretSource};
use serde_json::Value;
use vaultrs::client::{Client, VaultClient, VaultClientSettingsBuilder};

/// Default mount of the AppRole auth method
pub const DEFAULT_APPROLE_MOUNT: &str = "approle";

/// Reads the raw payload at a store path.
///
/// This is the seam to the network client; the pipeline only ever sees the
/// returned JSON value.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Authenticate with `credentials` and read `credentials.path`
    async fn read(&self, credentials: &StoreCredentials) -> Result<Value, SecretError>;
}

/// [`StoreClient`] that talks to Vault over HTTP using AppRole auth.
#[derive(Debug, Clone)]
pub struct VaultHttpClient {
    approle_mount: String,
}

impl Default for VaultHttpClient {
    fn default() -> Self {
        Self::new(DEFAULT_APPROLE_MOUNT)
    }
}

impl VaultHttpClient {
    /// Create a client that logs in through the AppRole method at `approle_mount`
    #[must_use]
    pub fn new(approle_mount: impl Into<String>) -> Self {
        Self {
            approle_mount: approle_mount.into(),
        }
    }
}

/// Split `secret/app/config` into the mount (`secret`) and the key path (`app/config`).
fn split_mount(path: &str) -> Result<(&str, &str), SecretError> {
    let trimmed = path.trim_matches('/');
    match trimmed.split_once('/') {
        Some((mount, rest)) if !mount.is_empty() && !rest.is_empty() => Ok((mount, rest)),
        _ => Err(SecretError::store(format!(
            "invalid secret path '{path}': expected '<mount>/<path>'"
        ))),
    }
}

#[async_trait]
impl StoreClient for VaultHttpClient {
    async fn read(&self, credentials: &StoreCredentials) -> Result<Value, SecretError> {
        let (mount, path) = split_mount(&credentials.path)?;

        let settings = VaultClientSettingsBuilder::default()
            .address(&credentials.url)
            .build()
            .map_err(|e| SecretError::store(format!("Failed to build Vault client: {e}")))?;
        let mut client = VaultClient::new(settings)
            .map_err(|e| SecretError::store(format!("Failed to create Vault client: {e}")))?;

        let auth = vaultrs::auth::approle::login(
            &client,
            &self.approle_mount,
            credentials.role_id(),
            credentials.secret_id(),
        )
        .await
        .map_err(|e| SecretError::store(format!("AppRole login failed: {e}")))?;
        client.set_token(&auth.client_token);
        tracing::debug!(url = %credentials.url, "Authenticated to Vault");

        vaultrs::kv1::get::<Value>(&client, mount, path)
            .await
            .map_err(|e| SecretError::store(format!("Vault read error at '{}': {e}", credentials.path)))
    }
}

/// Convert a store payload into a secret mapping.
///
/// The payload must be a flat JSON object. Strings are kept verbatim,
/// numbers and booleans become their JSON text and `null` becomes a null
/// secret.
///
/// # Errors
///
/// Returns [`SecretError::Store`] if the payload is not an object or holds
/// nested arrays or objects.
pub fn mapping_from_payload(payload: Value) -> Result<SecretMapping, SecretError> {
    let Value::Object(entries) = payload else {
        return Err(SecretError::store("not a key/value object"));
    };

    entries
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                Value::Null => None,
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                Value::Array(_) | Value::Object(_) => {
                    return Err(SecretError::store(format!(
                        "not a key/value object: '{name}' holds a nested value"
                    )));
                }
            };
            Ok((name, value))
        })
        .collect()
}

/// Secret source backed by a Vault-compatible store.
#[derive(Debug)]
pub struct StoreSource<C> {
    client: C,
    credentials: StoreCredentials,
}

impl<C: StoreClient> StoreSource<C> {
    /// Create a source reading `credentials.path` through `client`
    #[must_use]
    pub const fn new(client: C, credentials: StoreCredentials) -> Self {
        Self {
            client,
            credentials,
        }
    }
}

#[async_trait]
impl<C: StoreClient> SecretSource for StoreSource<C> {
    fn provider_name(&self) -> &'static str {
        "vault"
    }

    async fn fetch(&self) -> Result<SecretMapping, SecretError> {
        let payload = self.client.read(&self.credentials).await?;
        let secrets = mapping_from_payload(payload)?;
        tracing::info!(
            path = %self.credentials.path,
            count = secrets.len(),
            "Fetched secrets from store"
        );
        Ok(secrets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct StaticClient(Value);

    #[async_trait]
    impl StoreClient for StaticClient {
        async fn read(&self, _credentials: &StoreCredentials) -> Result<Value, SecretError> {
            Ok(self.0.clone())
        }
    }

    struct FailingClient;

    #[async_trait]
    impl StoreClient for FailingClient {
        async fn read(&self, _credentials: &StoreCredentials) -> Result<Value, SecretError> {
            Err(SecretError::store("permission denied"))
        }
    }

    fn creds() -> StoreCredentials {
        StoreCredentials::new("https://vault", "secret/app", "role", "secret")
    }

    #[test]
    fn test_payload_scalars() {
        let secrets = mapping_from_payload(json!({
            "DB_USER": "admin",
            "DB_PORT": 5432,
            "DEBUG": false,
            "OPTIONAL": null
        }))
        .unwrap();

        assert_eq!(secrets.get("DB_USER"), Some(Some("admin")));
        assert_eq!(secrets.get("DB_PORT"), Some(Some("5432")));
        assert_eq!(secrets.get("DEBUG"), Some(Some("false")));
        assert_eq!(secrets.get("OPTIONAL"), Some(None));
    }

    #[test]
    fn test_payload_keeps_key_order() {
        let secrets = mapping_from_payload(json!({"B": "2", "A": "1"})).unwrap();
        assert_eq!(secrets.names().collect::<Vec<_>>(), vec!["B", "A"]);
    }

    #[test]
    fn test_payload_must_be_object() {
        for payload in [json!(["a", "b"]), json!("text"), json!(null), json!(42)] {
            let err = mapping_from_payload(payload).unwrap_err();
            assert!(err.to_string().contains("not a key/value object"));
        }
    }

    #[test]
    fn test_payload_rejects_nested_values() {
        let err = mapping_from_payload(json!({"db": {"host": "x"}})).unwrap_err();
        assert!(matches!(err, SecretError::Store { .. }));
    }

    #[test]
    fn test_split_mount() {
        assert_eq!(split_mount("secret/app/config").unwrap(), ("secret", "app/config"));
        assert_eq!(split_mount("/secret/app/").unwrap(), ("secret", "app"));
        assert!(split_mount("secret").is_err());
        assert!(split_mount("").is_err());
    }

    #[tokio::test]
    async fn test_store_source_fetch() {
        let source = StoreSource::new(StaticClient(json!({"API_KEY": "abc"})), creds());
        let secrets = source.fetch().await.unwrap();
        assert_eq!(secrets.get("API_KEY"), Some(Some("abc")));
        assert_eq!(source.provider_name(), "vault");
    }

    #[tokio::test]
    async fn test_store_source_propagates_client_error() {
        let source = StoreSource::new(FailingClient, creds());
        let err = source.fetch().await.unwrap_err();
        assert!(err.to_string().contains("permission denied"));
    }

    fn envelope(data: Value, auth: Value) -> Value {
        json!({
            "request_id": "6c1d8a0e-0000-0000-0000-000000000000",
            "lease_id": "",
            "renewable": false,
            "lease_duration": 0,
            "data": data,
            "wrap_info": null,
            "warnings": null,
            "auth": auth
        })
    }

    async fn mock_login(server: &MockServer, mount: &str) {
        let auth = json!({
            "client_token": "s.test-token",
            "accessor": "acc",
            "policies": ["default"],
            "token_policies": ["default"],
            "metadata": {"role_name": "app"},
            "lease_duration": 1200,
            "renewable": true,
            "entity_id": "ent",
            "token_type": "service",
            "orphan": true
        });
        Mock::given(method("POST"))
            .and(path(format!("/v1/auth/{mount}/login")))
            .and(body_partial_json(json!({"role_id": "role", "secret_id": "secret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(Value::Null, auth)))
            .expect(1)
            .mount(server)
            .await;
    }

    fn server_creds(server: &MockServer, secret_path: &str) -> StoreCredentials {
        StoreCredentials::new(server.uri(), secret_path, "role", "secret")
    }

    #[tokio::test]
    async fn test_vault_client_reads_with_login_token() {
        let server = MockServer::start().await;
        mock_login(&server, DEFAULT_APPROLE_MOUNT).await;
        Mock::given(method("GET"))
            .and(path("/v1/secret/myapp"))
            .and(header("X-Vault-Token", "s.test-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(envelope(json!({"B": "2", "A": "1"}), Value::Null)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let source = StoreSource::new(VaultHttpClient::default(), server_creds(&server, "secret/myapp"));
        let secrets = source.fetch().await.unwrap();

        assert_eq!(secrets.names().collect::<Vec<_>>(), vec!["B", "A"]);
        assert_eq!(secrets.get("A"), Some(Some("1")));
        assert_eq!(secrets.get("B"), Some(Some("2")));
    }

    #[tokio::test]
    async fn test_vault_client_uses_custom_approle_mount() {
        let server = MockServer::start().await;
        mock_login(&server, "ci-approle").await;
        Mock::given(method("GET"))
            .and(path("/v1/kv/team/app"))
            .and(header("X-Vault-Token", "s.test-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(envelope(json!({"K": "v"}), Value::Null)),
            )
            .mount(&server)
            .await;

        let payload = VaultHttpClient::new("ci-approle")
            .read(&server_creds(&server, "kv/team/app"))
            .await
            .unwrap();
        assert_eq!(payload, json!({"K": "v"}));
    }

    #[tokio::test]
    async fn test_vault_client_login_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/approle/login"))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(json!({"errors": ["permission denied"]})),
            )
            .mount(&server)
            .await;

        let err = VaultHttpClient::default()
            .read(&server_creds(&server, "secret/myapp"))
            .await
            .unwrap_err();
        assert!(matches!(err, SecretError::Store { .. }));
        assert!(err.to_string().contains("AppRole login failed"));
    }

    #[tokio::test]
    async fn test_vault_client_read_denied() {
        let server = MockServer::start().await;
        mock_login(&server, DEFAULT_APPROLE_MOUNT).await;
        Mock::given(method("GET"))
            .and(path("/v1/secret/other"))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(json!({"errors": ["permission denied"]})),
            )
            .mount(&server)
            .await;

        let err = VaultHttpClient::default()
            .read(&server_creds(&server, "secret/other"))
            .await
            .unwrap_err();
        assert!(matches!(err, SecretError::Store { .. }));
        assert!(err.to_string().contains("secret/other"));
    }

    #[tokio::test]
    async fn test_vault_client_rejects_bad_path_before_network() {
        let client = VaultHttpClient::default();
        let bad = StoreCredentials::new("http://127.0.0.1:1", "nomount", "r", "s");
        let err = client.read(&bad).await.unwrap_err();
        assert!(err.to_string().contains("invalid secret path"));
    }
}
