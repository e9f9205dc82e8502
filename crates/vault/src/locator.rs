//! Credential location: which store to query and with what

use crate::{BindingLookup, BindingScope, StoreCredentials};
use ccr_secrets::SecretError;

/// Where secrets come from. Exactly one per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSelector {
    /// Raw process environment, no store query
    EnvOnly,
    /// A store endpoint with explicitly supplied credentials
    DirectEndpoint,
    /// A store reached through a platform service binding
    BrokeredBinding(BindingScope),
}

/// Credential fields supplied by the caller (flags or environment).
///
/// For [`SourceSelector::BrokeredBinding`] only `path` is used, as a suffix
/// to the broker path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplicitFields {
    /// Store address (`--endpoint`)
    pub url: Option<String>,
    /// Secret path, or path suffix for brokered bindings (`--path`)
    pub path: Option<String>,
    /// AppRole role id (`--role-id`)
    pub role_id: Option<String>,
    /// AppRole secret id (`--secret-id`)
    pub secret_id: Option<String>,
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, SecretError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SecretError::config(format!("missing credential field: {field}")))
}

/// Compute the store path for a brokered binding.
///
/// `broker_path` and `suffix` are joined with `/`, then the first two
/// `/`-separated segments are dropped. Broker paths carry a fixed two-level
/// prefix (e.g. `/v1/...`) that is not part of the logical secret path.
#[must_use]
pub fn broker_store_path(broker_path: &str, suffix: &str) -> String {
    let joined = format!("{broker_path}/{suffix}");
    joined.split('/').skip(2).collect::<Vec<_>>().join("/")
}

/// Resolve the store credentials for `selector`.
///
/// Returns `Ok(None)` when no store query is needed.
///
/// # Errors
///
/// Returns [`SecretError::Config`] if a required field is missing or the
/// binding lookup fails.
pub fn locate(
    selector: SourceSelector,
    fields: &ExplicitFields,
    lookup: &dyn BindingLookup,
) -> Result<Option<StoreCredentials>, SecretError> {
    match selector {
        SourceSelector::EnvOnly => Ok(None),
        SourceSelector::DirectEndpoint => {
            let url = required(fields.url.as_deref(), "--endpoint")?;
            let role_id = required(fields.role_id.as_deref(), "--role-id")?;
            let secret_id = required(fields.secret_id.as_deref(), "--secret-id")?;
            let path = required(fields.path.as_deref(), "--path")?;

            tracing::debug!(url = %url, path = %path, "Using explicit store endpoint");
            Ok(Some(StoreCredentials::new(url, path, role_id, secret_id)))
        }
        SourceSelector::BrokeredBinding(scope) => {
            let suffix = required(fields.path.as_deref(), "--path")?;
            let broker = lookup.broker_credentials()?;

            let url = required(broker.endpoint.as_deref(), "endpoint")?;
            let role_id = required(broker.role_id.as_deref(), "role_id")?;
            let secret_id = required(broker.secret_id.as_deref(), "secret_id")?;
            let broker_path = required(broker.secret_path(scope), scope.path_key())?;

            let path = broker_store_path(broker_path, suffix);
            tracing::debug!(scope = %scope, url = %url, path = %path, "Located store via service binding");
            Ok(Some(StoreCredentials::new(url, path, role_id, secret_id)))
        }
    }
}
