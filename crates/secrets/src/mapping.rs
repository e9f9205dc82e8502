//! Secret mappings, precedence merging and null validation

use crate::SecretError;
use indexmap::IndexMap;

/// Secret name -> value, in insertion order.
///
/// A `None` value is a secret that exists but is null. `Debug` output never
/// shows values.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretMapping {
    values: IndexMap<String, Option<String>>,
}

impl SecretMapping {
    /// Create an empty mapping
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a secret. Replacing keeps the original position.
    pub fn insert(&mut self, name: impl Into<String>, value: Option<String>) {
        self.values.insert(name.into(), value);
    }

    /// Look up a secret: `None` if absent, `Some(None)` if present but null
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.values.get(name).map(Option::as_deref)
    }

    /// Check whether a secret name is present
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of secrets
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no secrets
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Secret names in mapping order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// `(name, value)` pairs in mapping order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    /// Names whose value is null, in mapping order
    #[must_use]
    pub fn null_names(&self) -> Vec<String> {
        self.values
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl std::fmt::Debug for SecretMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.values.iter().map(|(name, value)| {
                (name, if value.is_some() { "[REDACTED]" } else { "null" })
            }))
            .finish()
    }
}

impl FromIterator<(String, Option<String>)> for SecretMapping {
    fn from_iter<T: IntoIterator<Item = (String, Option<String>)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl From<IndexMap<String, Option<String>>> for SecretMapping {
    fn from(values: IndexMap<String, Option<String>>) -> Self {
        Self { values }
    }
}

/// Combine `primary` with an optional `overlay`.
///
/// Overlay entries win on key collision; everything else is a union. The
/// result is a new mapping and both inputs are left untouched.
#[must_use]
pub fn merge(primary: &SecretMapping, overlay: Option<&SecretMapping>) -> SecretMapping {
    let mut merged = primary.clone();
    if let Some(overlay) = overlay {
        for (name, value) in &overlay.values {
            merged.values.insert(name.clone(), value.clone());
        }
        tracing::debug!(
            primary = primary.len(),
            overlay = overlay.len(),
            merged = merged.len(),
            "Merged secret overlay"
        );
    }
    merged
}

/// Reject null values unless `allow_null` is set.
///
/// # Errors
///
/// Returns a single [`SecretError::Validation`] naming every null secret.
pub fn validate(mapping: &SecretMapping, allow_null: bool) -> Result<(), SecretError> {
    if allow_null {
        return Ok(());
    }
    let names = mapping.null_names();
    if names.is_empty() {
        Ok(())
    } else {
        Err(SecretError::Validation { names })
    }
}
