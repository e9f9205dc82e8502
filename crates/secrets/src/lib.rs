//! Secret resolution for ccr
//!
//! Provides the [`SecretMapping`] that flows through the pipeline, the
//! [`SecretSource`] trait implemented by every provider, and the
//! [`merge`] / [`validate`] steps applied before rendering.
//!
//! Built-in sources:
//! - [`EnvSecretSource`] - process environment, filtered to the variables templates reference
//!
//! The Vault-backed source lives in the `ccr-vault` crate.

mod mapping;
pub mod resolvers;

pub use mapping::{SecretMapping, merge, validate};
pub use resolvers::EnvSecretSource;

use async_trait::async_trait;
use ccr_template::TemplateError;
use std::path::PathBuf;
use thiserror::Error;

/// Error types for secret resolution
#[derive(Debug, Error)]
pub enum SecretError {
    /// Invalid or incomplete invocation configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong
        message: String,
    },

    /// A file needed to collect secrets could not be read
    #[error("Could not open file {}: {source}", path.display())]
    Io {
        /// The file that failed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The secret store was unreachable, rejected us, or returned bad data
    #[error("Secret store error: {message}")]
    Store {
        /// Client or payload message
        message: String,
    },

    /// Secrets with null values where nulls are not allowed
    #[error("The following variables have null values: {}", names.join(","))]
    Validation {
        /// Every offending name, in mapping order
        names: Vec<String>,
    },

    /// A template could not be inspected
    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl SecretError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a store error
    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}

/// A provider of a `name -> value` secret mapping.
///
/// Implementors:
/// - [`EnvSecretSource`] - process environment
/// - `ccr_vault::StoreSource` - a Vault-compatible store
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Short provider identifier used in logs, e.g. `"env"` or `"vault"`
    fn provider_name(&self) -> &'static str;

    /// Fetch every secret this source provides
    async fn fetch(&self) -> Result<SecretMapping, SecretError>;
}
