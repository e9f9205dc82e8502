//! Secret source implementations
//!
//! This module provides the built-in source that requires no network access:
//!
//! - [`EnvSecretSource`] - Environment variables referenced by templates
//!
//! The Vault store source is provided by the `ccr-vault` crate.

mod env;

pub use env::EnvSecretSource;
