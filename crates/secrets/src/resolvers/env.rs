//! Environment variable secret source

use crate::{SecretError, SecretMapping, SecretSource};
use async_trait::async_trait;
use ccr_template::{TemplateSpec, discover};
use std::collections::BTreeSet;

/// Collects secrets from environment variables.
///
/// Each template's source file is inspected for the variables it references;
/// every referenced name that is set in the process environment is included.
/// Names that are not set are left out, so a strict render reports them later
/// and a lenient render leaves them blank.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretSource {
    templates: Vec<TemplateSpec>,
}

impl EnvSecretSource {
    /// Create a source for the given templates
    #[must_use]
    pub fn new(templates: Vec<TemplateSpec>) -> Self {
        Self { templates }
    }

    /// Variable names referenced across all templates, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::Io`] if a template source cannot be read and
    /// [`SecretError::Template`] if it cannot be parsed.
    pub fn referenced_names(&self) -> Result<BTreeSet<String>, SecretError> {
        let mut names = BTreeSet::new();
        for template in &self.templates {
            let text =
                std::fs::read_to_string(&template.source).map_err(|source| SecretError::Io {
                    path: template.source.clone(),
                    source,
                })?;
            let found = discover(&text)?;
            tracing::debug!(
                template = %template.source.display(),
                variables = found.len(),
                "Discovered template variables"
            );
            names.extend(found);
        }
        Ok(names)
    }

    /// Collect the referenced variables that are set in the environment.
    ///
    /// # Errors
    ///
    /// See [`referenced_names`](Self::referenced_names).
    pub fn collect(&self) -> Result<SecretMapping, SecretError> {
        let mut secrets = SecretMapping::new();
        for name in self.referenced_names()? {
            match std::env::var(&name) {
                Ok(value) => secrets.insert(name, Some(value)),
                Err(_) => tracing::debug!(variable = %name, "Referenced variable not set in environment"),
            }
        }
        Ok(secrets)
    }
}

#[async_trait]
impl SecretSource for EnvSecretSource {
    fn provider_name(&self) -> &'static str {
        "env"
    }

    async fn fetch(&self) -> Result<SecretMapping, SecretError> {
        self.collect()
    }
}
