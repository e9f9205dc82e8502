//! One invocation: locate, fetch, merge, validate, then render or export.

use crate::cli::CliError;
use crate::commands::{export, render};
use ccr_secrets::{EnvSecretSource, SecretMapping, SecretSource, merge, validate};
use ccr_template::{RenderMode, Renderer, RuntimeExtras, TemplateSpec};
use ccr_vault::{BindingLookup, ExplicitFields, SourceSelector, StoreClient, StoreSource, locate};
use std::path::PathBuf;

/// What to do with the resolved secrets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Render every template to its destination
    Render,
    /// Write `export NAME=VALUE` lines to the given file
    Export(PathBuf),
}

/// Settings for a single run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Where secrets come from
    pub selector: SourceSelector,
    /// Credential fields from flags or environment
    pub fields: ExplicitFields,
    /// Templates in command-line order
    pub templates: Vec<TemplateSpec>,
    /// Strict or lenient rendering
    pub render_mode: RenderMode,
    /// Accept null secrets
    pub allow_null: bool,
    /// Overlay referenced environment variables on store secrets
    pub merge_with_env: bool,
    /// Render or export
    pub output: OutputMode,
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Number of templates written
    Rendered(usize),
    /// Number of variables exported and the file they went to
    Exported {
        /// The environment file
        path: PathBuf,
        /// Variables written
        count: usize,
    },
}

async fn collect_secrets<C: StoreClient>(
    config: &PipelineConfig,
    client: C,
    lookup: &dyn BindingLookup,
) -> Result<SecretMapping, CliError> {
    let env_source = EnvSecretSource::new(config.templates.clone());

    let Some(credentials) = locate(config.selector, &config.fields, lookup)? else {
        if config.merge_with_env {
            tracing::debug!("--merge-with-env has no effect with --from-env");
        }
        let secrets = env_source.fetch().await?;
        tracing::info!(
            provider = env_source.provider_name(),
            count = secrets.len(),
            "Collected secrets"
        );
        return Ok(secrets);
    };

    let store = StoreSource::new(client, credentials);
    let primary = store.fetch().await?;

    if config.merge_with_env {
        let overlay = env_source.fetch().await?;
        tracing::debug!(
            store = primary.len(),
            env = overlay.len(),
            "Overlaying environment on store secrets"
        );
        Ok(merge(&primary, Some(&overlay)))
    } else {
        Ok(primary)
    }
}

/// Run one invocation.
///
/// Credential location happens before any fetch, so configuration problems
/// are reported without touching the store. Destinations are only written
/// once their template has rendered.
///
/// # Errors
///
/// Returns the first failure as a [`CliError`]; nothing further is attempted.
pub async fn run<C: StoreClient>(
    config: &PipelineConfig,
    client: C,
    lookup: &dyn BindingLookup,
    extras: &RuntimeExtras,
) -> Result<Outcome, CliError> {
    if config.output == OutputMode::Render && config.templates.is_empty() {
        return Err(CliError::config_with_help(
            "no templates to render",
            "Pass -t SOURCE:DESTINATION or use --vault-to-env",
        ));
    }

    let secrets = collect_secrets(config, client, lookup).await?;
    validate(&secrets, config.allow_null)?;

    match &config.output {
        OutputMode::Export(path) => {
            let count = export::write_env_file(path, &secrets)?;
            Ok(Outcome::Exported {
                path: path.clone(),
                count,
            })
        }
        OutputMode::Render => {
            let renderer = Renderer::new(config.render_mode, extras);
            let count = render::render_templates(&config.templates, &secrets, &renderer)?;
            Ok(Outcome::Rendered(count))
        }
    }
}
