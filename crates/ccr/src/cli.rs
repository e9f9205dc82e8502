use crate::pipeline::{OutputMode, PipelineConfig};
use crate::tracing::{LogLevel, TracingFormat};
use ccr_secrets::SecretError;
use ccr_template::{RenderMode, TemplateError, TemplateSpec};
use ccr_vault::{
    BindingScope, DEFAULT_APPROLE_MOUNT, DEFAULT_SERVICE_NAME, ExplicitFields, SourceSelector,
};
use clap::{Args, Parser, ValueEnum};
use miette::{Diagnostic, Report};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// CLI or configuration error exit code
pub const EXIT_CLI: i32 = 2;
/// Runtime error exit code (store, file, validation or render failures)
pub const EXIT_RUNTIME: i32 = 3;

/// Where the environment file is written by default
pub const DEFAULT_OUT_FILE: &str = "/dev/shm/environment";

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// Invalid or incomplete invocation (exit code 2)
    #[error("Configuration error: {message}")]
    #[diagnostic(code(ccr::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// A template or output file could not be read or written (exit code 3)
    #[error("{message}")]
    #[diagnostic(code(ccr::cli::io))]
    Io {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// The secret store failed (exit code 3)
    #[error("Secret store error: {message}")]
    #[diagnostic(code(ccr::cli::store))]
    Store {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Null secrets were found and not allowed (exit code 3)
    #[error("{message}")]
    #[diagnostic(code(ccr::cli::validation))]
    Validation {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// A template failed to render (exit code 3)
    #[error("{message}")]
    #[diagnostic(code(ccr::cli::render))]
    Render {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new I/O error with help text
    #[must_use]
    pub fn io_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new render error
    #[must_use]
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
            help: None,
        }
    }
}

impl From<SecretError> for CliError {
    fn from(err: SecretError) -> Self {
        match err {
            SecretError::Config { message } => Self::config(message),
            SecretError::Io { path, source } => Self::io_with_help(
                format!("Could not open file {}: {source}", path.display()),
                "Check file permissions and ensure the path exists",
            ),
            SecretError::Store { message } => Self::Store {
                message,
                help: Some("Check the store address, AppRole credentials and secret path".into()),
            },
            SecretError::Validation { .. } => Self::Validation {
                message: err.to_string(),
                help: Some("Give these secrets a value or pass --allow-null".into()),
            },
            SecretError::Template(err) => err.into(),
        }
    }
}

impl From<TemplateError> for CliError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::InvalidSpec { .. } => {
                Self::config_with_help(err.to_string(), "Use -t SOURCE:DESTINATION")
            }
            TemplateError::Undefined { .. } => Self::Render {
                message: err.to_string(),
                help: Some(
                    "Provide a value for this variable or pass --allow-undefined".into(),
                ),
            },
            TemplateError::Syntax { .. } | TemplateError::Render { .. } => {
                Self::render(err.to_string())
            }
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Io { .. }
        | CliError::Store { .. }
        | CliError::Validation { .. }
        | CliError::Render { .. } => EXIT_RUNTIME,
    }
}

/// Print the error as a human-friendly diagnostic on stderr
#[allow(clippy::print_stderr)]
pub fn render_error(err: &CliError) {
    let report = Report::new(err.clone());
    eprintln!("{report:?}");
    let _ = io::stderr().flush();
}

/// Binding scope selectable with `--vcap`
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum VcapScope {
    /// Org-wide secret path
    Org,
    /// Space-wide secret path
    Space,
    /// Service-instance secret path
    Service,
}

impl From<VcapScope> for BindingScope {
    fn from(scope: VcapScope) -> Self {
        match scope {
            VcapScope::Org => Self::Org,
            VcapScope::Space => Self::Space,
            VcapScope::Service => Self::Service,
        }
    }
}

/// Secret source selection; exactly one is required
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// Read secrets from the process environment only
    #[arg(long)]
    pub from_env: bool,

    /// Locate Vault through the Cloud Foundry service binding
    #[arg(long, value_enum, value_name = "SCOPE")]
    pub vcap: Option<VcapScope>,

    /// Vault address; requires --role-id, --secret-id and --path
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,
}

impl SourceArgs {
    /// The selected source
    #[must_use]
    pub fn selector(&self) -> SourceSelector {
        if let Some(scope) = self.vcap {
            SourceSelector::BrokeredBinding(scope.into())
        } else if self.endpoint.is_some() {
            SourceSelector::DirectEndpoint
        } else {
            SourceSelector::EnvOnly
        }
    }
}

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "ccr")]
#[command(about = "Render configuration files from Vault or environment secrets")]
#[command(version)]
pub struct Cli {
    /// Secret source selection
    #[command(flatten)]
    pub source: SourceArgs,

    #[arg(long, env = "CCR_ROLE_ID", hide_env_values = true, help = "AppRole role id")]
    pub role_id: Option<String>,

    #[arg(long, env = "CCR_SECRET_ID", hide_env_values = true, help = "AppRole secret id")]
    pub secret_id: Option<String>,

    #[arg(
        long,
        env = "CCR_PATH",
        help = "Secret path as <mount>/<path> (e.g. secret/myapp), or path suffix when used with --vcap"
    )]
    pub path: Option<String>,

    #[arg(
        short = 't',
        long = "template",
        value_name = "SOURCE:DEST",
        help = "Template to render; may be repeated"
    )]
    pub templates: Vec<TemplateSpec>,

    #[arg(long, help = "Render undefined variables as empty instead of failing")]
    pub allow_undefined: bool,

    #[arg(long, help = "Accept secrets whose value is null")]
    pub allow_null: bool,

    #[arg(
        long,
        help = "Overlay environment variables referenced by templates on top of Vault secrets"
    )]
    pub merge_with_env: bool,

    #[arg(long, help = "Write secrets as shell exports instead of rendering templates")]
    pub vault_to_env: bool,

    #[arg(
        long,
        env = "CCR_OUT_FILE",
        default_value = DEFAULT_OUT_FILE,
        help = "Destination of --vault-to-env"
    )]
    pub out_file: PathBuf,

    #[arg(
        long,
        env = "CCR_SERVICE_NAME",
        default_value = DEFAULT_SERVICE_NAME,
        help = "Name of the Vault service in VCAP_SERVICES"
    )]
    pub service_name: String,

    #[arg(
        long,
        env = "CCR_APPROLE_MOUNT",
        default_value = DEFAULT_APPROLE_MOUNT,
        help = "Mount of the AppRole auth method"
    )]
    pub approle_mount: String,

    #[arg(
        short = 'L',
        long,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    #[arg(
        long = "log-format",
        help = "Log output format",
        default_value = "pretty",
        value_enum
    )]
    pub log_format: TracingFormat,
}

impl Cli {
    /// Assemble the pipeline settings from parsed flags
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        let output = if self.vault_to_env {
            OutputMode::Export(self.out_file.clone())
        } else {
            OutputMode::Render
        };

        PipelineConfig {
            selector: self.source.selector(),
            fields: ExplicitFields {
                url: self.source.endpoint.clone(),
                path: self.path.clone(),
                role_id: self.role_id.clone(),
                secret_id: self.secret_id.clone(),
            },
            templates: self.templates.clone(),
            render_mode: RenderMode::from_allow_undefined(self.allow_undefined),
            allow_null: self.allow_null,
            merge_with_env: self.merge_with_env,
            output,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("ccr").chain(args.iter().copied()))
    }

    #[test]
    fn test_from_env_with_templates() {
        let cli = parse(&["--from-env", "-t", "in.j2:out.cfg", "-t", "a:b"]).unwrap();
        let config = cli.pipeline_config();

        assert_eq!(config.selector, SourceSelector::EnvOnly);
        assert_eq!(
            config.templates,
            vec![TemplateSpec::new("in.j2", "out.cfg"), TemplateSpec::new("a", "b")]
        );
        assert_eq!(config.render_mode, RenderMode::Strict);
        assert_eq!(config.output, OutputMode::Render);
    }

    #[test]
    fn test_source_is_required() {
        let err = parse(&["-t", "a:b"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_sources_are_exclusive() {
        let err = parse(&["--from-env", "--endpoint", "https://vault"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);

        let err = parse(&["--vcap", "org", "--from-env"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_vcap_scope() {
        let cli = parse(&["--vcap", "space", "--path", "app"]).unwrap();
        assert_eq!(
            cli.pipeline_config().selector,
            SourceSelector::BrokeredBinding(BindingScope::Space)
        );
        assert!(parse(&["--vcap", "galaxy"]).is_err());
    }

    #[test]
    fn test_direct_endpoint_fields() {
        temp_env::with_vars_unset(["CCR_ROLE_ID", "CCR_SECRET_ID", "CCR_PATH"], || {
            let cli = parse(&[
                "--endpoint",
                "https://vault.local",
                "--role-id",
                "r",
                "--secret-id",
                "s",
                "--path",
                "secret/app",
            ])
            .unwrap();
            let config = cli.pipeline_config();
            assert_eq!(config.selector, SourceSelector::DirectEndpoint);
            assert_eq!(config.fields.url.as_deref(), Some("https://vault.local"));
            assert_eq!(config.fields.path.as_deref(), Some("secret/app"));
        });
    }

    #[test]
    fn test_path_help_names_mount_layout() {
        use clap::CommandFactory;
        let help = Cli::command().render_help().to_string();
        assert!(help.contains("<mount>/<path>"));
    }

    #[test]
    fn test_credentials_from_environment() {
        temp_env::with_vars(
            [
                ("CCR_ROLE_ID", Some("env-role")),
                ("CCR_SECRET_ID", Some("env-secret")),
                ("CCR_PATH", Some("secret/env")),
            ],
            || {
                let cli = parse(&["--endpoint", "https://vault"]).unwrap();
                let fields = cli.pipeline_config().fields;
                assert_eq!(fields.role_id.as_deref(), Some("env-role"));
                assert_eq!(fields.secret_id.as_deref(), Some("env-secret"));
                assert_eq!(fields.path.as_deref(), Some("secret/env"));
            },
        );
    }

    #[test]
    fn test_vault_to_env_output() {
        temp_env::with_var_unset("CCR_OUT_FILE", || {
            let cli = parse(&["--from-env", "--vault-to-env"]).unwrap();
            assert_eq!(
                cli.pipeline_config().output,
                OutputMode::Export(PathBuf::from(DEFAULT_OUT_FILE))
            );

            let cli = parse(&["--from-env", "--vault-to-env", "--out-file", "/tmp/env"]).unwrap();
            assert_eq!(
                cli.pipeline_config().output,
                OutputMode::Export(PathBuf::from("/tmp/env"))
            );
        });
    }

    #[test]
    fn test_flags() {
        let cli = parse(&["--from-env", "--allow-undefined", "--allow-null", "--merge-with-env"])
            .unwrap();
        let config = cli.pipeline_config();
        assert_eq!(config.render_mode, RenderMode::Lenient);
        assert!(config.allow_null);
        assert!(config.merge_with_env);
    }

    #[test]
    fn test_malformed_template_reference() {
        assert!(parse(&["--from-env", "-t", "no-destination"]).is_err());
        assert!(parse(&["--from-env", "-t", "a:b:c"]).is_err());
    }

    #[test]
    fn test_defaults() {
        temp_env::with_vars_unset(["CCR_SERVICE_NAME", "CCR_APPROLE_MOUNT"], || {
            let cli = parse(&["--from-env"]).unwrap();
            assert_eq!(cli.service_name, "hsdp-vault");
            assert_eq!(cli.approle_mount, "approle");
            assert_eq!(cli.level, LogLevel::Warn);
            assert_eq!(cli.log_format, TracingFormat::Pretty);
        });
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(EXIT_OK, 0);
        assert_eq!(exit_code_for(&CliError::config("x")), EXIT_CLI);
        assert_eq!(exit_code_for(&CliError::render("x")), EXIT_RUNTIME);
        assert_eq!(
            exit_code_for(&SecretError::store("denied").into()),
            EXIT_RUNTIME
        );
    }

    #[test]
    fn test_secret_error_mapping() {
        let err: CliError = SecretError::config("missing credential field: --path").into();
        assert!(matches!(err, CliError::Config { .. }));

        let err: CliError = SecretError::Validation {
            names: vec!["A".into(), "B".into()],
        }
        .into();
        match err {
            CliError::Validation { message, help } => {
                assert_eq!(message, "The following variables have null values: A,B");
                assert!(help.is_some());
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        let err: CliError = SecretError::Io {
            path: PathBuf::from("/missing.j2"),
            source: io::Error::from(io::ErrorKind::NotFound),
        }
        .into();
        assert!(matches!(err, CliError::Io { .. }));
        assert!(err.to_string().contains("/missing.j2"));
    }

    #[test]
    fn test_template_error_mapping() {
        let err: CliError = TemplateError::Undefined {
            template: "t".into(),
            name: "DB_HOST".into(),
        }
        .into();
        assert!(matches!(err, CliError::Render { .. }));
        assert!(err.to_string().contains("DB_HOST"));

        let err: CliError = SecretError::Template(TemplateError::InvalidSpec {
            reference: "x".into(),
        })
        .into();
        assert_eq!(exit_code_for(&err), EXIT_CLI);
    }
}
