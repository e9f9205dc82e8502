//! ccr: render configuration files from secrets
//!
//! Secrets come from HashiCorp Vault (a direct endpoint or a Cloud Foundry
//! service binding) or from the process environment. They are rendered into
//! Jinja-style templates or exported as a shell environment file.

pub mod cli;
pub mod commands;
pub mod pipeline;
pub mod tracing;

pub use cli::{CliError, EXIT_CLI, EXIT_OK, EXIT_RUNTIME, exit_code_for, render_error};
pub use pipeline::{OutputMode, Outcome, PipelineConfig, run};
