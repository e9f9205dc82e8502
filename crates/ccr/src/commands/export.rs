//! Shell environment file output

use crate::cli::CliError;
use ccr_secrets::SecretMapping;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Format secrets as `export NAME=VALUE` lines.
///
/// Values are written verbatim and null values become `export NAME=`.
#[must_use]
pub fn format_exports(secrets: &SecretMapping) -> String {
    secrets
        .iter()
        .map(|(name, value)| format!("export {name}={}\n", value.unwrap_or_default()))
        .collect()
}

/// Write the export lines to `path`, replacing any existing file.
///
/// The file is created owner-readable only.
///
/// # Errors
///
/// Returns [`CliError::Io`] if the file cannot be created or written.
pub fn write_env_file(path: &Path, secrets: &SecretMapping) -> Result<usize, CliError> {
    let io_err = |e: std::io::Error| {
        CliError::io_with_help(
            format!("Could not write {}: {e}", path.display()),
            "Check that the directory exists and is writable, or pass --out-file",
        )
    };

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(io_err)?;
    file.write_all(format_exports(secrets).as_bytes())
        .map_err(io_err)?;

    tracing::info!(path = %path.display(), count = secrets.len(), "Wrote environment file");
    Ok(secrets.len())
}
