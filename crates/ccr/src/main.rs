//! ccr CLI entry point

// Panic output bypasses tracing, which may not be initialized
#![allow(clippy::print_stderr)]

use ccr::cli::{Cli, EXIT_OK, EXIT_RUNTIME, exit_code_for, render_error};
use ccr::pipeline::{self, Outcome};
use ccr::tracing::{TracingConfig, init_tracing};
use ccr_template::RuntimeExtras;
use ccr_vault::{VaultHttpClient, VcapServices};
use clap::Parser;

fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = Cli::parse();

    if let Err(e) = init_tracing(TracingConfig {
        format: cli.log_format,
        level: cli.level.into(),
        filter: None,
    }) {
        eprintln!("Warning: {e}");
    }

    std::process::exit(run(&cli));
}

fn run(cli: &Cli) -> i32 {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Fatal error: Failed to create tokio runtime: {e}");
            return EXIT_RUNTIME;
        }
    };

    let config = cli.pipeline_config();
    let client = VaultHttpClient::new(&cli.approle_mount);
    let lookup = VcapServices::from_env(&cli.service_name);
    let extras = RuntimeExtras::detect();

    match runtime.block_on(pipeline::run(&config, client, &lookup, &extras)) {
        Ok(Outcome::Rendered(count)) => {
            tracing::info!(count, "Rendered templates");
            EXIT_OK
        }
        Ok(Outcome::Exported { path, count }) => {
            tracing::info!(count, path = %path.display(), "Exported secrets");
            EXIT_OK
        }
        Err(err) => {
            tracing::debug!(error = ?err, "Run failed");
            render_error(&err);
            exit_code_for(&err)
        }
    }
}
