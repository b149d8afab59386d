//! Keyroster - signed team rosters of OpenPGP keys

mod cli;
mod exit_codes;

use std::path::Path;

use clap::Parser;
use keyroster_core::{ConfigError, LoggingConfig};
use keyroster_team::TeamError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use cli::{output, Cli, Context};

fn main() {
    let cli = Cli::parse();

    let code = match run(cli) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::load(cli.home.as_deref())?;
    let _guard = init_tracing(&cli, &ctx.config.logging, &ctx.data_dir.logs_dir());

    cli.execute(&ctx)
}

fn exit_code_for(error: &anyhow::Error) -> i32 {
    if error.downcast_ref::<ConfigError>().is_some() {
        return exit_codes::CONFIG_ERROR;
    }
    match error.downcast_ref::<TeamError>() {
        Some(TeamError::InvalidTeam(_)) | Some(TeamError::Parse(_)) => exit_codes::VALIDATION_ERROR,
        _ => exit_codes::ERROR,
    }
}

/// Set up tracing with two layers:
/// - Console: `-v` for debug, else RUST_LOG, else the configured level
/// - File: debug-level JSON under `<data>/logs/`, unless disabled in config
fn init_tracing(
    cli: &Cli,
    logging: &LoggingConfig,
    log_dir: &Path,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let console_filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    if logging.file && std::fs::create_dir_all(log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::daily(log_dir, "keyroster.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_filter(console_filter),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_target(true)
                    .with_filter(EnvFilter::new("debug")),
            )
            .init();

        return Some(guard);
    }

    // Console only
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter),
        )
        .init();

    None
}
