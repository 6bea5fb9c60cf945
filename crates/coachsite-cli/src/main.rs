//! coachsite - command-line front end for the coaching-institute backend.
//!
//! Browses public content (courses, toppers, achievements, gallery, home
//! page), submits the contact form, and gives signed-in admins CRUD access
//! to the same content plus the contact inbox.

mod args;
mod commands;
mod output;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use coachsite_core::navigation::ADMIN_LOGIN_PATH;
use coachsite_core::{App, Config};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use args::{Command, ConfigCommand};

/// Directory for daily log files, in addition to stderr
const LOG_DIR_ENV: &str = "COACHSITE_LOG_DIR";

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file writer on drop and must live until
/// the process exits.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "coachsite.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn run_config(mut config: Config, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            println!("# {}", Config::config_path()?.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommand::SetUrl(url) => {
            config.api_url = Some(url);
            let normalized = config.normalized_api_url()?;
            config.api_url = Some(normalized.clone());
            config.save()?;
            println!("API URL set to {}", normalized);
        }
    }
    Ok(())
}

async fn run(argv: &[String]) -> Result<()> {
    let command = args::parse(argv)?;

    let mut config = Config::load()?;
    config.apply_env()?;

    match &command {
        Command::Help => {
            println!("{}", args::USAGE);
            return Ok(());
        }
        Command::Config(cmd) => return run_config(config, cmd.clone()),
        _ => {}
    }

    let app = App::new(config)?;
    app.router.visit(&command.route());

    // Logging out must not depend on the backend being reachable.
    if command != Command::Logout {
        let status = app.startup().await;
        debug!(?status, "Session restored");
    }

    if command.needs_admin() && !app.auth.is_authenticated().await {
        anyhow::bail!("Not logged in. Run `coachsite login` first.");
    }

    let result = commands::run(&app, command).await;

    if app.router.take_redirect().as_deref() == Some(ADMIN_LOGIN_PATH) {
        eprintln!("Your session has expired. Run `coachsite login` to sign in again.");
    }
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();
    info!("coachsite starting");

    let argv: Vec<String> = std::env::args().skip(1).collect();
    match run(&argv).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
