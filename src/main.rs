mod app;
mod client;
mod config;
mod document;
mod error;
mod form;
mod headless;
mod payload;
mod session;
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use app::App;
use client::WebClient;
use config::Config;
use form::FormState;
use headless::GenerateArgs;
use session::FormSession;

const DEFAULT_LOG_FILTER: &str = "acsform=info,warn";

#[derive(Parser)]
#[command(name = "acsform")]
#[command(about = "Terminal client for selecting and retrieving ACS census data")]
struct Args {
    /// Base URL of the data-selection service
    #[arg(long, env = "ACSFORM_SERVER")]
    server: Option<String>,

    /// Config file (default: ~/.acsform/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where interactive sessions write their log
    #[arg(long, default_value = "acsform.log")]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the API URL without the interactive form
    Generate(GenerateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(server) = args.server {
        config.server_url = server;
    }
    info!(server = %config.server_url, "starting");

    let client = WebClient::new(&config).context("failed to set up HTTP client")?;
    if let Some(username) = &config.username {
        let password = std::env::var("ACSFORM_PASSWORD")
            .context("ACSFORM_PASSWORD must be set when a username is configured")?;
        client
            .login(username, &password)
            .await
            .context("login failed")?;
    }

    let form = FormState::new(&config.form);
    let mut session = FormSession::new(client, form, config.controls);

    match args.command {
        Some(Command::Generate(generate)) => {
            let mut stdout = io::stdout().lock();
            headless::run(&mut session, &generate, &mut stdout).await
        }
        None => {
            let mut app = App::new(session)?;
            app.run().await
        }
    }
}

/// The TUI owns stdout, so interactive runs log to a file and headless runs to stderr.
fn init_logging(args: &Args) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if args.command.is_some() {
        builder.with_writer(io::stderr).init();
    } else {
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&args.log_file)
            .with_context(|| format!("failed to open {}", args.log_file.display()))?;
        builder
            .with_ansi(false)
            .with_writer(Arc::new(log_file))
            .init();
    }
    Ok(())
}
