use clap::{Parser, Subcommand};
use colored::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod api;
mod config;
mod errors;
mod models;
mod server;
mod ticket;

use crate::config::settings::Settings;
use crate::models::incident::IncidentPayload;
use crate::models::ticket::TicketResult;
use crate::ticket::handler::{HandleOutcome, IncidentHandler};

#[derive(Parser)]
#[command(name = "pd2jira")]
#[command(version)]
#[command(about = "Create Jira tickets for triggered PagerDuty incidents", long_about = None)]
struct Cli {
    /// for debugging purposes
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.pd2jira/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle one incident payload
    Handle {
        /// JSON file with the payload; reads stdin when omitted
        #[arg(short, long)]
        payload: Option<PathBuf>,
    },

    /// Accept PagerDuty webhooks over HTTP
    Serve {
        /// (e.g., 0.0.0.0:8080)
        #[arg(short, long, default_value = "0.0.0.0:8080")]
        bind: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Display current configuration (with masked secrets)
    Show,

    /// Validate configuration by searching the configured project
    Validate,

    /// Get the path to the config file
    Path,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("\n{}", errors::Pd2JiraError::from(e));
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => Settings::default_path()?,
    };

    match cli.command {
        Commands::Handle { payload } => handle_incident(&config_path, payload.as_deref()).await,

        Commands::Serve { bind } => handle_serve(&config_path, &bind).await,

        Commands::Config { action } => handle_config(&config_path, action).await,
    }
}

fn load_settings(path: &Path) -> anyhow::Result<Arc<Settings>> {
    let settings = Settings::load(path)?;
    tracing::debug!(
        "Loaded settings from {} (project {})",
        path.display(),
        settings.jira_project
    );
    Ok(Arc::new(settings))
}

async fn handle_incident(config_path: &Path, payload_path: Option<&Path>) -> anyhow::Result<()> {
    let settings = load_settings(config_path)?;
    let handler = IncidentHandler::new(settings)?;

    let raw = match payload_path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let document: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("Payload is not valid JSON: {}", e))?;

    let outcome = handler.handle(&IncidentPayload::from_value(document)).await;
    print_outcome(&outcome);

    Ok(())
}

fn print_outcome(outcome: &HandleOutcome) {
    match outcome {
        HandleOutcome::NotTriggered => {
            println!("{}", "Incident is not triggered, nothing to do".dimmed());
        }
        HandleOutcome::Malformed { reason } => {
            println!("{}", "Incident payload is incomplete, no ticket created".yellow());
            println!("  {}", reason.dimmed());
        }
        HandleOutcome::AlreadyExists => {
            println!("{}", "A ticket for this incident already exists".yellow());
        }
        HandleOutcome::DuplicateCheckFailed { reason } => {
            println!(
                "{}",
                "Could not check for an existing ticket, skipping creation".yellow()
            );
            println!("  {}", reason.dimmed());
        }
        HandleOutcome::Submitted(TicketResult::Created { key }) => {
            println!("{}", "✓ Ticket created".green().bold());
            println!("  {} {}", "Key:".bold(), key.bright_white());
        }
        HandleOutcome::Submitted(TicketResult::Failed { message }) => {
            println!("{}", "Failed to create ticket".red().bold());
            println!("  {}", message.dimmed());
        }
    }
}

async fn handle_serve(config_path: &Path, bind: &str) -> anyhow::Result<()> {
    let settings = load_settings(config_path)?;
    let handler = Arc::new(IncidentHandler::new(settings)?);

    server::serve(handler, bind).await
}

async fn handle_config(config_path: &Path, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let settings = Settings::load(config_path)?;

            println!("{}", "Current Configuration".cyan().bold());
            println!("{}", config_path.display().to_string().dimmed());
            println!();
            print!("{}", toml::to_string_pretty(&settings.redacted())?);

            Ok(())
        }

        ConfigAction::Validate => {
            println!("{}", "Validating configuration...".cyan().bold());
            println!();

            let settings = Settings::load(config_path)?;
            println!("{}", "  ✓ Configuration file is valid".green());

            print!("{}", "  Testing Jira connection... ".dimmed());
            std::io::Write::flush(&mut std::io::stdout())?;

            let jira = api::jira::JiraClient::new(&settings)?;
            match jira.count_incident_tickets(&settings.jira_project, 0).await {
                Ok(_) => {
                    println!("{}", "✓".green());
                    println!();
                    println!("{}", "Configuration looks good!".green().bold());
                    Ok(())
                }
                Err(e) => {
                    println!("{}", "✗".red());
                    Err(anyhow::Error::new(errors::Pd2JiraError::ConfigValidationFailed(
                        format!("{:#}", e),
                    )))
                }
            }
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
            Ok(())
        }
    }
}
