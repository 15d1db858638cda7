//! cronfleet - An inventory of the cron jobs on this host.
//!
//! Usage:
//!   cronfleet serve [--config FILE]   Serve the inventory over HTTP
//!   cronfleet list [--config FILE]    Print the inventory once

use clap::{Parser, Subcommand};
use cronfleet::{Aggregator, JobRecord, Settings, SettingsLoader, create_api_state, start_server};
use std::path::PathBuf;
use tracing::info;

/// cronfleet - An inventory of the cron jobs on this host
#[derive(Parser)]
#[command(name = "cronfleet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the job inventory over HTTP
    Serve {
        /// Path to a YAML settings file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Host to bind to (overrides settings)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides settings)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the job inventory once
    List {
        /// Path to a YAML settings file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so `list --json` output stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, host, port } => {
            let mut settings = load_settings(config)?;
            if let Some(host) = host {
                settings.api.host = host;
            }
            if let Some(port) = port {
                settings.api.port = port;
            }
            serve(settings).await?;
        }
        Commands::List { config, json } => {
            let settings = load_settings(config)?;
            list_jobs(settings, json).await?;
        }
    }

    Ok(())
}

/// Settings from the file, if any, then the environment.
fn load_settings(path: Option<PathBuf>) -> Result<Settings, Box<dyn std::error::Error>> {
    let settings = match path {
        Some(path) => {
            info!("Loading settings from: {}", path.display());
            SettingsLoader::load(&path)?
        }
        None => Settings::default(),
    };

    Ok(settings.with_env_overrides()?)
}

/// Run the HTTP server until Ctrl+C.
async fn serve(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let api = settings.api.clone();
    let state = create_api_state(Aggregator::from_settings(settings));
    let server = start_server(&api, state).await?;

    info!("Press Ctrl+C to stop");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        result = server => {
            if let Err(e) = result {
                return Err(format!("API server task failed: {}", e).into());
            }
        }
    }

    Ok(())
}

/// Print every job once.
async fn list_jobs(settings: Settings, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let jobs = Aggregator::from_settings(settings).get_jobs().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
        return Ok(());
    }

    for job in &jobs {
        print_job(job);
    }
    println!("{} job(s)", jobs.len());

    Ok(())
}

fn print_job(job: &JobRecord) {
    println!("ID: {}", job.id);
    println!("  Source: {}", job.source);
    println!("  User: {}", if job.user.is_empty() { "-" } else { job.user.as_str() });
    println!("  Schedule: {}", job.schedule);
    println!("  Command: {}", job.command);
    match job.next_runs.first() {
        Some(next) => println!("  Next run: {}", next.to_rfc3339()),
        None => println!("  Next run: -"),
    }
    if let Some(description) = &job.description {
        println!("  {}", description);
    }
    println!();
}
