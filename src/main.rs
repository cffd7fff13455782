//! riverwatch - Nearby lake, stream and weather conditions from your terminal.
//!
//! Resolves a zip code or address, finds USGS lake and stream stations in
//! a box around it, and pairs their latest readings with current weather.

use std::io::{self, Read};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{Value, json};
use tracing::error;

mod cli;
mod client;
mod config;
mod errors;
mod geo;
mod geocode;
mod models;
mod output;
mod pipeline;
mod request;
mod sampler;
mod server;
mod stations;
mod water;
mod weather;

use cli::{Cli, Command};
use output::{Format, Render};
use pipeline::Conditions;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    let config = cli.pipeline.to_config();
    config.validate().context("invalid configuration")?;
    let conditions = Conditions::new(&config).context("failed to create HTTP client")?;

    tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(execute(cli.command, conditions))
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

async fn execute(command: Command, conditions: Conditions) -> Result<()> {
    match command {
        Command::Geocode(args) => {
            let result = conditions
                .geocode(&args.location)
                .await
                .with_context(|| format!("failed to geocode '{}'", args.location))?;
            emit(&result, args.format)
        }
        Command::Weather(args) => {
            let weather = conditions
                .weather(&args.zip)
                .await
                .with_context(|| format!("failed to fetch weather for {}", args.zip))?;
            emit(&weather, args.format)
        }
        Command::Stations(args) => {
            let stations = conditions
                .bulk_stations(&args.zip)
                .await
                .with_context(|| format!("failed to fetch stations near {}", args.zip))?;
            emit(&stations, args.format)
        }
        Command::Station(args) => {
            let station = conditions
                .station_history(&args.id, args.range)
                .await
                .with_context(|| format!("failed to fetch history for station {}", args.id))?;
            emit(&station, args.format)
        }
        Command::Conditions(args) => {
            let report = conditions
                .conditions(&args.zip)
                .await
                .with_context(|| format!("failed to fetch conditions for {}", args.zip))?;
            emit(&report, args.format)
        }
        Command::Invoke(args) => cmd_invoke(args, &conditions).await,
        Command::Serve(args) => {
            let config = server::ServerConfig {
                port: args.port,
                host: args.host,
            };
            server::run_server(config, conditions).await
        }
    }
}

/// Execute the `invoke` command - run one operation on a raw payload.
///
/// Failures are also written to stdout as `{ kind, message }` so callers
/// can branch on the kind.
async fn cmd_invoke(args: cli::InvokeArgs, conditions: &Conditions) -> Result<()> {
    let raw = match args.event {
        Some(event) => event,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read payload from stdin")?;
            buf
        }
    };
    let event: Value = serde_json::from_str(&raw).context("payload is not valid JSON")?;

    let result = conditions.dispatch(args.operation, &event).await;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match result {
        Ok(value) => {
            output::write_json(&mut handle, &value)?;
            Ok(())
        }
        Err(e) => {
            let body = json!({ "kind": e.kind().as_str(), "message": e.to_string() });
            output::write_json(&mut handle, &body)?;
            Err(e).with_context(|| format!("{} failed", args.operation.as_str()))
        }
    }
}

fn emit<T: Render>(value: &T, format: Format) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_result(&mut handle, value, format)?;
    Ok(())
}
