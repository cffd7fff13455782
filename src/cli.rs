//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::{
    DEFAULT_GEOCODER_URL, DEFAULT_WATER_URL, DEFAULT_WEATHER_URL, PipelineConfig, ProviderConfig,
    RetryPolicy, Units,
};
use crate::geo::DEFAULT_RADIUS_MILES;
use crate::output::Format;
use crate::pipeline::Operation;

/// Nearby lake, stream and weather conditions from your terminal.
#[derive(Parser, Debug)]
#[command(name = "riverwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Provider and pipeline settings
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a zip code or address to coordinates
    Geocode(GeocodeArgs),

    /// Current weather at a zip code
    Weather(ZipArgs),

    /// Lakes and streams around a zip code
    Stations(ZipArgs),

    /// Recent history for one station
    Station(StationArgs),

    /// Weather and nearby stations in one call
    Conditions(ZipArgs),

    /// Run an operation on a raw invocation payload
    Invoke(InvokeArgs),

    /// Serve the operations over HTTP
    Serve(ServeArgs),
}

/// Settings shared by every command.
#[derive(Args, Debug)]
pub struct PipelineArgs {
    /// Geocoding provider base URL
    #[arg(long, global = true, env = "RIVERWATCH_GEOCODE_URL", default_value = DEFAULT_GEOCODER_URL)]
    pub geocode_url: String,

    /// Geocoding provider access key
    #[arg(long, global = true, env = "RIVERWATCH_GEOCODE_KEY", hide_env_values = true)]
    pub geocode_key: Option<String>,

    /// Station network base URL
    #[arg(long, global = true, env = "RIVERWATCH_WATER_URL", default_value = DEFAULT_WATER_URL)]
    pub water_url: String,

    /// Weather provider base URL
    #[arg(long, global = true, env = "RIVERWATCH_WEATHER_URL", default_value = DEFAULT_WEATHER_URL)]
    pub weather_url: String,

    /// Weather provider API key
    #[arg(long, global = true, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    pub weather_key: Option<String>,

    /// Search radius in miles
    #[arg(long, global = true, env = "RIVERWATCH_RADIUS", default_value_t = DEFAULT_RADIUS_MILES)]
    pub radius: f64,

    /// Overall deadline per operation, in seconds
    #[arg(long, global = true, default_value = "20")]
    pub deadline_secs: u64,

    /// Timeout for each outbound request, in seconds
    #[arg(long, global = true, default_value = "10")]
    pub request_timeout_secs: u64,

    /// Retries after a transport timeout or connection failure
    #[arg(long, global = true, default_value = "1")]
    pub retries: u32,

    /// Units for weather readings (imperial, metric, standard)
    #[arg(long, global = true, default_value = "imperial", value_parser = parse_units)]
    pub units: Units,
}

impl PipelineArgs {
    /// Build the pipeline configuration.
    #[must_use]
    pub fn to_config(&self) -> PipelineConfig {
        PipelineConfig {
            geocoder: ProviderConfig::new(self.geocode_url.clone(), self.geocode_key.clone()),
            water: ProviderConfig::new(self.water_url.clone(), None),
            weather: ProviderConfig::new(self.weather_url.clone(), self.weather_key.clone()),
            radius_miles: self.radius,
            deadline: Duration::from_secs(self.deadline_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            retry: RetryPolicy {
                max_retries: self.retries,
                ..RetryPolicy::default()
            },
            units: self.units,
        }
    }
}

/// Arguments for the `geocode` command.
#[derive(Parser, Debug)]
pub struct GeocodeArgs {
    /// Zip code or free-text address
    pub location: String,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for commands that start from a zip code.
#[derive(Parser, Debug)]
pub struct ZipArgs {
    /// Zip code to look around
    #[arg(long, short = 'z')]
    pub zip: String,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `station` command.
#[derive(Parser, Debug)]
pub struct StationArgs {
    /// Station number
    #[arg(long)]
    pub id: String,

    /// Days of history
    #[arg(long, short = 'r', default_value = "7")]
    pub range: u32,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `invoke` command.
#[derive(Parser, Debug)]
pub struct InvokeArgs {
    /// Operation to run
    #[arg(value_parser = parse_operation)]
    pub operation: Operation,

    /// Invocation payload as JSON (read from stdin when omitted)
    pub event: Option<String>,
}

/// Arguments for the `serve` command.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, short = 'p', default_value = "8080")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}

/// Parse weather units from string.
fn parse_units(s: &str) -> Result<Units, String> {
    s.parse()
}

/// Parse an operation name from string.
fn parse_operation(s: &str) -> Result<Operation, String> {
    s.parse()
}
