//! Pipeline configuration.
//!
//! Built once at startup (from CLI arguments and their environment
//! fallbacks) and handed to each component at construction time.

use std::time::Duration;

use anyhow::{Result, bail};

use crate::geo::DEFAULT_RADIUS_MILES;

/// Public endpoint defaults.
pub const DEFAULT_GEOCODER_URL: &str = "http://api.positionstack.com";
pub const DEFAULT_WATER_URL: &str = "https://waterservices.usgs.gov";
pub const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org";

/// The box math is planar; keep searches local.
pub const MAX_RADIUS_MILES: f64 = 100.0;

/// Where a provider lives and how to authenticate with it.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl ProviderConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

/// Bounded retry for transport failures (timeouts, refused connections).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff: Duration::from_millis(250),
        }
    }
}

/// Unit system requested from the weather provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Units {
    #[default]
    Imperial,
    Metric,
    Standard,
}

impl Units {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Imperial => "imperial",
            Self::Metric => "metric",
            Self::Standard => "standard",
        }
    }
}

impl std::str::FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "imperial" => Ok(Self::Imperial),
            "metric" => Ok(Self::Metric),
            "standard" => Ok(Self::Standard),
            _ => Err(format!(
                "unknown units: {s} (expected: imperial, metric, standard)"
            )),
        }
    }
}

/// Everything the pipeline needs to reach its providers.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub geocoder: ProviderConfig,
    pub water: ProviderConfig,
    pub weather: ProviderConfig,
    /// Search radius around a resolved location
    pub radius_miles: f64,
    /// Whole-operation deadline
    pub deadline: Duration,
    /// Per outbound request
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub units: Units,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            geocoder: ProviderConfig::new(DEFAULT_GEOCODER_URL, None),
            water: ProviderConfig::new(DEFAULT_WATER_URL, None),
            weather: ProviderConfig::new(DEFAULT_WEATHER_URL, None),
            radius_miles: DEFAULT_RADIUS_MILES,
            deadline: Duration::from_secs(20),
            request_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            units: Units::default(),
        }
    }
}

impl PipelineConfig {
    /// Reject settings the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first bad setting.
    pub fn validate(&self) -> Result<()> {
        if !self.radius_miles.is_finite() || self.radius_miles <= 0.0 {
            bail!("radius must be positive, got {}", self.radius_miles);
        }
        if self.radius_miles > MAX_RADIUS_MILES {
            bail!(
                "radius {} miles exceeds the {MAX_RADIUS_MILES} mile limit",
                self.radius_miles
            );
        }
        if self.deadline.is_zero() {
            bail!("deadline must be greater than zero");
        }
        if self.request_timeout.is_zero() {
            bail!("request timeout must be greater than zero");
        }
        for (name, provider) in [
            ("geocoder", &self.geocoder),
            ("water", &self.water),
            ("weather", &self.weather),
        ] {
            if !provider.base_url.starts_with("http://") && !provider.base_url.starts_with("https://")
            {
                bail!("{name} URL must start with http:// or https://, got {}", provider.base_url);
            }
        }
        Ok(())
    }
}
