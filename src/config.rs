use crate::errors::AppError;
use crate::geos::BoundingBox;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub craigslist: CraigslistSettings,
    #[serde(default)]
    pub neighborhoods: NeighborhoodSettings,
    #[serde(default)]
    pub transit: StopSettings,
    #[serde(default)]
    pub shuttle: StopSettings,
    #[serde(default)]
    pub preferences: PreferenceSettings,
    /// Walking refinement is skipped entirely when absent.
    pub routing: Option<RoutingSettings>,
    #[serde(default)]
    pub slack: SlackSettings,
    #[serde(default)]
    pub runtime: RuntimeSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CraigslistSettings {
    /// e.g. "sfbay" for https://sfbay.craigslist.org
    pub site: String,
    /// Sub-areas such as "sfc" or "eby".
    pub areas: Vec<String>,
    pub sections: Vec<SectionSettings>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Overrides `https://{site}.craigslist.org`.
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectionSettings {
    /// Housing section code: "apa", "roo", "sub", ...
    pub code: String,
    pub min_price: u32,
    pub max_price: u32,
    pub channel: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NeighborhoodSettings {
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub boxes: Vec<BoxSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoxSettings {
    pub name: String,
    /// [lat, lon]
    pub southwest: [f64; 2],
    /// [lat, lon]
    pub northeast: [f64; 2],
}

impl BoxSettings {
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(self.southwest.into(), self.northeast.into())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StopSettings {
    #[serde(default)]
    pub stops: Vec<StopEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StopEntry {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreferenceSettings {
    /// miles
    #[serde(default = "default_max_transit_dist")]
    pub max_transit_dist: f64,
    /// miles
    #[serde(default = "default_max_shuttle_dist")]
    pub max_shuttle_dist: f64,
    /// minutes
    #[serde(default = "default_max_shuttle_walk_time")]
    pub max_shuttle_walk_time: f64,
    #[serde(default = "default_true")]
    pub require_image: bool,
    #[serde(default)]
    pub disallowed_phrases: Vec<String>,
}

impl Default for PreferenceSettings {
    fn default() -> Self {
        Self {
            max_transit_dist: default_max_transit_dist(),
            max_shuttle_dist: default_max_shuttle_dist(),
            max_shuttle_walk_time: default_max_shuttle_walk_time(),
            require_image: true,
            disallowed_phrases: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoutingSettings {
    pub base_url: String,
    #[serde(default = "default_routing_profile")]
    pub profile: String,
    #[serde(default = "default_routing_timeout")]
    pub timeout_secs: u64,
}

impl RoutingSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackSettings {
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_slack_base_url")]
    pub base_url: String,
    #[serde(default = "default_slack_username")]
    pub username: String,
    #[serde(default = "default_slack_icon")]
    pub icon_emoji: String,
}

impl Default for SlackSettings {
    fn default() -> Self {
        Self {
            token: String::new(),
            base_url: default_slack_base_url(),
            username: default_slack_username(),
            icon_emoji: default_slack_icon(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeSettings {
    #[serde(default = "default_sleep_interval")]
    pub sleep_interval_secs: u64,
    /// Upper bound on concurrent routing and desirability calls.
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl RuntimeSettings {
    pub fn sleep_interval(&self) -> Duration {
        Duration::from_secs(self.sleep_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            sleep_interval_secs: default_sleep_interval(),
            workers: default_workers(),
            http_timeout_secs: default_http_timeout(),
            database_path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_limit() -> usize { 20 }
fn default_max_transit_dist() -> f64 { 1.5 }
fn default_max_shuttle_dist() -> f64 { 0.75 }
fn default_max_shuttle_walk_time() -> f64 { 15.0 }
fn default_true() -> bool { true }
fn default_routing_profile() -> String { "foot".to_string() }
fn default_routing_timeout() -> u64 { 10 }
fn default_slack_base_url() -> String { "https://slack.com".to_string() }
fn default_slack_username() -> String { "cl_rooms".to_string() }
fn default_slack_icon() -> String { ":house:".to_string() }
fn default_sleep_interval() -> u64 { 20 * 60 }
fn default_workers() -> usize { 4 }
fn default_http_timeout() -> u64 { 30 }
fn default_database_path() -> String { "listings.db".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "pretty".to_string() }

impl Settings {
    /// Load configuration from files and environment variables
    ///
    /// Later sources override earlier ones:
    /// 1. config/default.toml
    /// 2. config/local.toml (optional)
    /// 3. `extra`, when given on the command line
    /// 4. Environment variables prefixed with SCOUT__, e.g. SCOUT__SLACK__TOKEN
    pub fn load(extra: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = extra {
            builder = builder.add_source(File::from(path));
        }

        builder
            .add_source(
                Environment::with_prefix("SCOUT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    #[cfg(test)]
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Reject settings the scraper cannot run with; warn about ones that are merely suspicious.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.runtime.workers == 0 {
            return Err(AppError::Config("runtime.workers must be at least 1".into()));
        }

        for section in &self.craigslist.sections {
            if section.min_price > section.max_price {
                return Err(AppError::Config(format!(
                    "section {}: min_price {} exceeds max_price {}",
                    section.code, section.min_price, section.max_price
                )));
            }
        }

        for b in &self.neighborhoods.boxes {
            if !b.bounds().is_well_formed() {
                warn!(
                    name = %b.name,
                    "neighborhood box corners are not (southwest, northeast); it will never match"
                );
            }
        }

        Ok(())
    }
}
