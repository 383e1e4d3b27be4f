use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub operator: OperatorConfig,
    pub sweep: SweepConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OperatorConfig {
    /// Shared secret for the /v1/admin channel.
    pub api_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SweepConfig {
    #[serde(default = "default_sweep_seconds")]
    pub interval_seconds: u64,
    #[serde(default = "default_reminder_seconds")]
    pub reminder_interval_seconds: u64,
    #[serde(default = "default_reminder_window")]
    pub reminder_window_hours: i64,
}

fn default_sweep_seconds() -> u64 {
    300
}

fn default_reminder_seconds() -> u64 {
    3600
}

fn default_reminder_window() -> i64 {
    72
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// Server-side floor for buyout offers; zero means positivity only.
    #[serde(default)]
    pub min_offer_cents: i64,
    /// Multiple of the daily price the UI suggests as an opening offer.
    #[serde(default = "default_offer_multiplier")]
    pub suggested_offer_multiplier: f64,
}

fn default_offer_multiplier() -> f64 {
    1.5
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file
            // Default to 'development' env
            // Note that this file is _optional_
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of GRIDLOT)
            .add_source(config::Environment::with_prefix("GRIDLOT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
