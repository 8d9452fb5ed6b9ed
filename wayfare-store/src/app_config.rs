use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub booking_rules: BookingRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    pub reservation_hold_seconds: i64,
    pub session_idle_seconds: i64,
    #[serde(default = "default_service_fee_bps")]
    pub service_fee_bps: u32,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub seed_demo_catalog: bool,
}

fn default_service_fee_bps() -> u32 {
    1_000
}

fn default_currency() -> String {
    "IDR".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Empty string runs the service against the in-memory stores
    pub url: String,
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
            // Add in settings from the environment (with a prefix of WAYFARE)
            // Eg.. `WAYFARE__SERVER__PORT=8081` would set the server port
            .add_source(config::Environment::with_prefix("WAYFARE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

impl BookingRules {
    pub fn reservation_hold(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.reservation_hold_seconds)
    }

    pub fn session_idle(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_idle_seconds)
    }
}
