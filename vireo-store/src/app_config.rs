use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub airline: AirlineConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AirlineConfig {
    /// Two-letter marketing carrier code.
    pub carrier_code: String,
    /// Numeric prefix stamped onto ticket numbers.
    pub ticketing_prefix: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_opens_hours")]
    pub checkin_opens_hours_before: i64,
    #[serde(default = "default_closes_minutes")]
    pub checkin_closes_minutes_before: i64,
    #[serde(default = "default_max_coupons")]
    pub max_ticketed_segments: u32,
    #[serde(default = "default_locator_attempts")]
    pub locator_attempts: u32,
    #[serde(default = "default_validity_months")]
    pub document_validity_months: u32,
}

fn default_opens_hours() -> i64 {
    24
}

fn default_closes_minutes() -> i64 {
    45
}

fn default_max_coupons() -> u32 {
    4
}

fn default_locator_attempts() -> u32 {
    16
}

fn default_validity_months() -> u32 {
    6
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
            // Add in settings from the environment (with a prefix of VIREO)
            // Eg.. `VIREO__AIRLINE__CARRIER_CODE=VX` would set the key
            .add_source(config::Environment::with_prefix("VIREO").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
