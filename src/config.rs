use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;
use validator::Validate;

#[derive(Debug, Clone, Validate)]
pub struct Config {
    #[validate(url)]
    pub api_base_url: String,
    #[validate(length(min = 1))]
    pub api_token: String,
    #[validate(range(min = 50, max = 60000))]
    pub tick_interval_ms: u64,
    pub redirect_delay_ms: u64,
    #[validate(range(min = 1))]
    pub http_timeout_secs: u64,
    #[validate(length(min = 1))]
    pub evaluations_path: String,
    pub log_json: bool,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            api_base_url: get_var(&lookup, "API_BASE_URL")?,
            api_token: get_var(&lookup, "API_TOKEN")?,
            tick_interval_ms: get_var_parse_or(&lookup, "TICK_INTERVAL_MS", 1000)?,
            redirect_delay_ms: get_var_parse_or(&lookup, "REDIRECT_DELAY_MS", 2000)?,
            http_timeout_secs: get_var_parse_or(&lookup, "HTTP_TIMEOUT_SECS", 30)?,
            evaluations_path: lookup("EVALUATIONS_PATH")
                .unwrap_or_else(|| "/evaluations".to_string()),
            log_json: get_var_parse_or(&lookup, "LOG_JSON", false)?,
        };
        crate::utils::validation::validate(&config)?;
        Ok(config)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn get_var<F>(lookup: &F, name: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).ok_or_else(|| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_var_parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        None => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
