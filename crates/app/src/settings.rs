//! Handles settings for the application. Configuration is read from
//! `settings.toml` and can be overridden with `CAMPUS_LEDGER__*` environment
//! variables, e.g. `CAMPUS_LEDGER__PAYSTACK__SECRET_KEY`.
//!
//! See `settings.toml` for the configuration.
use config::{Config, ConfigError, Environment, File};
use engine::LedgerConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Deserialize)]
pub struct Paystack {
    pub secret_key: String,
    #[serde(default = "default_paystack_url")]
    pub base_url: String,
    pub callback_url: Option<String>,
}

fn default_paystack_url() -> String {
    "https://api.paystack.co".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Option<Server>,
    #[serde(default)]
    pub ledger: LedgerConfig,
    pub paystack: Option<Paystack>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("CAMPUS_LEDGER").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
