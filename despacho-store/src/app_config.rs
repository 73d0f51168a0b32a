use despacho_order::{PaymentMethod, ReviewPolicy};
use serde::Deserialize;
use std::env;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    /// Without a database the engine runs on the in-memory repository
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WalletConfig {
    /// Payment methods that must pass cartera before logistics
    #[serde(default = "default_review_required")]
    pub review_required: Vec<PaymentMethod>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_max_connections() -> u32 { 5 }

fn default_review_required() -> Vec<PaymentMethod> {
    vec![PaymentMethod::Credit, PaymentMethod::Transfer]
}

fn default_channel_capacity() -> usize { 256 }

impl Default for WalletConfig {
    fn default() -> Self {
        Self { review_required: default_review_required() }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { channel_capacity: default_channel_capacity() }
    }
}

impl WalletConfig {
    pub fn review_policy(&self) -> ReviewPolicy {
        ReviewPolicy::new(self.review_required.iter().copied())
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(Path::new("config"))
    }

    /// `default` → `{RUN_MODE}` → `local` files from `dir`, then `DESPACHO__*` env vars
    pub fn load_from(dir: &Path) -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let file = |name: &str| dir.join(name).to_string_lossy().into_owned();

        let s = config::Config::builder()
            .add_source(config::File::with_name(&file("default")))
            .add_source(config::File::with_name(&file(&run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name(&file("local")).required(false))
            // Eg. `DESPACHO__SERVER__PORT=9000`
            .add_source(config::Environment::with_prefix("DESPACHO").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
