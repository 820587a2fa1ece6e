use dotenvy::dotenv;
use log::error;
use serde::Deserialize;
use std::env;

use crate::ml::encoder::UnseenCategoryPolicy;

const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";
pub const DEFAULT_POOL_SIZE: u32 = 10;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub db_pool_size: Option<u32>,
    pub http_bind_address: Option<String>,
    pub model_dir: String,
    /// Where the training job writes its predictions export.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_horizon")]
    pub survival_horizon_days: f64,
    #[serde(default)]
    pub unseen_categories: UnseenCategoryPolicy,
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    #[serde(default = "default_seed")]
    pub random_seed: u64,
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_horizon() -> f64 {
    150.0
}

fn default_test_size() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

impl Config {
    pub fn bind_address(&self) -> String {
        self.http_bind_address
            .clone()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string())
    }

    pub fn pool_size(&self) -> u32 {
        self.db_pool_size.unwrap_or(DEFAULT_POOL_SIZE).max(1)
    }
}

pub fn create_test_config() -> Config {
    Config {
        db_path: "xxx".to_string(),
        db_pool_size: Some(2),
        http_bind_address: Some("127.0.0.1:0".to_string()),
        model_dir: "tests/fixtures".to_string(),
        output_dir: "output".to_string(),
        survival_horizon_days: 150.0,
        unseen_categories: UnseenCategoryPolicy::Reject,
        test_size: 0.2,
        random_seed: 42,
    }
}

pub fn read_config() -> Config {
    dotenv().ok();
    env::var(CONFIG_PATH_ENV)
        .map_err(|_| format!("{CONFIG_PATH_ENV} .env not set"))
        .and_then(|config_path| std::fs::read(config_path).map_err(|e| e.to_string()))
        .and_then(|bytes| toml::from_slice(&bytes).map_err(|e| e.to_string()))
        .unwrap_or_else(|err| {
            error!("failed to read config: {err}");
            std::process::exit(1);
        })
}
