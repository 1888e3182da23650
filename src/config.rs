use serde::Deserialize;
use std::time::Duration;

use crate::sweeper::Schedule;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub sweeper: SweeperConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SweeperConfig {
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_upcoming_interval")]
    pub upcoming_interval_secs: u64,
    #[serde(default = "default_horizon_days")]
    pub horizon_days: i64,
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
            upcoming_interval_secs: default_upcoming_interval(),
            horizon_days: default_horizon_days(),
            dry_run: false,
        }
    }
}

fn default_sweep_interval() -> u64 {
    3600
}

fn default_upcoming_interval() -> u64 {
    21600
}

fn default_horizon_days() -> i64 {
    3
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("WARDEN").separator("__"))
            .set_default("store.path", "warden.db")?
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn schedule(&self) -> Schedule {
        Schedule {
            sweep_interval: Duration::from_secs(self.sweeper.sweep_interval_secs),
            upcoming_interval: Duration::from_secs(self.sweeper.upcoming_interval_secs),
            horizon_days: self.sweeper.horizon_days,
        }
    }
}
