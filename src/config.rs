use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub report: ReportConfig,
    pub models: ModelsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// CSV export of the merged consumption table.
    pub path: PathBuf,
    /// Trailing rows held out for evaluation.
    pub holdout_days: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub out_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub forest_trees: usize,
    pub neural_epochs: usize,
    pub sarima_seasonal_period: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig {
                path: PathBuf::from("data/merged.csv"),
                holdout_days: 365,
            },
            report: ReportConfig {
                out_dir: PathBuf::from("reports"),
            },
            models: ModelsConfig {
                forest_trees: 100,
                neural_epochs: 100,
                sarima_seasonal_period: 12,
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("HYDROCAST__").split("__"));
        Ok(figment.extract()?)
    }
}
