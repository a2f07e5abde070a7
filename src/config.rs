// ⚙️ Configuration - Ledger locations, grading thresholds, refresh pool
//
// Loaded from an optional JSON file. Every knob has a default, so an empty
// object (or no file at all) is a valid configuration. `BINDER_LEDGER_DIR`
// overrides the data directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{LedgerError, Result};
use crate::grading::GradeAdvisor;
use crate::refresh::RefreshOptions;

pub const DATA_DIR_ENV: &str = "BINDER_LEDGER_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_card_ledger")]
    pub card_ledger: PathBuf,

    #[serde(default = "default_product_ledger")]
    pub product_ledger: PathBuf,

    #[serde(default = "default_binder_ledger")]
    pub binder_ledger: PathBuf,

    #[serde(default = "default_dex_table")]
    pub dex_table: PathBuf,

    #[serde(default)]
    pub grading: GradeAdvisor,

    #[serde(default)]
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Pause before each fetch, in milliseconds
    #[serde(default)]
    pub delay_ms: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_card_ledger() -> PathBuf {
    PathBuf::from("poke_cards.csv")
}

fn default_product_ledger() -> PathBuf {
    PathBuf::from("poke_products.csv")
}

fn default_binder_ledger() -> PathBuf {
    PathBuf::from("binder_record.csv")
}

fn default_dex_table() -> PathBuf {
    PathBuf::from("pokemon_dex_num.csv")
}

fn default_workers() -> usize {
    4
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            workers: default_workers(),
            delay_ms: 0,
        }
    }
}

impl RefreshConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn options(&self) -> RefreshOptions {
        RefreshOptions::with_workers(self.workers)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            data_dir: default_data_dir(),
            card_ledger: default_card_ledger(),
            product_ledger: default_product_ledger(),
            binder_ledger: default_binder_ledger(),
            dex_table: default_dex_table(),
            grading: GradeAdvisor::default(),
            refresh: RefreshConfig::default(),
        }
    }
}

impl LedgerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| LedgerError::Config(e.to_string()))
    }

    /// Read the config file if given, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let json = std::fs::read_to_string(path).map_err(|e| {
                    LedgerError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_json(&json)?
            }
            None => Self::default(),
        };

        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.grading.cost.is_finite() && self.grading.cost >= 0.0) {
            return Err(LedgerError::Config(format!(
                "grading.cost must be a non-negative amount, got {}",
                self.grading.cost
            )));
        }
        if !(self.grading.multiplier.is_finite() && self.grading.multiplier > 0.0) {
            return Err(LedgerError::Config(format!(
                "grading.multiplier must be positive, got {}",
                self.grading.multiplier
            )));
        }
        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    pub fn card_ledger_path(&self) -> PathBuf {
        self.resolve(&self.card_ledger)
    }

    pub fn product_ledger_path(&self) -> PathBuf {
        self.resolve(&self.product_ledger)
    }

    pub fn binder_ledger_path(&self) -> PathBuf {
        self.resolve(&self.binder_ledger)
    }

    pub fn dex_table_path(&self) -> PathBuf {
        self.resolve(&self.dex_table)
    }
}
