//! fieldpulse configuration.
//!
//! Configuration lives in /etc/fieldpulse/config.toml unless `--config` or
//! `FIELDPULSE_CONFIG` points elsewhere. Every key has a default, so an
//! absent default file means "all defaults"; a file that was explicitly
//! named must exist and parse.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fieldpulse_shared::{ElapsedMonthPolicy, MetricsPolicy, StatusPolicy, ThresholdSet};
use serde::{Deserialize, Serialize};

use crate::visit_db::VISIT_DB_PATH;

/// System configuration directory
pub const SYSTEM_CONFIG_DIR: &str = "/etc/fieldpulse";
const CONFIG_FILE: &str = "config.toml";

/// Environment override for the config file location
pub const CONFIG_ENV: &str = "FIELDPULSE_CONFIG";

/// Which classifier labels visit metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VisitStatusMode {
    #[default]
    Threshold,
    Recency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// Whether the as-of month counts toward expected visits
    #[serde(default)]
    pub elapsed_months: ElapsedMonthPolicy,

    #[serde(default)]
    pub visit_status: VisitStatusMode,

    /// Return Index cut points (threshold mode)
    #[serde(default = "default_visit_thresholds")]
    pub visit_thresholds: ThresholdSet,

    /// Achievement-rate cut points for sales
    #[serde(default = "default_sales_thresholds")]
    pub sales_thresholds: ThresholdSet,
}

fn default_visit_thresholds() -> ThresholdSet {
    ThresholdSet::RETURN_INDEX
}

fn default_sales_thresholds() -> ThresholdSet {
    ThresholdSet::SALES_ACHIEVEMENT
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            elapsed_months: ElapsedMonthPolicy::default(),
            visit_status: VisitStatusMode::default(),
            visit_thresholds: default_visit_thresholds(),
            sales_thresholds: default_sales_thresholds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from(VISIT_DB_PATH)
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// tracing filter directive used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PulseConfig {
    #[serde(default)]
    pub metrics: MetricsSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl PulseConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PulseConfig = toml::from_str(content).context("Failed to parse config TOML")?;
        config.policy()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Explicit path, then `FIELDPULSE_CONFIG`, then the system file if present, then defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load_from(Path::new(&path));
        }
        let system_path = config_path();
        if system_path.exists() {
            return Self::load_from(&system_path);
        }
        Ok(Self::default())
    }

    /// The engine policy these settings describe, validated.
    pub fn policy(&self) -> fieldpulse_shared::Result<MetricsPolicy> {
        let visit_status = match self.metrics.visit_status {
            VisitStatusMode::Threshold => StatusPolicy::Threshold(self.metrics.visit_thresholds),
            VisitStatusMode::Recency => StatusPolicy::Recency,
        };
        let policy = MetricsPolicy {
            elapsed_months: self.metrics.elapsed_months,
            visit_status,
            sales_thresholds: self.metrics.sales_thresholds,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    PathBuf::from(SYSTEM_CONFIG_DIR).join(CONFIG_FILE)
}
