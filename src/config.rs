use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{CleanError, Result};
use crate::schema::Regime;

pub const DEFAULT_PROJECTS: &[&str] = &[
    "Orphan Children",
    "Feed the Hungry",
    "Homeless Shelter",
    "Medical Aid",
    "Back to School Kits",
    "Rohingya Refugee Support",
    "Medical Care",
    "Eid Gifts For Children",
];

// Both regimes have historically used the same four dates.
const DEFAULT_HOLIDAYS: &[&str] = &["2024-12-24", "2024-12-25", "2024-05-23", "2024-05-24"];

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HolidayCalendars {
    #[serde(default = "default_holidays")]
    pub bdt: Vec<NaiveDate>,
    #[serde(default = "default_holidays")]
    pub usd: Vec<NaiveDate>,
}

impl Default for HolidayCalendars {
    fn default() -> Self {
        Self {
            bdt: default_holidays(),
            usd: default_holidays(),
        }
    }
}

impl HolidayCalendars {
    pub fn for_regime(&self, regime: Regime) -> &[NaiveDate] {
        match regime {
            Regime::Bdt => &self.bdt,
            Regime::Usd => &self.usd,
        }
    }
}

/// Tunables for one cleaning run. Every field has a default, so an empty
/// JSON object (or no file at all) gives the stock behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanerConfig {
    #[serde(default = "default_projects")]
    pub projects: Vec<String>,
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,
    #[serde(default = "default_outlier_quantile")]
    pub outlier_quantile: f64,
    #[serde(default)]
    pub holidays: HolidayCalendars,
}

fn default_projects() -> Vec<String> {
    DEFAULT_PROJECTS.iter().map(|p| p.to_string()).collect()
}

fn default_match_threshold() -> f64 {
    80.0
}

fn default_outlier_quantile() -> f64 {
    0.95
}

fn default_holidays() -> Vec<NaiveDate> {
    DEFAULT_HOLIDAYS
        .iter()
        .filter_map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .collect()
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            projects: default_projects(),
            match_threshold: default_match_threshold(),
            outlier_quantile: default_outlier_quantile(),
            holidays: HolidayCalendars::default(),
        }
    }
}

impl CleanerConfig {
    pub fn from_json(content: &str) -> Result<Self> {
        let config: CleanerConfig =
            serde_json::from_str(content).map_err(|e| CleanError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.projects.is_empty() {
            return Err(CleanError::Config("project vocabulary is empty".into()));
        }
        if !(0.0..=100.0).contains(&self.match_threshold) {
            return Err(CleanError::Config(format!(
                "match_threshold must be within 0..=100, got {}",
                self.match_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.outlier_quantile) {
            return Err(CleanError::Config(format!(
                "outlier_quantile must be within 0..=1, got {}",
                self.outlier_quantile
            )));
        }
        Ok(())
    }
}

/// Load the config file if one was given, otherwise fall back to defaults.
pub fn load_config(path: Option<&Path>) -> Result<CleanerConfig> {
    let Some(path) = path else {
        return Ok(CleanerConfig::default());
    };
    let content = std::fs::read_to_string(path)?;
    CleanerConfig::from_json(&content)
}
