//! Analysis Configuration
//!
//! Tunables for reduction and solving. Every field has a default, so a
//! config file only needs to name what it changes.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::graph::ReduceConfig;
use crate::solver::{Approximant, FractionTable, SternBrocot};

/// Which nearest-fraction search the solver uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproximantKind {
    #[default]
    SternBrocot,
    Table,
}

impl ApproximantKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "stern_brocot" | "stern-brocot" => Some(ApproximantKind::SternBrocot),
            "table" => Some(ApproximantKind::Table),
            _ => None,
        }
    }
}

/// Fixed-point solver settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Sweeps between exact snapshot checks. Zero disables the check.
    pub check_interval: u32,

    /// Wall-clock budget per component, in seconds.
    pub timeout_secs: u64,

    /// Ceiling for the exact reconstruction denominator bound.
    pub denominator_cap: u64,

    pub approximant: ApproximantKind,

    /// Largest denominator in the table used by [`ApproximantKind::Table`].
    /// Queries with a larger bound use the tree walk instead.
    pub table_max_denominator: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            check_interval: 50,
            timeout_secs: 1200,
            denominator_cap: 10_000,
            approximant: ApproximantKind::SternBrocot,
            table_max_denominator: 1000,
        }
    }
}

impl SolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Instantiate the configured approximant.
    pub fn build_approximant(&self) -> Box<dyn Approximant> {
        match self.approximant {
            ApproximantKind::SternBrocot => Box::new(SternBrocot),
            ApproximantKind::Table => Box::new(FractionTable::new(self.table_max_denominator)),
        }
    }
}

/// Full analysis configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub reduce: ReduceConfig,
    pub solver: SolverConfig,
}

impl Config {
    /// Parse a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&text)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_solver_settings() {
        let config = SolverConfig::default();
        assert_eq!(config.check_interval, 50);
        assert_eq!(config.timeout(), Duration::from_secs(1200));
        assert_eq!(config.denominator_cap, 10_000);
        assert_eq!(config.approximant, ApproximantKind::SternBrocot);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = Config::from_json(
            r#"{ "solver": { "timeout_secs": 5, "approximant": "table" },
                 "reduce": { "fuse_nodes": false } }"#,
        )
        .unwrap();

        assert_eq!(config.solver.timeout_secs, 5);
        assert_eq!(config.solver.approximant, ApproximantKind::Table);
        assert_eq!(config.solver.check_interval, 50);
        assert!(!config.reduce.fuse_nodes);
        assert!(config.reduce.promote_sinks);
    }

    #[test]
    fn empty_json_is_default() {
        assert_eq!(Config::from_json("{}").unwrap(), Config::default());
    }

    #[test]
    fn approximant_names() {
        assert_eq!(ApproximantKind::from_name("table"), Some(ApproximantKind::Table));
        assert_eq!(
            ApproximantKind::from_name("stern-brocot"),
            Some(ApproximantKind::SternBrocot)
        );
        assert_eq!(ApproximantKind::from_name("farey"), None);
    }
}
