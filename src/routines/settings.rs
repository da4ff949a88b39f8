use config::Config as eConfig;
use eyre::{Result, WrapErr};
use serde_derive::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::dosing::types::{DoseMode, SolverOptions};
use crate::routines::data::UnknownProteinPolicy;
use crate::structs::catalog::{DrugCatalog, DEFAULT_CATALOG_SIZE};
use crate::structs::toxicity::Toxicity;

/// Environment variables with this prefix override the configuration file,
/// e.g. `DOSEALLOC__CONFIG__ALLOW_PARTIAL_DOSES=true`.
pub const ENV_PREFIX: &str = "DOSEALLOC";

/// Settings for a dose allocation run
///
/// The user can specify the settings in a TOML file, see [`Settings::from_file`].
/// Every section except `paths` may be omitted.
#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
pub struct Settings {
    pub paths: Paths,
    #[serde(default)]
    pub config: Config,
    #[serde(default)]
    pub toxicity: ToxicitySettings,
    #[serde(default)]
    pub solver: SolverOptions,
}

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq, Default)]
pub struct Paths {
    /// Disease-effect table (`Protein`, `Healthy`, `Diseased`)
    pub proteins: PathBuf,
    /// Drug-effect table (`Drug`, `Protein`, `Effect`)
    pub drug_effects: PathBuf,
    /// Directory for `sweep.csv` and `settings.json`
    pub output: Option<PathBuf>,
    /// Log file, in addition to stdout
    pub log: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
pub struct Config {
    #[serde(default = "default_false")]
    pub allow_partial_doses: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_true")]
    pub parallel: bool,
    #[serde(default)]
    pub unknown_proteins: UnknownProteinPolicy,
    #[serde(default = "default_catalog_size")]
    pub catalog_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allow_partial_doses: default_false(),
            log_level: default_log_level(),
            parallel: default_true(),
            unknown_proteins: UnknownProteinPolicy::default(),
            catalog_size: default_catalog_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
pub struct ToxicitySettings {
    /// Per-unit cost of each catalog drug. Defaults to `1, 2, ..., D`.
    #[serde(default)]
    pub costs: Option<Vec<f64>>,
    /// Budgets to sweep, solved in this order.
    #[serde(default = "default_limits")]
    pub limits: Vec<f64>,
}

impl Default for ToxicitySettings {
    fn default() -> Self {
        Self {
            costs: None,
            limits: default_limits(),
        }
    }
}

impl Settings {
    pub fn new(proteins: impl Into<PathBuf>, drug_effects: impl Into<PathBuf>) -> Self {
        Self {
            paths: Paths {
                proteins: proteins.into(),
                drug_effects: drug_effects.into(),
                output: None,
                log: None,
            },
            config: Config::default(),
            toxicity: ToxicitySettings::default(),
            solver: SolverOptions::default(),
        }
    }

    /// Read settings from a TOML file, layered with `DOSEALLOC__*` environment variables.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let parsed = eConfig::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .wrap_err_with(|| format!("could not read settings from {}", path.display()))?;

        let settings: Settings = parsed
            .try_deserialize()
            .wrap_err("settings file does not match the expected layout")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn with_partial_doses(mut self, allow: bool) -> Self {
        self.config.allow_partial_doses = allow;
        self
    }

    pub fn with_limits(mut self, limits: Vec<f64>) -> Self {
        self.toxicity.limits = limits;
        self
    }

    pub fn with_costs(mut self, costs: Vec<f64>) -> Self {
        self.toxicity.costs = Some(costs);
        self
    }

    pub fn with_output(mut self, dir: impl Into<PathBuf>) -> Self {
        self.paths.output = Some(dir.into());
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    pub fn with_unknown_proteins(mut self, policy: UnknownProteinPolicy) -> Self {
        self.config.unknown_proteins = policy;
        self
    }

    pub fn with_solver(mut self, solver: SolverOptions) -> Self {
        self.solver = solver;
        self
    }

    pub fn catalog(&self) -> DrugCatalog {
        DrugCatalog::new(self.config.catalog_size)
    }

    pub fn mode(&self) -> DoseMode {
        DoseMode::from_partial_doses(self.config.allow_partial_doses)
    }

    /// The validated toxicity vector, falling back to ascending costs.
    pub fn toxicity(&self) -> Result<Toxicity> {
        let catalog = self.catalog();
        match &self.toxicity.costs {
            Some(costs) => Ok(Toxicity::new(&catalog, costs.clone())?),
            None => Ok(Toxicity::ascending(&catalog)),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.config.catalog_size == 0 {
            eyre::bail!("config.catalog_size must be at least 1");
        }
        if self.toxicity.limits.is_empty() {
            eyre::bail!("toxicity.limits must contain at least one budget");
        }
        self.toxicity().wrap_err("invalid toxicity.costs")?;
        Ok(())
    }

    /// Write the effective settings to `settings.json` in `dir`.
    pub fn write(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let file_path = dir.as_ref().join("settings.json");
        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(&file_path, serialized)
            .wrap_err_with(|| format!("could not write {}", file_path.display()))?;
        Ok(file_path)
    }
}

// *********************************
// Default values for deserializing
// *********************************
fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_catalog_size() -> usize {
    DEFAULT_CATALOG_SIZE
}

fn default_limits() -> Vec<f64> {
    vec![10.0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let settings = Settings::new("proteins.csv", "drugs.csv");
        assert_eq!(settings.mode(), DoseMode::Integer);
        assert_eq!(settings.catalog().len(), 10);
        assert_eq!(settings.toxicity.limits, vec![10.0]);
        let toxicity = settings.toxicity().unwrap();
        assert_eq!(toxicity.to_vec()[0], 1.0);
        assert_eq!(toxicity.to_vec()[9], 10.0);
    }

    #[test]
    fn validation_catches_bad_costs() {
        let settings = Settings::new("p.csv", "d.csv").with_costs(vec![1.0, 2.0]);
        assert!(settings.validate().is_err());
        let settings = Settings::new("p.csv", "d.csv").with_limits(vec![]);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn settings_round_trip_through_json() {
        let settings = Settings::new("p.csv", "d.csv")
            .with_partial_doses(true)
            .with_unknown_proteins(UnknownProteinPolicy::Reject);
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"unknown_proteins\":\"reject\""));
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
