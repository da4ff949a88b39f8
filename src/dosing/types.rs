//! Result and option types for the dose optimizer

use ndarray::Array1;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

use crate::error::DoseError;
use crate::structs::catalog::{DrugCatalog, DrugId};

/// Whether doses are whole units or may be fractional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoseMode {
    /// Non-negative integers, solved by branch-and-bound.
    Integer,
    /// Non-negative reals, solved as a convex QP.
    Continuous,
}

impl DoseMode {
    /// Maps the `allow_partial_doses` flag onto a mode.
    pub fn from_partial_doses(allow_partial_doses: bool) -> Self {
        if allow_partial_doses {
            DoseMode::Continuous
        } else {
            DoseMode::Integer
        }
    }
}

impl fmt::Display for DoseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoseMode::Integer => write!(f, "integer"),
            DoseMode::Continuous => write!(f, "continuous"),
        }
    }
}

/// Chosen doses, typed by mode. Integer runs report exact integers.
#[derive(Debug, Clone, PartialEq)]
pub enum Doses {
    Integer(Array1<i64>),
    Continuous(Array1<f64>),
}

impl Doses {
    pub fn len(&self) -> usize {
        match self {
            Doses::Integer(d) => d.len(),
            Doses::Continuous(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mode(&self) -> DoseMode {
        match self {
            Doses::Integer(_) => DoseMode::Integer,
            Doses::Continuous(_) => DoseMode::Continuous,
        }
    }

    pub fn to_f64(&self) -> Array1<f64> {
        match self {
            Doses::Integer(d) => d.mapv(|v| v as f64),
            Doses::Continuous(d) => d.clone(),
        }
    }

    pub fn as_integer(&self) -> Option<&Array1<i64>> {
        match self {
            Doses::Integer(d) => Some(d),
            Doses::Continuous(_) => None,
        }
    }

    pub fn as_continuous(&self) -> Option<&Array1<f64>> {
        match self {
            Doses::Continuous(d) => Some(d),
            Doses::Integer(_) => None,
        }
    }

    /// Dose at `index` formatted for reports.
    pub fn format_at(&self, index: usize) -> String {
        match self {
            Doses::Integer(d) => d[index].to_string(),
            Doses::Continuous(d) => format!("{:.6}", d[index]),
        }
    }
}

impl fmt::Display for Doses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = (0..self.len()).map(|i| self.format_at(i)).collect();
        write!(f, "[{}]", parts.join(" "))
    }
}

/// Optimal dose vector and objective for one toxicity limit.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationResult {
    pub toxicity_limit: f64,
    /// Sum of squared residual disease effects.
    pub objective: f64,
    /// One dose per catalog drug, in catalog order.
    pub doses: Doses,
    /// Toxicity actually spent by `doses`.
    pub toxicity_used: f64,
    pub catalog: DrugCatalog,
    /// Relaxations solved; 1 for continuous runs, 0 if nothing was left to optimize.
    pub nodes: usize,
}

impl OptimizationResult {
    pub fn dose(&self, drug: DrugId) -> f64 {
        self.doses.to_f64()[drug.index()]
    }

    /// `(drug, dose)` pairs in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (DrugId, f64)> + '_ {
        self.catalog.iter().zip(self.doses.to_f64().into_iter())
    }
}

/// One entry of a toxicity sweep. A failed limit does not abort the others.
#[derive(Debug)]
pub struct SweepEntry {
    pub toxicity_limit: f64,
    pub outcome: Result<OptimizationResult, DoseError>,
}

impl SweepEntry {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn result(&self) -> Option<&OptimizationResult> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&DoseError> {
        self.outcome.as_ref().err()
    }
}

/// Solver tolerances and limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    #[serde(default = "default_max_iter")]
    pub max_iter: u32,
    #[serde(default = "default_tolerance")]
    pub tol_feas: f64,
    #[serde(default = "default_tolerance")]
    pub tol_gap_abs: f64,
    #[serde(default = "default_tolerance")]
    pub tol_gap_rel: f64,
    /// Wall-clock limit in seconds for one toxicity limit, branch-and-bound included.
    #[serde(default)]
    pub time_limit: Option<f64>,
    /// Branch-and-bound node budget.
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
    /// Distance to the nearest integer below which a relaxed dose counts as integral.
    #[serde(default = "default_integrality_tol")]
    pub integrality_tol: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iter: default_max_iter(),
            tol_feas: default_tolerance(),
            tol_gap_abs: default_tolerance(),
            tol_gap_rel: default_tolerance(),
            time_limit: None,
            max_nodes: default_max_nodes(),
            integrality_tol: default_integrality_tol(),
        }
    }
}

fn default_max_iter() -> u32 {
    200
}

fn default_tolerance() -> f64 {
    1e-8
}

fn default_max_nodes() -> usize {
    100_000
}

fn default_integrality_tol() -> f64 {
    1e-6
}
