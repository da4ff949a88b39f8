//! Quadratic-program formulation of the dose allocation problem.
//!
//! With `E` the drug-effect matrix (drugs × proteins) and `d` the disease
//! vector, the residual disease effect of a dose vector `x` is `Eᵀx + d` and
//!
//! ```text
//! ‖Eᵀx + d‖² = xᵀ(EEᵀ)x + 2(Ed)ᵀx + dᵀd
//!            = ½ xᵀHx + qᵀx + c     with H = 2EEᵀ, q = 2Ed, c = dᵀd
//! ```
//!
//! subject to `toxicityᵀx ≤ limit` and `x ≥ 0`. `H` is positive semidefinite,
//! so the continuous problem is a convex QP.
//!
//! Drugs whose effect row is zero never change the residual but always consume
//! budget. They are fixed at zero and left out of the program; only the
//! remaining *active* drugs become decision variables.

use ndarray::{Array1, Array2, Axis};

use crate::error::{DoseError, Result};
use crate::structs::catalog::DrugCatalog;
use crate::structs::effects::{DiseaseEffects, DrugEffects};
use crate::structs::toxicity::Toxicity;

/// Relative slack used when checking a candidate against the budget.
pub(crate) const BUDGET_SLACK: f64 = 1e-9;

/// Limit-independent part of the program, built once and shared by every solve.
#[derive(Debug, Clone)]
pub struct DoseProgram {
    catalog: DrugCatalog,
    /// Catalog positions of the active drugs, ascending.
    active: Vec<usize>,
    effects: Array2<i64>,
    disease: Array1<i64>,
    hessian: Array2<f64>,
    linear: Array1<f64>,
    constant: f64,
    toxicity: Array1<f64>,
}

impl DoseProgram {
    pub fn new(
        drug_effects: &DrugEffects,
        disease: &DiseaseEffects,
        toxicity: &Toxicity,
    ) -> Result<Self> {
        drug_effects.check_aligned(disease)?;
        if toxicity.len() != drug_effects.n_drugs() {
            return Err(DoseError::DimensionMismatch {
                what: "toxicity costs vs drug effect rows",
                expected: drug_effects.n_drugs(),
                found: toxicity.len(),
            });
        }

        let inert = drug_effects.inert_drugs();
        let active: Vec<usize> = drug_effects
            .catalog()
            .iter()
            .filter(|drug| !inert.contains(drug))
            .map(|drug| drug.index())
            .collect();
        if !inert.is_empty() {
            tracing::debug!(
                "{} drug(s) have no effect on any protein and are fixed at zero",
                inert.len()
            );
        }

        let effects = drug_effects.matrix().select(Axis(0), &active);
        let disease = disease.vector().clone();
        let e = effects.mapv(|v| v as f64);
        let d = disease.mapv(|v| v as f64);

        let hessian = e.dot(&e.t()) * 2.0;
        let linear = e.dot(&d) * 2.0;
        let constant = d.dot(&d);

        Ok(Self {
            catalog: *drug_effects.catalog(),
            toxicity: toxicity.costs().select(Axis(0), &active),
            active,
            effects,
            disease,
            hessian,
            linear,
            constant,
        })
    }

    pub fn catalog(&self) -> &DrugCatalog {
        &self.catalog
    }

    /// Number of decision variables.
    pub fn n_active(&self) -> usize {
        self.active.len()
    }

    /// Catalog positions of the decision variables.
    pub fn active(&self) -> &[usize] {
        &self.active
    }

    pub fn hessian(&self) -> &Array2<f64> {
        &self.hessian
    }

    pub fn linear(&self) -> &Array1<f64> {
        &self.linear
    }

    /// Objective value at `x = 0`.
    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Toxicity costs of the active drugs.
    pub fn toxicity(&self) -> &Array1<f64> {
        &self.toxicity
    }

    /// Sum of squared residuals for a continuous dose over the active drugs.
    pub fn objective(&self, doses: &[f64]) -> f64 {
        let mut residual = self.disease.mapv(|v| v as f64);
        for (row, &dose) in self.effects.outer_iter().zip(doses) {
            residual.scaled_add(dose, &row.mapv(|v| v as f64));
        }
        residual.dot(&residual)
    }

    /// Exact sum of squared residuals for an integer dose over the active drugs.
    pub fn objective_exact(&self, doses: &[i64]) -> i128 {
        (0..self.disease.len())
            .map(|p| {
                let shifted: i128 = self
                    .effects
                    .column(p)
                    .iter()
                    .zip(doses)
                    .map(|(&e, &x)| e as i128 * x as i128)
                    .sum();
                let r = shifted + self.disease[p] as i128;
                r * r
            })
            .sum()
    }

    pub fn toxicity_of(&self, doses: &[f64]) -> f64 {
        self.toxicity.iter().zip(doses).map(|(t, x)| t * x).sum()
    }

    pub fn within_budget(&self, doses: &[f64], toxicity_limit: f64) -> bool {
        self.toxicity_of(doses) <= toxicity_limit + BUDGET_SLACK * (1.0 + toxicity_limit.abs())
    }

    /// Upper bound on the dose of a drug the budget does not limit.
    ///
    /// A single drug with integer effect row `e` is best dosed at
    /// `-(e·d)/‖e‖² ≤ ‖d‖`, and `‖d‖ ≤ ‖d‖²` for any non-zero integer `d`.
    pub fn free_dose_cap(&self) -> f64 {
        self.constant.max(1.0).floor()
    }

    /// Upper bound of each active dose before any branching: the budget bounds
    /// costly drugs by itself, the others get [`free_dose_cap`](Self::free_dose_cap).
    pub fn dose_caps(&self, toxicity_limit: f64) -> Vec<Option<f64>> {
        let cap = self.free_dose_cap();
        self.toxicity
            .iter()
            .map(|&t| (t == 0.0 || !toxicity_limit.is_finite()).then_some(cap))
            .collect()
    }

    /// Scatter doses over active drugs into a full catalog-length vector.
    pub fn expand<T: Copy + Default>(&self, doses: &[T]) -> Array1<T> {
        let mut full = Array1::from_elem(self.catalog.len(), T::default());
        for (&position, &dose) in self.active.iter().zip(doses) {
            full[position] = dose;
        }
        full
    }
}
