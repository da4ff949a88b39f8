//! # Dose optimizer
//!
//! Finds the non-negative dose vector `x` that brings the diseased state as
//! close as possible to the healthy one without exceeding a toxicity budget:
//!
//! ```text
//! minimize    ‖xᵀE + d‖²
//! subject to  toxicityᵀx ≤ limit
//!             x ≥ 0,  x integer unless partial doses are allowed
//! ```
//!
//! where `E` is the drug-effect matrix and `d` the disease-effect vector.
//!
//! The backend is picked once per solve from the [`DoseMode`]:
//!
//! - [`DoseMode::Continuous`]: convex QP, [`ClarabelSolver`];
//! - [`DoseMode::Integer`]: mixed-integer QP, [`BranchAndBound`] over Clarabel relaxations.
//!
//! ```rust,no_run
//! use dosealloc::prelude::*;
//!
//! # fn example(effects: DrugEffects, disease: DiseaseEffects) -> dosealloc::error::Result<()> {
//! let toxicity = Toxicity::ascending(effects.catalog());
//! let problem = DoseProblem::new(&effects, &disease, &toxicity, DoseMode::Integer)?;
//!
//! for entry in problem.sweep(&[5.0, 10.0, 20.0], true) {
//!     match entry.outcome {
//!         Ok(result) => println!("{}: {} -> {}", entry.toxicity_limit, result.doses, result.objective),
//!         Err(err) => eprintln!("{err}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod continuous;
pub mod integer;
pub mod program;
pub mod types;

pub use continuous::ClarabelSolver;
pub use integer::BranchAndBound;
pub use program::DoseProgram;
pub use types::{DoseMode, Doses, OptimizationResult, SolverOptions, SweepEntry};

use rayon::prelude::*;
use std::time::Instant;

use crate::error::{DoseError, Result};
use crate::structs::effects::{DiseaseEffects, DrugEffects};
use crate::structs::toxicity::Toxicity;

/// Raw output of a backend, doses already laid out in catalog order.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub objective: f64,
    pub doses: Doses,
    pub nodes: usize,
}

/// A solver able to minimise the dose program under one toxicity limit.
pub trait QuadraticProgramSolver: Send + Sync {
    /// The kind of doses this backend returns.
    fn mode(&self) -> DoseMode;

    fn solve(&self, program: &DoseProgram, toxicity_limit: f64) -> Result<Solution>;
}

/// Pick the backend for `mode`.
pub fn select_solver(mode: DoseMode, options: SolverOptions) -> Box<dyn QuadraticProgramSolver> {
    match mode {
        DoseMode::Continuous => Box::new(ClarabelSolver::new(options)),
        DoseMode::Integer => Box::new(BranchAndBound::new(options)),
    }
}

/// A fully specified dose allocation problem, solvable for any toxicity limit.
///
/// The program is formulated once; every limit reuses it.
pub struct DoseProblem {
    program: DoseProgram,
    toxicity: Toxicity,
    solver: Box<dyn QuadraticProgramSolver>,
}

impl DoseProblem {
    pub fn new(
        drug_effects: &DrugEffects,
        disease_effects: &DiseaseEffects,
        toxicity: &Toxicity,
        mode: DoseMode,
    ) -> Result<Self> {
        Self::with_options(
            drug_effects,
            disease_effects,
            toxicity,
            mode,
            SolverOptions::default(),
        )
    }

    pub fn with_options(
        drug_effects: &DrugEffects,
        disease_effects: &DiseaseEffects,
        toxicity: &Toxicity,
        mode: DoseMode,
        options: SolverOptions,
    ) -> Result<Self> {
        let program = DoseProgram::new(drug_effects, disease_effects, toxicity)?;
        Ok(Self {
            program,
            toxicity: toxicity.clone(),
            solver: select_solver(mode, options),
        })
    }

    pub fn mode(&self) -> DoseMode {
        self.solver.mode()
    }

    pub fn program(&self) -> &DoseProgram {
        &self.program
    }

    /// Optimal doses for a single toxicity limit.
    pub fn solve(&self, toxicity_limit: f64) -> Result<OptimizationResult> {
        // Costs are non-negative, so x = 0 is the cheapest dose there is
        if toxicity_limit.is_nan() || toxicity_limit < 0.0 {
            return Err(DoseError::Infeasible { toxicity_limit });
        }

        let now = Instant::now();
        let solution = self.solver.solve(&self.program, toxicity_limit)?;
        let toxicity_used = solution.doses.to_f64().dot(self.toxicity.costs());

        tracing::info!(
            "Toxicity limit {}: objective {:.6}, doses {} ({} node(s), {:.2?})",
            toxicity_limit,
            solution.objective,
            solution.doses,
            solution.nodes,
            now.elapsed()
        );

        Ok(OptimizationResult {
            toxicity_limit,
            objective: solution.objective,
            doses: solution.doses,
            toxicity_used,
            catalog: *self.program.catalog(),
            nodes: solution.nodes,
        })
    }

    /// Solve once per limit, keeping the input order.
    ///
    /// Entries are independent: a failed limit is reported in its entry and the
    /// rest of the sweep still runs. With `parallel` the limits are spread over
    /// the rayon thread pool.
    pub fn sweep(&self, toxicity_limits: &[f64], parallel: bool) -> Vec<SweepEntry> {
        let run = |&toxicity_limit: &f64| {
            let outcome = self.solve(toxicity_limit);
            if let Err(err) = &outcome {
                tracing::error!("{}", err);
            }
            SweepEntry {
                toxicity_limit,
                outcome,
            }
        };

        if parallel {
            toxicity_limits.par_iter().map(run).collect()
        } else {
            toxicity_limits.iter().map(run).collect()
        }
    }
}

/// Solve the dose allocation problem for one toxicity limit.
pub fn solve(
    drug_effects: &DrugEffects,
    disease_effects: &DiseaseEffects,
    toxicity: &Toxicity,
    toxicity_limit: f64,
    mode: DoseMode,
) -> Result<OptimizationResult> {
    DoseProblem::new(drug_effects, disease_effects, toxicity, mode)?.solve(toxicity_limit)
}

/// Solve the dose allocation problem for every limit in `toxicity_limits`, sequentially.
///
/// Fails only when the inputs themselves are inconsistent; per-limit failures are
/// carried in the returned entries.
pub fn sweep(
    drug_effects: &DrugEffects,
    disease_effects: &DiseaseEffects,
    toxicity: &Toxicity,
    toxicity_limits: &[f64],
    mode: DoseMode,
) -> Result<Vec<SweepEntry>> {
    let problem = DoseProblem::new(drug_effects, disease_effects, toxicity, mode)?;
    Ok(problem.sweep(toxicity_limits, false))
}
