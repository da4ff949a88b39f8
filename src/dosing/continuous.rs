//! Continuous doses: the convex QP solved with Clarabel's interior point method.
//!
//! Clarabel solves
//!
//! ```text
//! minimize    ½ xᵀPx + qᵀx
//! subject to  Ax + s = b,  s ∈ K
//! ```
//!
//! `K` is a zero cone for doses pinned to a single value followed by a
//! nonnegative cone with one row per inequality:
//!
//! - `toxicityᵀx ≤ limit` (omitted for an infinite limit),
//! - `-x_j ≤ -lower_j` for every free dose (the lower bound is 0 outside branch-and-bound),
//! - `x_j ≤ upper_j` where branch-and-bound has set an upper bound.

use clarabel::algebra::CscMatrix;
use clarabel::solver::{DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT};

use crate::dosing::program::DoseProgram;
use crate::dosing::types::{DoseMode, Doses, SolverOptions};
use crate::dosing::{QuadraticProgramSolver, Solution};
use crate::error::{DoseError, Result};

/// Relaxed doses below this are always reported as exactly zero.
pub const CLARABEL_NEG_TOL: f64 = 1e-7;

/// Box constraints on the decision variables.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Bounds {
    pub lower: Vec<f64>,
    pub upper: Vec<Option<f64>>,
}

impl Bounds {
    /// Root box: doses are non-negative and capped where the budget does not reach.
    pub fn root(program: &DoseProgram, toxicity_limit: f64) -> Self {
        Self {
            lower: vec![0.0; program.n_active()],
            upper: program.dose_caps(toxicity_limit),
        }
    }
}

/// Outcome of one QP solve.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Relaxation {
    Optimal { doses: Vec<f64>, objective: f64 },
    Infeasible,
}

/// Convex QP backend used for continuous doses and for every
/// branch-and-bound relaxation.
#[derive(Debug, Clone, Default)]
pub struct ClarabelSolver {
    options: SolverOptions,
}

impl ClarabelSolver {
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    pub(crate) fn relax(
        &self,
        program: &DoseProgram,
        toxicity_limit: f64,
        bounds: &Bounds,
        time_limit: Option<f64>,
    ) -> Result<Relaxation> {
        let n = program.n_active();
        let solver_error = |reason: String| DoseError::Solver {
            toxicity_limit,
            reason,
        };

        if bounds
            .lower
            .iter()
            .zip(&bounds.upper)
            .any(|(&l, u)| u.is_some_and(|u| u < l))
        {
            return Ok(Relaxation::Infeasible);
        }
        if n == 0 {
            return Ok(Relaxation::Optimal {
                doses: Vec::new(),
                objective: program.constant(),
            });
        }

        // P must be upper triangular
        let hessian = program.hessian();
        let p_rows: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| if j >= i { hessian[[i, j]] } else { 0.0 })
                    .collect()
            })
            .collect();
        let p = CscMatrix::from(&p_rows);
        let q = program.linear().to_vec();

        // Doses with no room to move become equalities: a box of zero width, or
        // any costly drug under a zero budget, has no interior to step through.
        let zero_budget = toxicity_limit == 0.0;
        let pinned: Vec<Option<f64>> = (0..n)
            .map(|j| {
                let lower = bounds.lower[j];
                if bounds.upper[j] == Some(lower) {
                    Some(lower)
                } else if zero_budget && program.toxicity()[j] > 0.0 {
                    Some(0.0)
                } else {
                    None
                }
            })
            .collect();
        if zero_budget
            && (0..n).any(|j| program.toxicity()[j] > 0.0 && bounds.lower[j] > 0.0)
        {
            return Ok(Relaxation::Infeasible);
        }

        let mut a_rows: Vec<Vec<f64>> = Vec::with_capacity(2 * n + 1);
        let mut b: Vec<f64> = Vec::with_capacity(2 * n + 1);

        for (j, value) in pinned.iter().enumerate() {
            if let Some(value) = value {
                let mut row = vec![0.0; n];
                row[j] = 1.0;
                a_rows.push(row);
                b.push(*value);
            }
        }
        let n_equalities = a_rows.len();

        let budget_row = toxicity_limit.is_finite() && !zero_budget;
        if budget_row {
            a_rows.push(program.toxicity().to_vec());
            b.push(toxicity_limit);
        }
        for j in (0..n).filter(|&j| pinned[j].is_none()) {
            let mut row = vec![0.0; n];
            row[j] = -1.0;
            a_rows.push(row);
            b.push(-bounds.lower[j]);

            // An upper bound the budget row already implies only degrades the conditioning
            let implied = |upper: f64| {
                let t = program.toxicity()[j];
                budget_row && t > 0.0 && upper * t >= toxicity_limit
            };
            if let Some(upper) = bounds.upper[j].filter(|&u| !implied(u)) {
                let mut row = vec![0.0; n];
                row[j] = 1.0;
                a_rows.push(row);
                b.push(upper);
            }
        }
        let n_inequalities = a_rows.len() - n_equalities;

        let a = CscMatrix::from(&a_rows);
        let mut cones = Vec::with_capacity(2);
        if n_equalities > 0 {
            cones.push(SupportedConeT::ZeroConeT(n_equalities));
        }
        if n_inequalities > 0 {
            cones.push(SupportedConeT::NonnegativeConeT(n_inequalities));
        }

        let settings = DefaultSettingsBuilder::default()
            .max_iter(self.options.max_iter)
            .tol_feas(self.options.tol_feas)
            .tol_gap_abs(self.options.tol_gap_abs)
            .tol_gap_rel(self.options.tol_gap_rel)
            .time_limit(time_limit.unwrap_or(f64::INFINITY))
            .equilibrate_enable(true)
            .verbose(false)
            .build()
            .map_err(|e| solver_error(format!("invalid solver settings: {e}")))?;

        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings)
            .map_err(|e| solver_error(format!("could not set up QP: {e:?}")))?;
        solver.solve();

        let solution = &solver.solution;
        match solution.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => {
                if solution.x.len() != n {
                    return Err(solver_error(format!(
                        "expected {} doses, solver returned {}",
                        n,
                        solution.x.len()
                    )));
                }
                Ok(Relaxation::Optimal {
                    doses: solution.x.clone(),
                    objective: solution.obj_val + program.constant(),
                })
            }
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                Ok(Relaxation::Infeasible)
            }
            SolverStatus::MaxTime => Err(solver_error(format!(
                "time limit of {:.3}s reached after {} iterations",
                time_limit.unwrap_or(f64::INFINITY),
                solution.iterations
            ))),
            status => Err(solver_error(format!(
                "solver stopped with status {status:?} after {} iterations",
                solution.iterations
            ))),
        }
    }
}

impl QuadraticProgramSolver for ClarabelSolver {
    fn mode(&self) -> DoseMode {
        DoseMode::Continuous
    }

    fn solve(&self, program: &DoseProgram, toxicity_limit: f64) -> Result<Solution> {
        // Nothing to correct: the zero dose is optimal and needs no solver
        if program.constant() == 0.0 && toxicity_limit >= 0.0 {
            return Ok(Solution {
                objective: 0.0,
                doses: Doses::Continuous(program.expand(&vec![0.0; program.n_active()])),
                nodes: 0,
            });
        }

        let bounds = Bounds::root(program, toxicity_limit);
        match self.relax(program, toxicity_limit, &bounds, self.options.time_limit)? {
            Relaxation::Infeasible => Err(DoseError::Infeasible { toxicity_limit }),
            Relaxation::Optimal { mut doses, .. } => {
                let threshold = self.options.tol_feas.sqrt().max(CLARABEL_NEG_TOL);
                let objective =
                    snap_small_doses(program, &mut doses, threshold, self.options.tol_gap_abs);
                Ok(Solution {
                    objective,
                    doses: Doses::Continuous(program.expand(&doses)),
                    nodes: 1,
                })
            }
        }
    }
}

/// Zero out relaxed doses that only reflect solver accuracy.
///
/// Doses below [`CLARABEL_NEG_TOL`] are always cleared. Doses below `threshold`
/// are cleared as a group when that does not raise the objective by more than
/// `tolerance` (relative): on a flat face the solver stops anywhere along it.
/// Returns the objective at the final doses.
pub(crate) fn snap_small_doses(
    program: &DoseProgram,
    doses: &mut [f64],
    threshold: f64,
    tolerance: f64,
) -> f64 {
    for dose in doses.iter_mut() {
        if *dose < CLARABEL_NEG_TOL {
            *dose = 0.0;
        }
    }
    let objective = program.objective(doses);

    let snapped: Vec<f64> = doses
        .iter()
        .map(|&d| if d < threshold { 0.0 } else { d })
        .collect();
    if snapped.as_slice() != &*doses {
        let candidate = program.objective(&snapped);
        if candidate <= objective + tolerance * (1.0 + objective.abs()) {
            doses.copy_from_slice(&snapped);
            return candidate;
        }
    }
    objective
}
