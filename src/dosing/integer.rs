//! Integer doses: depth-first branch-and-bound over Clarabel relaxations.
//!
//! Each node carries integer box bounds on the doses. Its continuous relaxation
//! gives a lower bound on every integer point inside the box:
//!
//! - infeasible relaxation, or bound above the incumbent: the node is pruned;
//! - integral relaxation: the rounded point is a candidate and the node is closed;
//! - otherwise the first fractional dose `x_j` splits the node into
//!   `x_j ≤ ⌊x_j⌋` and `x_j ≥ ⌈x_j⌉`, the down branch explored first.
//!
//! Candidates are scored with the exact integer objective and compared on
//! `(objective, doses)`, so among equally good dose vectors the lexicographically
//! smallest wins. Pruning keeps nodes whose bound equals the incumbent for the
//! same reason. The search starts from the zero dose, which is always feasible.
//!
//! Integer doses give integer objectives, so a node whose bound is above
//! `incumbent - 1` can only hold ties. Such a node is cut down to the part that
//! is lexicographically smaller than the incumbent, or dropped when nothing is
//! left. An incumbent at objective 0 makes every node tie-only before it is
//! even relaxed. Doses the budget does not bound start out capped (see
//! [`DoseProgram::free_dose_cap`]).

use std::time::{Duration, Instant};

use crate::dosing::continuous::{Bounds, ClarabelSolver, Relaxation};
use crate::dosing::program::DoseProgram;
use crate::dosing::types::{DoseMode, Doses, SolverOptions};
use crate::dosing::{QuadraticProgramSolver, Solution};
use crate::error::{DoseError, Result};

/// Mixed-integer QP backend.
#[derive(Debug, Clone, Default)]
pub struct BranchAndBound {
    relaxation: ClarabelSolver,
}

impl BranchAndBound {
    pub fn new(options: SolverOptions) -> Self {
        Self {
            relaxation: ClarabelSolver::new(options),
        }
    }

    pub fn options(&self) -> &SolverOptions {
        self.relaxation.options()
    }
}

#[derive(Debug)]
struct Incumbent {
    objective: i128,
    doses: Vec<i64>,
}

/// What is left of a node once it may only hold ties with the incumbent.
#[derive(Debug, PartialEq)]
enum Restricted {
    Empty,
    Unchanged,
    Tightened(Bounds),
}

impl Incumbent {
    fn offer(&mut self, objective: i128, doses: Vec<i64>) {
        if (objective, &doses) < (self.objective, &self.doses) {
            self.objective = objective;
            self.doses = doses;
        }
    }

    /// Restrict `bounds` to doses lexicographically smaller than the incumbent.
    ///
    /// Leading doses equal to the incumbent's are fixed, the first dose that can
    /// still go lower is capped at the incumbent's value.
    fn restrict(&self, bounds: &Bounds) -> Restricted {
        let mut tighter = bounds.clone();
        for (j, &best) in self.doses.iter().enumerate() {
            let best = best as f64;
            if tighter.lower[j] > best {
                return Restricted::Empty;
            }
            if tighter.upper[j].map_or(true, |u| u > best) {
                tighter.upper[j] = Some(best);
            }
            if tighter.lower[j] < best {
                return if tighter == *bounds {
                    Restricted::Unchanged
                } else {
                    Restricted::Tightened(tighter)
                };
            }
        }
        // Only the incumbent itself remains
        Restricted::Empty
    }
}

/// Integer objectives are integral, so half a unit is an upper limit on how much
/// numerical noise in the relaxation bound can be forgiven.
fn prune_tolerance(incumbent: f64) -> f64 {
    (1e-6 * (1.0 + incumbent.abs())).min(0.5)
}

fn as_f64(doses: &[i64]) -> Vec<f64> {
    doses.iter().map(|&d| d as f64).collect()
}

fn clamp(value: f64, bounds: &Bounds, j: usize) -> f64 {
    let value = value.max(bounds.lower[j]);
    match bounds.upper[j] {
        Some(upper) => value.min(upper),
        None => value,
    }
}

impl QuadraticProgramSolver for BranchAndBound {
    fn mode(&self) -> DoseMode {
        DoseMode::Integer
    }

    fn solve(&self, program: &DoseProgram, toxicity_limit: f64) -> Result<Solution> {
        let options = self.relaxation.options();
        let tol = options.integrality_tol;
        let n = program.n_active();
        let started = Instant::now();
        let time_limit = options.time_limit.map(Duration::from_secs_f64);
        let solver_error = |reason: String| DoseError::Solver {
            toxicity_limit,
            reason,
        };

        let zero = vec![0_i64; n];
        let mut incumbent = Incumbent {
            objective: program.objective_exact(&zero),
            doses: zero,
        };

        let mut stack = vec![Bounds::root(program, toxicity_limit)];
        let mut nodes = 0usize;

        while let Some(mut bounds) = stack.pop() {
            if incumbent.objective == 0 {
                match incumbent.restrict(&bounds) {
                    Restricted::Empty => continue,
                    Restricted::Unchanged => {}
                    Restricted::Tightened(tighter) => bounds = tighter,
                }
            }
            if nodes >= options.max_nodes {
                return Err(solver_error(format!(
                    "branch-and-bound node limit ({}) reached",
                    options.max_nodes
                )));
            }
            let remaining = match time_limit {
                Some(limit) => {
                    let elapsed = started.elapsed();
                    if elapsed >= limit {
                        return Err(solver_error(format!(
                            "time limit of {:.3}s reached after {} nodes",
                            limit.as_secs_f64(),
                            nodes
                        )));
                    }
                    Some((limit - elapsed).as_secs_f64())
                }
                None => None,
            };
            nodes += 1;

            let (x, bound) = match self
                .relaxation
                .relax(program, toxicity_limit, &bounds, remaining)?
            {
                Relaxation::Infeasible => continue,
                Relaxation::Optimal { doses, objective } => (doses, objective),
            };

            let best = incumbent.objective as f64;
            if bound > best + prune_tolerance(best) {
                continue;
            }
            if bound > best - 1.0 + prune_tolerance(best) {
                match incumbent.restrict(&bounds) {
                    Restricted::Empty => continue,
                    Restricted::Unchanged => {}
                    Restricted::Tightened(tighter) => {
                        stack.push(tighter);
                        continue;
                    }
                }
            }

            // Rounding down never leaves the budget, so it is a cheap candidate
            let floored: Vec<i64> = (0..n)
                .map(|j| clamp((x[j] + tol).floor(), &bounds, j) as i64)
                .collect();
            if program.within_budget(&as_f64(&floored), toxicity_limit) {
                incumbent.offer(program.objective_exact(&floored), floored);
            }

            let split = match x.iter().position(|&v| (v - v.round()).abs() > tol) {
                Some(j) => Some((j, x[j].floor())),
                None => {
                    let rounded: Vec<i64> = (0..n)
                        .map(|j| clamp(x[j].round(), &bounds, j) as i64)
                        .collect();
                    if program.within_budget(&as_f64(&rounded), toxicity_limit) {
                        incumbent.offer(program.objective_exact(&rounded), rounded);
                        None
                    } else {
                        // Rounding up tipped the budget: split on a dose that was rounded up
                        (0..n)
                            .find(|&j| {
                                let r = rounded[j] as f64;
                                r > x[j] && r > bounds.lower[j]
                            })
                            .map(|j| (j, rounded[j] as f64 - 1.0))
                    }
                }
            };

            if let Some((j, down)) = split {
                let mut up_child = bounds.clone();
                up_child.lower[j] = up_child.lower[j].max(down + 1.0);
                let mut down_child = bounds;
                down_child.upper[j] = Some(down_child.upper[j].map_or(down, |u| u.min(down)));
                stack.push(up_child);
                stack.push(down_child);
            }
        }

        tracing::debug!(
            "Branch-and-bound closed after {} nodes in {:.2?}, objective {}",
            nodes,
            started.elapsed(),
            incumbent.objective
        );

        Ok(Solution {
            objective: incumbent.objective as f64,
            doses: Doses::Integer(program.expand(&incumbent.doses)),
            nodes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::catalog::DrugCatalog;
    use crate::structs::effects::{DiseaseEffects, DrugEffects};
    use crate::structs::toxicity::Toxicity;
    use ndarray::array;

    fn program(
        effects: ndarray::Array2<i64>,
        disease: Vec<i64>,
        toxicity: Vec<f64>,
    ) -> DoseProgram {
        let catalog = DrugCatalog::new(effects.nrows());
        let effects = DrugEffects::from_matrix(catalog, effects).unwrap();
        let toxicity = Toxicity::new(&catalog, toxicity).unwrap();
        DoseProgram::new(&effects, &DiseaseEffects::from_vec(disease), &toxicity).unwrap()
    }

    #[test]
    fn tie_goes_to_smallest_dose() {
        // x = 1 gives [1, 0], x = 2 gives [0, 1]: both objective 1
        let program = program(array![[-1, 1]], vec![2, -1], vec![1.0]);
        let solution = BranchAndBound::default().solve(&program, 5.0).unwrap();
        assert_eq!(solution.doses.as_integer().unwrap(), &array![1]);
        assert_eq!(solution.objective, 1.0);
    }

    #[test]
    fn exact_cancellation_is_found() {
        let program = program(array![[-1, 0], [0, 2]], vec![3, -4], vec![1.0, 1.0]);
        let solution = BranchAndBound::default().solve(&program, 10.0).unwrap();
        assert_eq!(solution.doses.as_integer().unwrap(), &array![3, 2]);
        assert_eq!(solution.objective, 0.0);
    }

    #[test]
    fn budget_limits_integer_doses() {
        // Unconstrained optimum is [3, 2]; with budget 3 and costs [1, 1]
        // the best split is [2, 1] or [1, 2]: residuals [1, -2] -> 5 and [2, 0] -> 4
        let program = program(array![[-1, 0], [0, 2]], vec![3, -4], vec![1.0, 1.0]);
        let solution = BranchAndBound::default().solve(&program, 3.0).unwrap();
        assert_eq!(solution.doses.as_integer().unwrap(), &array![1, 2]);
        assert_eq!(solution.objective, 4.0);
    }

    #[test]
    fn node_limit_is_a_solver_error() {
        let options = SolverOptions {
            max_nodes: 1,
            ..SolverOptions::default()
        };
        let program = program(array![[-2, 3], [3, -1]], vec![7, -5], vec![1.0, 1.0]);
        match BranchAndBound::new(options).solve(&program, 10.0) {
            Err(DoseError::Solver { reason, .. }) => assert!(reason.contains("node limit")),
            other => panic!("expected solver error, got {other:?}"),
        }
    }

    #[test]
    fn healthy_profile_stops_at_zero_dose() {
        let program = program(
            array![[-1, 3], [1, -1], [-1, 2], [3, 0]],
            vec![0, 0],
            vec![3.75, 3.75, 4.5, 0.75],
        );
        let solution = BranchAndBound::default().solve(&program, 5.1).unwrap();
        assert_eq!(solution.doses.as_integer().unwrap(), &array![0, 0, 0, 0]);
        assert_eq!(solution.objective, 0.0);
        assert_eq!(solution.nodes, 0);
    }

    #[test]
    fn opposite_free_drugs_settle_on_smallest_dose() {
        // Drug1 and Drug2 cost nothing and cancel each other, so only their
        // difference matters: 4 is best, [4, 0] the smallest way to get it
        let program = program(
            array![[-1, -2], [1, 2], [-3, -2], [-2, -1]],
            vec![6, 6],
            vec![0.0, 0.0, 4.5, 0.75],
        );
        let solution = BranchAndBound::default().solve(&program, 0.0).unwrap();
        assert_eq!(solution.doses.as_integer().unwrap(), &array![4, 0, 0, 0]);
        assert_eq!(solution.objective, 8.0);
    }

    #[test]
    fn free_drugs_on_a_shared_protein() {
        // 2·x1 − 3·x4 = −2 cancels P1; x1 = x4 = 2 is the smallest solution
        let program = program(
            array![[2, 0], [1, 2], [-2, 2], [-3, 0]],
            vec![2, 2],
            vec![0.0, 0.75, 2.25, 0.0],
        );
        let solution = BranchAndBound::default().solve(&program, 0.0).unwrap();
        assert_eq!(solution.doses.as_integer().unwrap(), &array![2, 0, 0, 2]);
        assert_eq!(solution.objective, 4.0);
    }

    #[test]
    fn restriction_keeps_only_smaller_doses() {
        let incumbent = Incumbent {
            objective: 8,
            doses: vec![4, 0, 1],
        };
        let open = Bounds {
            lower: vec![0.0; 3],
            upper: vec![None; 3],
        };
        match incumbent.restrict(&open) {
            Restricted::Tightened(b) => {
                assert_eq!(b.upper, vec![Some(4.0), None, None]);
                assert_eq!(b.lower, vec![0.0; 3]);
            }
            other => panic!("expected a tighter node, got {other:?}"),
        }

        // Leading doses pinned to the incumbent's move the cut to the next one
        let pinned = Bounds {
            lower: vec![4.0, 0.0, 0.0],
            upper: vec![None, Some(0.0), None],
        };
        match incumbent.restrict(&pinned) {
            Restricted::Tightened(b) => {
                assert_eq!(b.upper, vec![Some(4.0), Some(0.0), Some(1.0)]);
            }
            other => panic!("expected a tighter node, got {other:?}"),
        }

        let larger = Bounds {
            lower: vec![5.0, 0.0, 0.0],
            upper: vec![None; 3],
        };
        assert_eq!(incumbent.restrict(&larger), Restricted::Empty);

        let itself = Bounds {
            lower: vec![4.0, 0.0, 1.0],
            upper: vec![Some(4.0), Some(0.0), Some(1.0)],
        };
        assert_eq!(incumbent.restrict(&itself), Restricted::Empty);

        let already = Bounds {
            lower: vec![0.0; 3],
            upper: vec![Some(3.0), None, None],
        };
        assert_eq!(incumbent.restrict(&already), Restricted::Unchanged);
    }

    #[test]
    fn time_limit_is_a_solver_error() {
        let options = SolverOptions {
            time_limit: Some(0.0),
            ..SolverOptions::default()
        };
        let program = program(array![[-2, 3], [3, -1]], vec![7, -5], vec![1.0, 1.0]);
        match BranchAndBound::new(options).solve(&program, 10.0) {
            Err(DoseError::Solver { reason, .. }) => assert!(reason.contains("time limit")),
            other => panic!("expected solver error, got {other:?}"),
        }
    }
}
