//! Toxicity-constrained drug dose allocation.
//!
//! Given how a disease shifts protein intensities and how each drug of a small
//! catalog shifts the same proteins, find the dose combination that best
//! restores the healthy state while keeping the summed toxicity under a budget.
//!
//! The crate is organised in three layers:
//!
//! - [`structs`]: the aligned effect model (protein index, catalog, effect vectors and matrix);
//! - [`routines`]: reading the two CSV tables, settings, logging and output files;
//! - [`dosing`]: the quadratic program and its integer and continuous solvers.
//!
//! [`entrypoints::run`] ties them together for a complete run.

pub mod dosing;
pub mod entrypoints;
pub mod error;
pub mod routines;
pub mod structs;

pub mod prelude {
    pub use crate::dosing::{
        select_solver, solve, sweep, BranchAndBound, ClarabelSolver, DoseMode, DoseProblem,
        DoseProgram, Doses, OptimizationResult, QuadraticProgramSolver, Solution, SolverOptions,
        SweepEntry,
    };
    pub use crate::entrypoints::run;
    pub use crate::error::DoseError;
    pub use crate::routines::data::{
        build_disease_effects, build_drug_effects, read_disease_file, read_disease_table,
        read_drug_file, read_drug_table, DrugEffectRecord, ProteinMeasurement,
        UnknownProteinPolicy,
    };
    pub use crate::routines::logger::setup_log;
    pub use crate::routines::output::SweepResult;
    pub use crate::routines::settings::Settings;
    pub use crate::structs::{
        catalog::{DrugCatalog, DrugId},
        effects::{DiseaseEffects, DrugEffects},
        protein_index::ProteinIndex,
        toxicity::Toxicity,
    };
}
