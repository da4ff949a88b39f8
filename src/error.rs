//! Error taxonomy shared by the effect-model builder and the dose optimizer.

/// Main error type
#[derive(thiserror::Error, Debug)]
pub enum DoseError {
    /// A required field is missing, non-numeric or otherwise unusable.
    #[error("malformed {table} table at line {line}: field `{field}` {reason}")]
    MalformedInput {
        /// Which input table the record came from.
        table: &'static str,
        /// 1-based line number in the source, header included.
        line: u64,
        /// Column that failed.
        field: String,
        /// What was wrong with it.
        reason: String,
    },
    /// A drug-effect row names a drug outside the fixed catalog.
    #[error("unknown drug `{drug}` at line {line} (catalog is Drug1..Drug{catalog_size})")]
    UnknownDrug {
        drug: String,
        line: u64,
        catalog_size: usize,
    },
    /// A drug-effect row names a protein absent from the disease table.
    /// Only raised under [`UnknownProteinPolicy::Reject`](crate::routines::data::UnknownProteinPolicy).
    #[error("drug `{drug}` references unknown protein `{protein}` at line {line}")]
    UnknownProtein {
        protein: String,
        drug: String,
        line: u64,
    },
    /// A per-unit toxicity cost is negative or not finite.
    #[error("toxicity cost for {drug} must be finite and non-negative, got {value}")]
    InvalidToxicity { drug: String, value: f64 },
    /// Two structures that must be aligned have different lengths.
    #[error("{what}: expected length {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// No non-negative dose vector fits under the toxicity limit.
    #[error("no dose vector satisfies toxicity limit {toxicity_limit}")]
    Infeasible { toxicity_limit: f64 },
    /// The solver did not reach a definitive status.
    #[error("solver failed at toxicity limit {toxicity_limit}: {reason}")]
    Solver { toxicity_limit: f64, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl DoseError {
    /// True for the errors that are scoped to a single sweep entry.
    pub fn is_per_limit(&self) -> bool {
        matches!(self, DoseError::Infeasible { .. } | DoseError::Solver { .. })
    }
}

/// Main result type
pub type Result<T> = std::result::Result<T, DoseError>;
