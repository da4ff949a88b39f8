use csv::WriterBuilder;
use eyre::{Result, WrapErr};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::dosing::types::{DoseMode, SweepEntry};
use crate::structs::catalog::DrugCatalog;

/// Defines the result of a toxicity sweep
/// A [SweepResult] holds one entry per toxicity limit, in the order the limits were given
#[derive(Debug)]
pub struct SweepResult {
    pub catalog: DrugCatalog,
    pub mode: DoseMode,
    pub entries: Vec<SweepEntry>,
}

impl SweepResult {
    pub fn new(catalog: DrugCatalog, mode: DoseMode, entries: Vec<SweepEntry>) -> Self {
        Self {
            catalog,
            mode,
            entries,
        }
    }

    pub fn n_failed(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_ok()).count()
    }

    /// Writes sweep.csv, one row per toxicity limit
    /// Columns are the limit, `optimal` or the error, the objective and one dose column per drug
    pub fn write_sweep(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join("sweep.csv");
        let file = File::create(&path)
            .wrap_err_with(|| format!("could not create {}", path.display()))?;
        let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

        // Create the headers
        let mut header = vec![
            "toxicity_limit".to_string(),
            "status".to_string(),
            "objective".to_string(),
        ];
        header.extend(self.catalog.names());
        writer.write_record(&header)?;

        // Write contents
        for entry in &self.entries {
            let mut row = vec![entry.toxicity_limit.to_string()];
            match &entry.outcome {
                Ok(result) => {
                    row.push("optimal".to_string());
                    row.push(result.objective.to_string());
                    row.extend((0..result.doses.len()).map(|i| result.doses.format_at(i)));
                }
                Err(err) => {
                    row.push(err.to_string());
                    row.push(String::new());
                    row.extend(self.catalog.iter().map(|_| String::new()));
                }
            }
            writer.write_record(&row)?;
        }
        writer.flush()?;
        tracing::info!("Sweep written to {}", path.display());
        Ok(path)
    }
}

impl fmt::Display for SweepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Drugs ({} doses): {}", self.mode, self.catalog.names().join(" "))?;
        for entry in &self.entries {
            writeln!(f, "Toxicity limit: {}", entry.toxicity_limit)?;
            match &entry.outcome {
                Ok(result) => {
                    writeln!(f, "Optimal objective value: {}", result.objective)?;
                    writeln!(f, "Optimal doses: {}", result.doses)?;
                }
                Err(err) => writeln!(f, "Failed: {err}")?,
            }
        }
        Ok(())
    }
}
