//! Effect-model builder: aligns both input tables to one protein index.

use serde_derive::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DoseError, Result};
use crate::routines::data::{DrugEffectRecord, ProteinMeasurement, DISEASE_TABLE};
use crate::structs::catalog::DrugCatalog;
use crate::structs::effects::{DiseaseEffects, DrugEffects};
use crate::structs::protein_index::ProteinIndex;

/// What to do with a drug-effect row whose protein is not in the disease table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownProteinPolicy {
    /// Skip the row and log it. Extra reference data in the drug table is tolerated.
    #[default]
    Drop,
    /// Fail with [`DoseError::UnknownProtein`].
    Reject,
}

impl fmt::Display for UnknownProteinPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownProteinPolicy::Drop => write!(f, "drop"),
            UnknownProteinPolicy::Reject => write!(f, "reject"),
        }
    }
}

/// Build the disease-effect vector and the protein index from the disease table.
///
/// Every distinct protein receives exactly one index, in first-seen order. When a
/// protein appears more than once its last row's measurements win.
pub fn build_disease_effects(
    records: &[ProteinMeasurement],
) -> Result<(DiseaseEffects, ProteinIndex)> {
    let mut index = ProteinIndex::default();
    let mut effects: Vec<i64> = Vec::with_capacity(records.len());

    for record in records {
        let healthy = record
            .healthy
            .ok_or_else(|| missing_measurement(record, "Healthy"))?;
        let diseased = record
            .diseased
            .ok_or_else(|| missing_measurement(record, "Diseased"))?;
        let difference = diseased
            .checked_sub(healthy)
            .ok_or_else(|| DoseError::MalformedInput {
                table: DISEASE_TABLE,
                line: record.line,
                field: "Diseased".to_owned(),
                reason: format!("difference for protein `{}` overflows", record.protein),
            })?;

        let (position, seen) = index.insert(&record.protein);
        if seen {
            tracing::warn!(
                "Protein {} listed more than once (line {}), keeping the last measurement",
                record.protein,
                record.line
            );
            effects[position] = difference;
        } else {
            effects.push(difference);
        }
    }

    tracing::info!("Disease effects built for {} proteins", index.len());
    Ok((DiseaseEffects::from_vec(effects), index))
}

/// Build the `D × P` drug-effect matrix aligned to `index`.
///
/// The matrix starts at zero and every matching row writes its entry; a repeated
/// (drug, protein) pair overwrites rather than accumulates. Drugs are resolved
/// against `catalog` and an unknown drug always fails. Unknown proteins follow
/// `policy`.
pub fn build_drug_effects(
    records: &[DrugEffectRecord],
    index: &ProteinIndex,
    catalog: &DrugCatalog,
    policy: UnknownProteinPolicy,
) -> Result<DrugEffects> {
    let mut effects = DrugEffects::zeros(*catalog, index.len());
    let mut dropped = 0usize;

    for record in records {
        let drug = catalog
            .lookup(&record.drug)
            .ok_or_else(|| DoseError::UnknownDrug {
                drug: record.drug.clone(),
                line: record.line,
                catalog_size: catalog.len(),
            })?;

        let Some(protein) = index.get(&record.protein) else {
            match policy {
                UnknownProteinPolicy::Drop => {
                    tracing::warn!(
                        "Dropping line {}: protein {} for {} is not in the disease table",
                        record.line,
                        record.protein,
                        record.drug
                    );
                    dropped += 1;
                    continue;
                }
                UnknownProteinPolicy::Reject => {
                    return Err(DoseError::UnknownProtein {
                        protein: record.protein.clone(),
                        drug: record.drug.clone(),
                        line: record.line,
                    })
                }
            }
        };

        effects.set(drug, protein, record.effect);
    }

    tracing::info!(
        "Drug effects built: {} drugs x {} proteins ({} rows dropped)",
        effects.n_drugs(),
        effects.n_proteins(),
        dropped
    );
    Ok(effects)
}

fn missing_measurement(record: &ProteinMeasurement, field: &str) -> DoseError {
    DoseError::MalformedInput {
        table: DISEASE_TABLE,
        line: record.line,
        field: field.to_owned(),
        reason: format!("is missing for protein `{}`", record.protein),
    }
}
