//! Input tables and the effect-model builder.
//!
//! Two CSV tables feed the optimizer:
//!
//! - the disease-effect table, columns `Protein`, `Healthy`, `Diseased`;
//! - the drug-effect table, columns `Drug`, `Protein`, `Effect`.
//!
//! The readers in this module only turn rows into typed records and report
//! fields that are not integers. Resolving identifiers and building the aligned
//! numeric structures happens in [`builder`].

pub mod builder;

pub use builder::{build_disease_effects, build_drug_effects, UnknownProteinPolicy};

use csv::{ReaderBuilder, StringRecord, Trim};
use serde_derive::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{DoseError, Result};

pub(crate) const DISEASE_TABLE: &str = "disease-effect";
pub(crate) const DRUG_TABLE: &str = "drug-effect";

/// One row of the disease-effect table.
///
/// Measurements are optional at this stage so that a missing value is reported
/// by the builder together with the protein it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProteinMeasurement {
    pub protein: String,
    pub healthy: Option<i64>,
    pub diseased: Option<i64>,
    /// Line in the source table, 0 for records built in memory.
    pub line: u64,
}

impl ProteinMeasurement {
    pub fn new(protein: impl Into<String>, healthy: i64, diseased: i64) -> Self {
        Self {
            protein: protein.into(),
            healthy: Some(healthy),
            diseased: Some(diseased),
            line: 0,
        }
    }
}

/// One row of the drug-effect table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrugEffectRecord {
    pub drug: String,
    pub protein: String,
    pub effect: i64,
    pub line: u64,
}

impl DrugEffectRecord {
    pub fn new(drug: impl Into<String>, protein: impl Into<String>, effect: i64) -> Self {
        Self {
            drug: drug.into(),
            protein: protein.into(),
            effect,
            line: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawMeasurement {
    #[serde(rename = "Protein")]
    protein: Option<String>,
    #[serde(rename = "Healthy")]
    healthy: Option<String>,
    #[serde(rename = "Diseased")]
    diseased: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDrugEffect {
    #[serde(rename = "Drug")]
    drug: Option<String>,
    #[serde(rename = "Protein")]
    protein: Option<String>,
    #[serde(rename = "Effect")]
    effect: Option<String>,
}

/// Read the disease-effect table from any reader.
pub fn read_disease_table<R: Read>(reader: R) -> Result<Vec<ProteinMeasurement>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let line = line_of(&row);
        let raw: RawMeasurement = row.deserialize(Some(&headers))?;
        records.push(ProteinMeasurement {
            protein: required(DISEASE_TABLE, line, "Protein", raw.protein)?,
            healthy: optional_integer(DISEASE_TABLE, line, "Healthy", raw.healthy)?,
            diseased: optional_integer(DISEASE_TABLE, line, "Diseased", raw.diseased)?,
            line,
        });
    }
    tracing::debug!("Read {} rows from the {} table", records.len(), DISEASE_TABLE);
    Ok(records)
}

/// Read the drug-effect table from any reader.
pub fn read_drug_table<R: Read>(reader: R) -> Result<Vec<DrugEffectRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let line = line_of(&row);
        let raw: RawDrugEffect = row.deserialize(Some(&headers))?;
        let effect = optional_integer(DRUG_TABLE, line, "Effect", raw.effect)?;
        records.push(DrugEffectRecord {
            drug: required(DRUG_TABLE, line, "Drug", raw.drug)?,
            protein: required(DRUG_TABLE, line, "Protein", raw.protein)?,
            effect: effect.ok_or_else(|| missing(DRUG_TABLE, line, "Effect"))?,
            line,
        });
    }
    tracing::debug!("Read {} rows from the {} table", records.len(), DRUG_TABLE);
    Ok(records)
}

pub fn read_disease_file(path: impl AsRef<Path>) -> Result<Vec<ProteinMeasurement>> {
    read_disease_table(File::open(path)?)
}

pub fn read_drug_file(path: impl AsRef<Path>) -> Result<Vec<DrugEffectRecord>> {
    read_drug_table(File::open(path)?)
}

fn line_of(row: &StringRecord) -> u64 {
    row.position().map(|p| p.line()).unwrap_or(0)
}

pub(crate) fn missing(table: &'static str, line: u64, field: &str) -> DoseError {
    DoseError::MalformedInput {
        table,
        line,
        field: field.to_owned(),
        reason: "is missing".to_owned(),
    }
}

fn required(table: &'static str, line: u64, field: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(missing(table, line, field)),
    }
}

/// Empty cells become `None`; anything else must be an integer.
/// Integral decimals such as `12.0` are accepted since spreadsheets like to write them.
fn optional_integer(
    table: &'static str,
    line: u64,
    field: &str,
    value: Option<String>,
) -> Result<Option<i64>> {
    let text = match value {
        Some(v) if !v.is_empty() => v,
        _ => return Ok(None),
    };
    if let Ok(parsed) = text.parse::<i64>() {
        return Ok(Some(parsed));
    }
    match text.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() && parsed.fract() == 0.0 && parsed.abs() < 9.0e15 => {
            Ok(Some(parsed as i64))
        }
        _ => Err(DoseError::MalformedInput {
            table,
            line,
            field: field.to_owned(),
            reason: format!("`{text}` is not an integer"),
        }),
    }
}
