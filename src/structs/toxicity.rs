use ndarray::Array1;
use serde::Serialize;

use crate::error::{DoseError, Result};
use crate::structs::catalog::DrugCatalog;

/// Per-unit-dose toxicity cost of every catalog drug.
///
/// Construction validates that there is one finite, non-negative cost per drug,
/// which is what keeps the zero dose feasible for every non-negative budget.
#[derive(Debug, Clone, PartialEq)]
pub struct Toxicity {
    costs: Array1<f64>,
}

impl Toxicity {
    pub fn new(catalog: &DrugCatalog, costs: Vec<f64>) -> Result<Self> {
        if costs.len() != catalog.len() {
            return Err(DoseError::DimensionMismatch {
                what: "toxicity costs vs drug catalog",
                expected: catalog.len(),
                found: costs.len(),
            });
        }
        for (drug, &value) in catalog.iter().zip(costs.iter()) {
            if !value.is_finite() || value < 0.0 {
                return Err(DoseError::InvalidToxicity {
                    drug: drug.to_string(),
                    value,
                });
            }
        }
        Ok(Self {
            costs: Array1::from(costs),
        })
    }

    /// Costs `1, 2, ..., D`: later catalog drugs are more toxic.
    pub fn ascending(catalog: &DrugCatalog) -> Self {
        Self {
            costs: Array1::from_iter((1..=catalog.len()).map(|c| c as f64)),
        }
    }

    pub fn costs(&self) -> &Array1<f64> {
        &self.costs
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.costs.to_vec()
    }
}

impl Serialize for Toxicity {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_vec().serialize(serializer)
    }
}
