use ndarray::{Array1, Array2, ArrayView1};

use crate::error::{DoseError, Result};
use crate::structs::catalog::{DrugCatalog, DrugId};

/// Per-protein deviation of the diseased state from the healthy one (diseased − healthy).
///
/// Entry `i` belongs to the protein at position `i` of the
/// [`ProteinIndex`](crate::structs::protein_index::ProteinIndex) it was built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiseaseEffects {
    effects: Array1<i64>,
}

impl DiseaseEffects {
    pub fn new(effects: Array1<i64>) -> Self {
        Self { effects }
    }

    pub fn from_vec(effects: Vec<i64>) -> Self {
        Self::new(Array1::from(effects))
    }

    pub fn vector(&self) -> &Array1<i64> {
        &self.effects
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Objective value of the zero dose: the squared norm of the vector.
    pub fn squared_norm(&self) -> i128 {
        self.effects.iter().map(|&e| (e as i128) * (e as i128)).sum()
    }
}

/// Effect of one unit dose of each catalog drug on each protein, `D × P`.
///
/// Rows follow the [`DrugCatalog`] order, columns follow the protein index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrugEffects {
    catalog: DrugCatalog,
    matrix: Array2<i64>,
}

impl DrugEffects {
    /// All-zero matrix for `catalog` over `n_proteins` proteins.
    pub fn zeros(catalog: DrugCatalog, n_proteins: usize) -> Self {
        Self {
            catalog,
            matrix: Array2::zeros((catalog.len(), n_proteins)),
        }
    }

    /// Wrap an existing matrix. The row count must match the catalog.
    pub fn from_matrix(catalog: DrugCatalog, matrix: Array2<i64>) -> Result<Self> {
        if matrix.nrows() != catalog.len() {
            return Err(DoseError::DimensionMismatch {
                what: "drug effect rows vs drug catalog",
                expected: catalog.len(),
                found: matrix.nrows(),
            });
        }
        Ok(Self { catalog, matrix })
    }

    pub(crate) fn set(&mut self, drug: DrugId, protein: usize, effect: i64) {
        self.matrix[[drug.index(), protein]] = effect;
    }

    pub fn catalog(&self) -> &DrugCatalog {
        &self.catalog
    }

    pub fn matrix(&self) -> &Array2<i64> {
        &self.matrix
    }

    pub fn row(&self, drug: DrugId) -> ArrayView1<'_, i64> {
        self.matrix.row(drug.index())
    }

    pub fn n_drugs(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn n_proteins(&self) -> usize {
        self.matrix.ncols()
    }

    /// Drugs whose row is entirely zero. They can never move the objective.
    pub fn inert_drugs(&self) -> Vec<DrugId> {
        self.catalog
            .iter()
            .filter(|&drug| self.row(drug).iter().all(|&e| e == 0))
            .collect()
    }

    /// Fails unless the column count matches the disease vector.
    pub fn check_aligned(&self, disease: &DiseaseEffects) -> Result<()> {
        if self.n_proteins() != disease.len() {
            return Err(DoseError::DimensionMismatch {
                what: "drug effect columns vs disease effects",
                expected: disease.len(),
                found: self.n_proteins(),
            });
        }
        Ok(())
    }
}
