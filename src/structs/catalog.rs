use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Number of drugs in the catalog when nothing else is configured.
pub const DEFAULT_CATALOG_SIZE: usize = 10;

const DRUG_PREFIX: &str = "Drug";

/// Position of a drug in the catalog, `0..catalog.len()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DrugId(usize);

impl DrugId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for DrugId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", DRUG_PREFIX, self.0 + 1)
    }
}

/// The fixed set of candidate drugs, named `Drug1` through `DrugD`.
///
/// Drug identity is never inferred from input data: every drug name read from a
/// table is resolved against this catalog, and the catalog order is the order in
/// which doses are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrugCatalog {
    size: usize,
}

impl Default for DrugCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_CATALOG_SIZE)
    }
}

impl DrugCatalog {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Resolve a drug name such as `Drug3`. Returns `None` outside the catalog.
    ///
    /// Only the canonical spelling is accepted: no leading zeros, no `Drug0`.
    pub fn lookup(&self, name: &str) -> Option<DrugId> {
        let digits = name.strip_prefix(DRUG_PREFIX)?;
        if digits.is_empty()
            || digits.starts_with('0')
            || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        let number: usize = digits.parse().ok()?;
        (number >= 1 && number <= self.size).then(|| DrugId(number - 1))
    }

    pub fn id(&self, index: usize) -> Option<DrugId> {
        (index < self.size).then_some(DrugId(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = DrugId> {
        (0..self.size).map(DrugId)
    }

    pub fn names(&self) -> Vec<String> {
        self.iter().map(|id| id.to_string()).collect()
    }
}
