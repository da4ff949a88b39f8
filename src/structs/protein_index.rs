use std::collections::HashMap;

/// Bijective mapping from protein identifier to a dense position in `0..len()`.
///
/// Positions are handed out in first-seen order while the disease table is read.
/// Once built the index is immutable and every downstream structure is aligned to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProteinIndex {
    positions: HashMap<String, usize>,
    names: Vec<String>,
}

impl ProteinIndex {
    /// Returns the position of `protein`, assigning the next free one if it is new.
    /// The boolean is `true` when the protein was already present.
    pub(crate) fn insert(&mut self, protein: &str) -> (usize, bool) {
        if let Some(&position) = self.positions.get(protein) {
            return (position, true);
        }
        let position = self.names.len();
        self.positions.insert(protein.to_owned(), position);
        self.names.push(protein.to_owned());
        (position, false)
    }

    pub fn get(&self, protein: &str) -> Option<usize> {
        self.positions.get(protein).copied()
    }

    pub fn name(&self, position: usize) -> Option<&str> {
        self.names.get(position).map(String::as_str)
    }

    /// Protein identifiers in index order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ProteinIndex {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut index = ProteinIndex::default();
        for protein in iter {
            index.insert(protein.as_ref());
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_seen_order_and_dense_positions() {
        let index: ProteinIndex = ["P3", "P1", "P3", "P2"].into_iter().collect();
        assert_eq!(index.len(), 3);
        assert_eq!(index.get("P3"), Some(0));
        assert_eq!(index.get("P1"), Some(1));
        assert_eq!(index.get("P2"), Some(2));
        assert_eq!(index.get("P4"), None);
        assert_eq!(index.names(), &["P3", "P1", "P2"]);
        assert_eq!(index.name(1), Some("P1"));
    }

    #[test]
    fn insert_reports_duplicates() {
        let mut index = ProteinIndex::default();
        assert_eq!(index.insert("A"), (0, false));
        assert_eq!(index.insert("B"), (1, false));
        assert_eq!(index.insert("A"), (0, true));
    }
}
