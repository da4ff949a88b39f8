pub mod catalog;
pub mod effects;
pub mod protein_index;
pub mod toxicity;
