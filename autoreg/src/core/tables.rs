//! Accumulator for rendered tables, descriptions, and analyses.
//!
//! The three vectors are parallel and must stay the same length through both
//! lifecycle phases: first one entry per regression result, then (after
//! combination) one entry per design group. Divergence is a
//! [`DataIntegrityError`], never silently tolerated.

use crate::error::DataIntegrityError;

/// Placeholder artifact for a slot whose render/analysis did not run or
/// exhausted its retries. A real-but-empty value rather than an option so
/// the length invariant stays checkable.
pub const EMPTY_ARTIFACT: &str = "";

/// Rendered LaTeX tables with their descriptions and prose analyses,
/// addressed by a shared index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultTables {
    pub tables: Vec<String>,
    pub descriptions: Vec<String>,
    pub analyses: Vec<String>,
}

impl ResultTables {
    /// Build from parallel vectors, enforcing equal lengths up front.
    pub fn new(
        tables: Vec<String>,
        descriptions: Vec<String>,
        analyses: Vec<String>,
    ) -> Result<Self, DataIntegrityError> {
        let this = Self {
            tables,
            descriptions,
            analyses,
        };
        this.check_consistent()?;
        Ok(this)
    }

    /// Number of table slots.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Fail if the parallel vectors have diverged.
    pub fn check_consistent(&self) -> Result<(), DataIntegrityError> {
        if self.tables.len() != self.descriptions.len()
            || self.tables.len() != self.analyses.len()
        {
            return Err(DataIntegrityError {
                tables: self.tables.len(),
                descriptions: self.descriptions.len(),
                analyses: self.analyses.len(),
            });
        }
        Ok(())
    }

    /// Tables at the given result indices, in the given order.
    pub fn tables_at(&self, indices: &[usize]) -> Vec<&str> {
        indices
            .iter()
            .filter_map(|&i| self.tables.get(i).map(String::as_str))
            .collect()
    }

    /// Analyses at the given result indices joined into one passage.
    pub fn joined_analysis(&self, indices: &[usize]) -> String {
        indices
            .iter()
            .filter_map(|&i| self.analyses.get(i).map(String::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Iterate `(table, description, analysis)` triples for document assembly.
    pub fn iter_triples(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.tables
            .iter()
            .zip(&self.descriptions)
            .zip(&self.analyses)
            .map(|((table, description), analysis)| {
                (table.as_str(), description.as_str(), analysis.as_str())
            })
    }
}
