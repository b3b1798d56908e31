//! Typed error taxonomy for the pipeline.
//!
//! Fatal classes ([`DataIntegrityError`], configuration problems) abort the
//! run with enough context to diagnose without re-running. Recoverable
//! classes degrade gracefully: an invalid design is retried a bounded number
//! of times, an exhausted render substitutes an empty placeholder, and a
//! failed output format is skipped while the others proceed.

use thiserror::Error;

use crate::core::design::DesignViolation;

/// The three parallel result vectors diverged in length. Fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "result table arrays diverged: tables={tables}, descriptions={descriptions}, analyses={analyses}"
)]
pub struct DataIntegrityError {
    pub tables: usize,
    pub descriptions: usize,
    pub analyses: usize,
}

/// Top-level pipeline failures surfaced to the caller.
#[derive(Debug, Error)]
pub enum AutoRegError {
    /// Malformed or incomplete research configuration, or a named variable
    /// missing from the dataset. Surfaced before any regression runs.
    #[error("research configuration invalid: {0}")]
    Configuration(String),

    /// No acceptable table design after the bounded retry budget.
    #[error("no valid table design after {attempts} attempts (last failure: {last})")]
    DesignInvalid { attempts: u32, last: String },

    /// Parallel result arrays diverged.
    #[error(transparent)]
    DataIntegrity(#[from] DataIntegrityError),
}

impl AutoRegError {
    pub fn design_invalid(attempts: u32, violation: &DesignViolation) -> Self {
        Self::DesignInvalid {
            attempts,
            last: violation.to_string(),
        }
    }
}
