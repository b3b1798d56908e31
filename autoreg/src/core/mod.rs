//! Pure, deterministic pipeline logic.
//!
//! Nothing in this tree performs I/O or talks to a model. The design
//! validator, index bookkeeping, and result accumulators live here so they
//! can be tested in isolation.

pub mod describe;
pub mod design;
pub mod tables;
