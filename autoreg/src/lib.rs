//! Automated panel-regression reporting pipeline.
//!
//! Runs a battery of fixed-effects panel regressions from a declarative
//! research configuration, asks a chat model to design and typeset the
//! result tables, and emits the finished report as LaTeX, Word, or PDF.
//! The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (design validation, description
//!   headers, result-table invariants). No I/O, fully testable in isolation.
//! - **[`regress`]**: The econometrics engine (within estimator, 2SLS,
//!   subsample splits). Deterministic given a dataset.
//! - **[`llm`]** / **[`analysis`]**: Model access and the model-driven
//!   reporting passes, behind the [`llm::ChatModel`] trait so tests script
//!   responses.
//! - **[`io`]**: Side-effecting operations (configuration files, CSV
//!   loading, document conversion subprocesses).
//!
//! [`pipeline`] coordinates all of the above to implement the CLI commands.

pub mod analysis;
pub mod core;
pub mod error;
pub mod io;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod regress;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
