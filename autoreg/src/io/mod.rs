//! Side-effecting edges of the pipeline: configuration files, the dataset,
//! child processes, and document emission.

pub mod dataset;
pub mod document;
pub mod process;
pub mod research;
pub mod select;
pub mod settings;
