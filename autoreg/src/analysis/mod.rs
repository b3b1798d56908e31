//! Model-driven reporting: table design, table rendering, prose analysis,
//! and table combination.

pub mod combine;
pub mod design;
pub mod render;

pub use combine::combine_tables;
pub use design::design_tables;
pub use render::{analyze_tables, draw_tables};
