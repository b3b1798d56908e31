//! Panel regression engine and specification expansion.

pub mod fit;
pub mod panel;
pub mod run;
pub mod spec;

pub use fit::{EffectSpec, FitResult};
pub use panel::PanelData;
pub use run::{RegressionKind, RegressionResult, run_regressions};
pub use spec::{RegressionSpec, ResearchConfig};
