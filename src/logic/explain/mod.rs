//! Decision explanation: permutation attribution and driver formatting.

pub mod engine;
pub mod format;
pub mod types;

pub use engine::{ExplainerConfig, PermutationExplainer};
pub use format::{format_drivers, render_label, DEFAULT_TOP_K};
pub use types::{Driver, DriverEffect};
