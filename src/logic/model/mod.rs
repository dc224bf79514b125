//! Model layer: frozen preprocessing, the decision forest, artifact
//! persistence and the assembled scoring service.

pub mod artifact;
pub mod forest;
pub mod pipeline;
pub mod preprocess;
pub mod threshold;

pub use artifact::{ModelArtifact, ModelError, ARTIFACT_VERSION};
pub use forest::{DecisionTree, RandomForest, TreeNode};
pub use pipeline::{ScoreOutcome, ScoringService};
pub use preprocess::{CategoryMap, NumericStats, Preprocessor};
pub use threshold::{Decision, DecisionPolicy, APPROVAL_THRESHOLD};
