pub mod config;
pub mod dataset;
pub mod infer;
pub mod judge;
pub mod logger;
pub mod prompt;
pub mod record;
pub mod runner;
pub mod session;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{
        FailurePolicy, PromptConfig, ScoreKind, ScorerConfig, DEFAULT_JUDGE_MODEL,
    };
    pub use crate::dataset::{Dataset, DatasetSource, InMemorySource, JsonFileSource, Row};
    pub use crate::infer::{infer_ground_truth_field, infer_input_field};
    pub use crate::judge::{JudgeScorer, ScoreValue};
    pub use crate::logger::{EvalLogger, JsonlLogger, NoopLogger, TracingLogger};
    pub use crate::prompt::PromptRunner;
    pub use crate::record::{summarize, ResultRecord, ScoreEntry, ScoreSummary};
    pub use crate::runner::EvalRunner;
    pub use crate::session::{RunState, SessionState};
}
