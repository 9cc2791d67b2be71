use serde::{Deserialize, Serialize};

/// Judge model used when a scorer does not name one.
pub const DEFAULT_JUDGE_MODEL: &str = "gpt-4o-mini";

/// Numeric scale used when a numeric scorer does not name one.
pub const DEFAULT_NUMERIC_SCALE: &str = "1-10";

/// One configured prompt slot: system prompt text plus the model that
/// generates responses for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptConfig {
    pub text: String,
    pub model: String,
}

impl PromptConfig {
    pub fn new(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
        }
    }

    /// A slot with empty text is unused and skipped by the orchestrator.
    pub fn is_configured(&self) -> bool {
        !self.text.is_empty()
    }
}

/// Declared output type of a scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreKind {
    Numeric,
    Boolean,
    Text,
}

/// An LLM-as-judge criterion: name, criterion text, output type, judge
/// model, and the type-specific knobs (scale for numeric, invert for
/// boolean).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorerConfig {
    pub name: String,
    pub criterion: String,
    pub output: ScoreKind,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub scale: Option<String>,
    #[serde(default)]
    pub invert: bool,
}

impl ScorerConfig {
    pub fn new(name: impl Into<String>, criterion: impl Into<String>, output: ScoreKind) -> Self {
        Self {
            name: name.into(),
            criterion: criterion.into(),
            output,
            model: None,
            scale: None,
            invert: false,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_scale(mut self, scale: impl Into<String>) -> Self {
        self.scale = Some(scale.into());
        self
    }

    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    pub fn judge_model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_JUDGE_MODEL)
    }
}

/// What the orchestrator does when a prompt completion fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the run on the first failure.
    #[default]
    Abort,
    /// Log the failure, skip the unit, and keep going.
    Skip,
}
