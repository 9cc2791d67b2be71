use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use promptlab_eval::prelude::{FailurePolicy, PromptConfig, ScorerConfig};

/// Maximum number of prompt slots per run.
pub const MAX_PROMPTS: usize = 5;

/// A TOML run definition: dataset reference, prompt slots, scorers,
/// and run options.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Name identifying this run in logs; generated from the clock
    /// when omitted.
    #[serde(default)]
    pub eval_name: Option<String>,

    /// Dataset reference, resolved against the dataset directory.
    pub dataset: String,

    pub prompts: Vec<PromptConfig>,

    pub scorers: Vec<ScorerConfig>,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Per-request timeout for prompt and judge calls.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Where to write the full results as pretty JSON.
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Where to append the JSONL prediction log. Without it,
    /// predictions are logged as tracing events only.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: RunConfig = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.prompts.is_empty() || self.prompts.len() > MAX_PROMPTS {
            bail!(
                "between 1 and {MAX_PROMPTS} prompts must be configured, got {}",
                self.prompts.len()
            );
        }
        let mut names = HashSet::new();
        for scorer in &self.scorers {
            if !names.insert(scorer.name.as_str()) {
                bail!("duplicate scorer name: {}", scorer.name);
            }
        }
        Ok(())
    }
}
