//! The evaluation orchestrator: walks the cross-product of configured
//! prompts and dataset rows, runs each prompt, grades each response
//! with every scorer, and assembles one result record per unit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use promptlab_core::client::ChatClient;
use promptlab_core::error::{ConfigError, Result};

use crate::config::{FailurePolicy, PromptConfig};
use crate::dataset::{value_to_text, Dataset, Row};
use crate::infer::{infer_ground_truth_field, infer_input_field};
use crate::judge::JudgeScorer;
use crate::logger::{EvalLogger, Prediction, RunMeta};
use crate::prompt::PromptRunner;
use crate::record::{summarize, ResultRecord, ScoreEntry};
use crate::session::SessionState;

pub struct EvalRunner<'a> {
    client: &'a dyn ChatClient,
    logger: &'a dyn EvalLogger,
    failure_policy: FailurePolicy,
    timeout: Option<Duration>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> EvalRunner<'a> {
    pub fn new(client: &'a dyn ChatClient, logger: &'a dyn EvalLogger) -> Self {
        Self {
            client,
            logger,
            failure_policy: FailurePolicy::default(),
            timeout: None,
            cancel: None,
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Per-request timeout applied to both prompt and judge calls.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Flag checked at each unit boundary; setting it ends the run
    /// between units.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Run the evaluation. `progress` is invoked after every
    /// (prompt, example) unit with `(completed, total)`, where total
    /// counts rows × non-empty prompts; scorer calls happen inside a
    /// unit and do not affect the count.
    pub async fn run(
        &self,
        session: &SessionState,
        dataset: &Dataset,
        eval_name: &str,
        mut progress: impl FnMut(usize, usize),
    ) -> Result<Vec<ResultRecord>> {
        let guard = session.try_begin_run()?;

        // Fail fast before any external call.
        if dataset.reference.is_empty() {
            return Err(ConfigError::MissingDatasetRef.into());
        }
        let active_prompts: Vec<(usize, &PromptConfig)> = session
            .prompts
            .iter()
            .enumerate()
            .filter(|(_, prompt)| prompt.is_configured())
            .collect();
        if active_prompts.is_empty() {
            return Err(ConfigError::NoPrompts.into());
        }
        if session.scorers.is_empty() {
            return Err(ConfigError::NoScorers.into());
        }

        let fields = dataset.field_names();
        let input_field = infer_input_field(&fields).ok_or(ConfigError::NoInputField)?;
        let ground_truth_field = infer_ground_truth_field(&fields);

        let total = dataset.len() * active_prompts.len();
        info!(
            eval_name,
            dataset = %dataset.reference,
            input_field,
            ground_truth_field,
            total_units = total,
            "starting evaluation run"
        );

        self.logger
            .begin_run(&RunMeta {
                eval_name: eval_name.to_string(),
                model_tag: format!("promptlab_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S")),
                dataset_ref: dataset.reference.clone(),
            })
            .await?;

        session.clear_results();

        let mut prompt_runner = PromptRunner::new(self.client);
        if let Some(timeout) = self.timeout {
            prompt_runner = prompt_runner.with_timeout(timeout);
        }

        let mut collected = Vec::new();
        let mut completed = 0usize;
        let mut cancelled = false;

        'prompts: for &(prompt_index, prompt) in &active_prompts {
            for (example_index, row) in dataset.rows.iter().enumerate() {
                if self.is_cancelled() {
                    info!(completed, total, "evaluation run cancelled");
                    cancelled = true;
                    break 'prompts;
                }

                let input_text = extract_text(row, Some(input_field)).unwrap_or_default();
                let ground_truth = extract_text(row, ground_truth_field);

                match prompt_runner
                    .run(&prompt.text, &prompt.model, &input_text)
                    .await
                {
                    Ok(response) => {
                        let record = self
                            .score_unit(
                                session,
                                prompt,
                                prompt_index,
                                example_index,
                                input_text,
                                response,
                                ground_truth,
                            )
                            .await?;
                        session.push_result(record.clone());
                        collected.push(record);
                    }
                    Err(e) => match self.failure_policy {
                        FailurePolicy::Abort => {
                            warn!(
                                prompt_index,
                                example_index,
                                error = %e,
                                "prompt completion failed; aborting run"
                            );
                            guard.fail();
                            return Err(e);
                        }
                        FailurePolicy::Skip => {
                            warn!(
                                prompt_index,
                                example_index,
                                error = %e,
                                "prompt completion failed; skipping unit"
                            );
                        }
                    },
                }

                completed += 1;
                progress(completed, total);
            }
        }

        self.logger.log_summary(&summarize(&collected)).await?;

        info!(records = collected.len(), cancelled, "evaluation run finished");
        if cancelled {
            guard.idle();
        } else {
            guard.complete();
        }
        Ok(collected)
    }

    /// Grade one response with every configured scorer and emit the
    /// prediction through the logging collaborator. A failed judge
    /// call degrades to an absent score; it never aborts the run.
    #[allow(clippy::too_many_arguments)]
    async fn score_unit(
        &self,
        session: &SessionState,
        prompt: &PromptConfig,
        prompt_index: usize,
        example_index: usize,
        input_text: String,
        response: String,
        ground_truth: Option<String>,
    ) -> Result<ResultRecord> {
        let mut judge = JudgeScorer::new(self.client);
        if let Some(timeout) = self.timeout {
            judge = judge.with_timeout(timeout);
        }

        let prediction_id = self
            .logger
            .log_prediction(&Prediction {
                prompt: prompt.text.clone(),
                input: input_text.clone(),
                output: response.clone(),
            })
            .await?;

        let mut scores = Vec::with_capacity(session.scorers.len());
        for scorer in &session.scorers {
            let value = match judge
                .score(scorer, &input_text, &response, ground_truth.as_deref())
                .await
            {
                Ok(value) => value,
                Err(e) => {
                    warn!(
                        scorer = %scorer.name,
                        example_index,
                        error = %e,
                        "judge call failed; recording absent score"
                    );
                    None
                }
            };
            self.logger
                .log_score(prediction_id, &scorer.name, value.as_ref())
                .await?;
            scores.push(ScoreEntry {
                scorer: scorer.name.clone(),
                value,
            });
        }
        self.logger.finish_prediction(prediction_id).await?;

        Ok(ResultRecord {
            prompt_index,
            example_index,
            input: input_text,
            response,
            scores,
            ground_truth,
        })
    }
}

/// Pull a field out of a row as display text. JSON nulls and empty
/// strings count as "not provided".
fn extract_text(row: &Row, field: Option<&str>) -> Option<String> {
    field
        .and_then(|name| row.get(name))
        .filter(|value| !value.is_null())
        .map(value_to_text)
        .filter(|text| !text.is_empty())
}
