//! Prediction logging: the observability collaborator the orchestrator
//! reports into. The only contract is call ordering: begin run →
//! N × (prediction → scores → finish) → summary.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use promptlab_core::error::{LabError, Result};

use crate::judge::ScoreValue;
use crate::record::ScoreSummary;

/// Identifies one logged prediction within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PredictionId(Uuid);

impl PredictionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PredictionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PredictionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Session-level metadata logged once at run start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub eval_name: String,
    pub model_tag: String,
    pub dataset_ref: String,
}

/// The inputs and output of one prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub prompt: String,
    pub input: String,
    pub output: String,
}

/// Capability trait for the run/prediction logging collaborator.
#[async_trait]
pub trait EvalLogger: Send + Sync {
    async fn begin_run(&self, meta: &RunMeta) -> Result<()>;

    async fn log_prediction(&self, prediction: &Prediction) -> Result<PredictionId>;

    async fn log_score(
        &self,
        prediction: PredictionId,
        scorer: &str,
        value: Option<&ScoreValue>,
    ) -> Result<()>;

    async fn finish_prediction(&self, prediction: PredictionId) -> Result<()>;

    async fn log_summary(&self, summary: &[(String, ScoreSummary)]) -> Result<()>;
}

/// Drops everything. Used in tests and when logging is disabled.
#[derive(Debug, Default)]
pub struct NoopLogger;

#[async_trait]
impl EvalLogger for NoopLogger {
    async fn begin_run(&self, _meta: &RunMeta) -> Result<()> {
        Ok(())
    }

    async fn log_prediction(&self, _prediction: &Prediction) -> Result<PredictionId> {
        Ok(PredictionId::new())
    }

    async fn log_score(
        &self,
        _prediction: PredictionId,
        _scorer: &str,
        _value: Option<&ScoreValue>,
    ) -> Result<()> {
        Ok(())
    }

    async fn finish_prediction(&self, _prediction: PredictionId) -> Result<()> {
        Ok(())
    }

    async fn log_summary(&self, _summary: &[(String, ScoreSummary)]) -> Result<()> {
        Ok(())
    }
}

/// Emits structured `tracing` events.
#[derive(Debug, Default)]
pub struct TracingLogger;

#[async_trait]
impl EvalLogger for TracingLogger {
    async fn begin_run(&self, meta: &RunMeta) -> Result<()> {
        tracing::info!(
            eval_name = %meta.eval_name,
            model = %meta.model_tag,
            dataset = %meta.dataset_ref,
            "evaluation run started"
        );
        Ok(())
    }

    async fn log_prediction(&self, prediction: &Prediction) -> Result<PredictionId> {
        let id = PredictionId::new();
        tracing::info!(prediction = %id, input = %prediction.input, "prediction logged");
        Ok(id)
    }

    async fn log_score(
        &self,
        prediction: PredictionId,
        scorer: &str,
        value: Option<&ScoreValue>,
    ) -> Result<()> {
        tracing::info!(prediction = %prediction, scorer, value = ?value, "score logged");
        Ok(())
    }

    async fn finish_prediction(&self, prediction: PredictionId) -> Result<()> {
        tracing::debug!(prediction = %prediction, "prediction finished");
        Ok(())
    }

    async fn log_summary(&self, summary: &[(String, ScoreSummary)]) -> Result<()> {
        tracing::info!(scorers = summary.len(), summary = ?summary, "evaluation summary");
        Ok(())
    }
}

/// Appends one JSON object per event to a file. The durable sink:
/// every prediction, score, and the final summary survive the process.
pub struct JsonlLogger {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlLogger {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_event(&self, event: serde_json::Value) -> Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| LabError::Logger("log file mutex poisoned".into()))?;
        writeln!(file, "{event}")?;
        Ok(())
    }

    fn now() -> String {
        chrono::Utc::now().to_rfc3339()
    }
}

#[async_trait]
impl EvalLogger for JsonlLogger {
    async fn begin_run(&self, meta: &RunMeta) -> Result<()> {
        self.write_event(json!({
            "event": "begin_run",
            "time": Self::now(),
            "eval_name": meta.eval_name,
            "model": meta.model_tag,
            "dataset": meta.dataset_ref,
        }))
    }

    async fn log_prediction(&self, prediction: &Prediction) -> Result<PredictionId> {
        let id = PredictionId::new();
        self.write_event(json!({
            "event": "prediction",
            "time": Self::now(),
            "id": id,
            "prompt": prediction.prompt,
            "input": prediction.input,
            "output": prediction.output,
        }))?;
        Ok(id)
    }

    async fn log_score(
        &self,
        prediction: PredictionId,
        scorer: &str,
        value: Option<&ScoreValue>,
    ) -> Result<()> {
        self.write_event(json!({
            "event": "score",
            "time": Self::now(),
            "prediction": prediction,
            "scorer": scorer,
            "value": value,
        }))
    }

    async fn finish_prediction(&self, prediction: PredictionId) -> Result<()> {
        self.write_event(json!({
            "event": "finish_prediction",
            "time": Self::now(),
            "prediction": prediction,
        }))
    }

    async fn log_summary(&self, summary: &[(String, ScoreSummary)]) -> Result<()> {
        let scores: serde_json::Map<String, serde_json::Value> = summary
            .iter()
            .map(|(name, s)| Ok((name.clone(), serde_json::to_value(s)?)))
            .collect::<std::result::Result<_, serde_json::Error>>()?;
        self.write_event(json!({
            "event": "summary",
            "time": Self::now(),
            "scores": scores,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_logger_accepts_everything() {
        let logger = NoopLogger;
        let meta = RunMeta {
            eval_name: "test".into(),
            model_tag: "tag".into(),
            dataset_ref: "ds".into(),
        };
        logger.begin_run(&meta).await.unwrap();
        let id = logger
            .log_prediction(&Prediction {
                prompt: "p".into(),
                input: "i".into(),
                output: "o".into(),
            })
            .await
            .unwrap();
        logger.log_score(id, "accuracy", None).await.unwrap();
        logger.finish_prediction(id).await.unwrap();
        logger.log_summary(&[]).await.unwrap();
    }

    #[tokio::test]
    async fn jsonl_logger_writes_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        let logger = JsonlLogger::create(&path).unwrap();

        let meta = RunMeta {
            eval_name: "nightly".into(),
            model_tag: "promptlab_nightly".into(),
            dataset_ref: "qa-set".into(),
        };
        logger.begin_run(&meta).await.unwrap();
        let id = logger
            .log_prediction(&Prediction {
                prompt: "Be brief.".into(),
                input: "What is 2+2?".into(),
                output: "4".into(),
            })
            .await
            .unwrap();
        logger
            .log_score(id, "accuracy", Some(&ScoreValue::Bool(true)))
            .await
            .unwrap();
        logger.finish_prediction(id).await.unwrap();
        logger
            .log_summary(&[("accuracy".into(), ScoreSummary::TruePercent(100.0))])
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 5);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "begin_run");
        assert_eq!(first["dataset"], "qa-set");

        let score: serde_json::Value = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(score["event"], "score");
        assert_eq!(score["value"], true);

        let last: serde_json::Value = serde_json::from_str(lines[4]).unwrap();
        assert_eq!(last["event"], "summary");
        assert_eq!(last["scores"]["accuracy"]["kind"], "true_percent");
    }

    #[tokio::test]
    async fn jsonl_logger_null_score() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        let logger = JsonlLogger::create(&path).unwrap();

        let id = PredictionId::new();
        logger.log_score(id, "quality", None).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let event: serde_json::Value = serde_json::from_str(contents.trim()).unwrap();
        assert!(event["value"].is_null());
    }
}
