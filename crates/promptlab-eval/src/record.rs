use serde::{Deserialize, Serialize};

use crate::judge::ScoreValue;

/// One score slot in a result record. `value` is `None` when the judge
/// output could not be parsed (or the judge call failed); an absent
/// score is never coerced to a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub scorer: String,
    pub value: Option<ScoreValue>,
}

/// The outcome of one (prompt, example) unit. Immutable after
/// creation. `scores` has exactly one entry per configured scorer, in
/// configuration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub prompt_index: usize,
    pub example_index: usize,
    pub input: String,
    pub response: String,
    pub scores: Vec<ScoreEntry>,
    #[serde(default)]
    pub ground_truth: Option<String>,
}

impl ResultRecord {
    /// Non-null score for a scorer, if any.
    pub fn score(&self, scorer: &str) -> Option<&ScoreValue> {
        self.scores
            .iter()
            .find(|entry| entry.scorer == scorer)
            .and_then(|entry| entry.value.as_ref())
    }
}

/// Per-scorer aggregate for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ScoreSummary {
    /// Percentage of `true` values among non-null boolean scores.
    TruePercent(f64),
    /// Arithmetic mean of non-null numeric scores.
    Mean(f64),
    /// Text scorers and all-null scorers have no aggregate.
    NoAggregate,
}

/// Reduce result records to one summary per scorer. Scorer names and
/// order come from the first record's score entries; null values are
/// skipped, and the aggregate form follows the first non-null value's
/// type.
pub fn summarize(results: &[ResultRecord]) -> Vec<(String, ScoreSummary)> {
    let Some(first) = results.first() else {
        return Vec::new();
    };

    first
        .scores
        .iter()
        .map(|entry| {
            let name = entry.scorer.clone();
            let values: Vec<&ScoreValue> = results.iter().filter_map(|r| r.score(&name)).collect();

            let summary = match values.first() {
                Some(ScoreValue::Bool(_)) => {
                    let trues = values.iter().filter_map(|v| v.as_bool()).filter(|b| *b).count();
                    ScoreSummary::TruePercent(trues as f64 / values.len() as f64 * 100.0)
                }
                Some(ScoreValue::Number(_)) => {
                    let numbers: Vec<f64> = values.iter().filter_map(|v| v.as_number()).collect();
                    ScoreSummary::Mean(numbers.iter().sum::<f64>() / numbers.len() as f64)
                }
                _ => ScoreSummary::NoAggregate,
            };

            (name, summary)
        })
        .collect()
}
