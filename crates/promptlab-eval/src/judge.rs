//! LLM-as-judge scoring: grading-prompt assembly, the judge call, and
//! parsing of judge output into typed scores.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use promptlab_core::client::{CallOptions, ChatClient};
use promptlab_core::error::Result;
use promptlab_core::message::Message;

use crate::config::{ScoreKind, ScorerConfig, DEFAULT_NUMERIC_SCALE};

/// Grading is deterministic.
pub const JUDGE_TEMPERATURE: f64 = 0.0;

/// Fixed system instruction for every judge call.
pub const JUDGE_SYSTEM_PROMPT: &str =
    "You are an expert evaluator. Provide only the requested output format.";

/// A parsed score. `Text` keeps the judge's original casing; lower-casing
/// is applied only while parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl ScoreValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScoreValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScoreValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Assemble the grading prompt: four delimited sections (input,
/// response, optional expected answer, criterion) plus an
/// output-format instruction for numeric and boolean scorers.
pub fn build_scoring_context(
    scorer: &ScorerConfig,
    input: &str,
    response: &str,
    ground_truth: Option<&str>,
) -> String {
    let mut context = format!(
        "Please evaluate the following response based on the criteria provided.\n\n\
         **USER INPUT/QUESTION:**\n{input}\n\n\
         **MODEL RESPONSE:**\n{response}\n"
    );

    if let Some(expected) = ground_truth {
        context.push_str(&format!("\n**EXPECTED/CORRECT ANSWER:**\n{expected}\n"));
    }

    context.push_str(&format!("\n**EVALUATION CRITERIA:**\n{}", scorer.criterion));

    match scorer.output {
        ScoreKind::Numeric => {
            let scale = scorer.scale.as_deref().unwrap_or(DEFAULT_NUMERIC_SCALE);
            context.push_str(&format!(
                "\n\n**INSTRUCTIONS:** Provide only a number on the scale {scale}. \
                 Do not include any other text."
            ));
        }
        ScoreKind::Boolean => {
            context.push_str(
                "\n\n**INSTRUCTIONS:** Answer only 'true' or 'false'. \
                 Do not include any other text.",
            );
        }
        ScoreKind::Text => {}
    }

    context
}

/// Parse raw judge output according to the declared output type.
/// Returns `None` when the output does not match the declared type;
/// never panics or errors.
pub fn parse_score(kind: ScoreKind, raw: &str, invert: bool) -> Option<ScoreValue> {
    let trimmed = raw.trim();
    let lowered = trimmed.to_lowercase();

    match kind {
        ScoreKind::Numeric => lowered
            .split_whitespace()
            .next()
            .and_then(|token| token.parse::<f64>().ok())
            .map(ScoreValue::Number),
        // Substring containment, not exact match: judges wrap verdicts
        // in punctuation and prose ("True.", "the answer is false").
        // "true" is checked first.
        ScoreKind::Boolean => {
            if lowered.contains("true") {
                Some(ScoreValue::Bool(!invert))
            } else if lowered.contains("false") {
                Some(ScoreValue::Bool(invert))
            } else {
                None
            }
        }
        ScoreKind::Text => Some(ScoreValue::Text(trimmed.to_string())),
    }
}

/// Grades one (input, response) pair per configured scorer with a
/// second model call at temperature 0.
pub struct JudgeScorer<'a> {
    client: &'a dyn ChatClient,
    timeout: Option<Duration>,
}

impl<'a> JudgeScorer<'a> {
    pub fn new(client: &'a dyn ChatClient) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Score a response. `Ok(None)` means the judge answered but the
    /// output could not be parsed under the scorer's declared type;
    /// `Err` means the judge call itself failed.
    pub async fn score(
        &self,
        scorer: &ScorerConfig,
        input: &str,
        response: &str,
        ground_truth: Option<&str>,
    ) -> Result<Option<ScoreValue>> {
        let context = build_scoring_context(scorer, input, response, ground_truth);
        let messages = [Message::system(JUDGE_SYSTEM_PROMPT), Message::user(context)];

        let mut options = CallOptions::default().with_temperature(JUDGE_TEMPERATURE);
        if let Some(timeout) = self.timeout {
            options = options.with_timeout(timeout);
        }

        let result = self
            .client
            .complete(scorer.judge_model(), &messages, &options)
            .await?;

        Ok(parse_score(scorer.output, &result.content, scorer.invert))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use promptlab_core::client::ChatResult;
    use std::sync::Mutex;

    // --- parse_score tests ---

    #[test]
    fn numeric_first_token() {
        assert_eq!(
            parse_score(ScoreKind::Numeric, "7 out of 10", false),
            Some(ScoreValue::Number(7.0))
        );
        assert_eq!(
            parse_score(ScoreKind::Numeric, "  8.5  ", false),
            Some(ScoreValue::Number(8.5))
        );
    }

    #[test]
    fn numeric_unparseable_is_none() {
        assert_eq!(parse_score(ScoreKind::Numeric, "excellent", false), None);
        assert_eq!(parse_score(ScoreKind::Numeric, "", false), None);
    }

    #[test]
    fn boolean_substring_match() {
        assert_eq!(
            parse_score(ScoreKind::Boolean, "True.", false),
            Some(ScoreValue::Bool(true))
        );
        assert_eq!(
            parse_score(ScoreKind::Boolean, "The answer is FALSE", false),
            Some(ScoreValue::Bool(false))
        );
    }

    #[test]
    fn boolean_invert() {
        assert_eq!(
            parse_score(ScoreKind::Boolean, "True.", true),
            Some(ScoreValue::Bool(false))
        );
        assert_eq!(
            parse_score(ScoreKind::Boolean, "false", true),
            Some(ScoreValue::Bool(true))
        );
    }

    #[test]
    fn boolean_neither_substring_is_none() {
        assert_eq!(parse_score(ScoreKind::Boolean, "yes", false), None);
        assert_eq!(parse_score(ScoreKind::Boolean, "", false), None);
    }

    #[test]
    fn boolean_true_wins_over_false() {
        // Known leniency quirk: "true" is matched first even in negated
        // phrasing. Deliberately not tightened to exact matching, which
        // would reject verbose judges.
        assert_eq!(
            parse_score(ScoreKind::Boolean, "definitely not true", false),
            Some(ScoreValue::Bool(true))
        );
        assert_eq!(
            parse_score(ScoreKind::Boolean, "true, not false", false),
            Some(ScoreValue::Bool(true))
        );
    }

    #[test]
    fn text_preserves_casing() {
        assert_eq!(
            parse_score(ScoreKind::Text, "  Mostly Correct  ", false),
            Some(ScoreValue::Text("Mostly Correct".into()))
        );
    }

    // --- build_scoring_context tests ---

    fn bool_scorer() -> ScorerConfig {
        ScorerConfig::new("accuracy", "Is the response factually correct?", ScoreKind::Boolean)
    }

    #[test]
    fn context_has_delimited_sections() {
        let ctx = build_scoring_context(&bool_scorer(), "the input", "the response", None);
        assert!(ctx.contains("**USER INPUT/QUESTION:**\nthe input"));
        assert!(ctx.contains("**MODEL RESPONSE:**\nthe response"));
        assert!(ctx.contains("**EVALUATION CRITERIA:**\nIs the response factually correct?"));
        assert!(!ctx.contains("EXPECTED/CORRECT ANSWER"));
        assert!(ctx.contains("Answer only 'true' or 'false'"));
    }

    #[test]
    fn context_includes_ground_truth_when_present() {
        let ctx = build_scoring_context(&bool_scorer(), "in", "out", Some("the answer"));
        assert!(ctx.contains("**EXPECTED/CORRECT ANSWER:**\nthe answer"));
    }

    #[test]
    fn numeric_instruction_uses_scale() {
        let scorer =
            ScorerConfig::new("quality", "Rate overall quality", ScoreKind::Numeric).with_scale("1-5");
        let ctx = build_scoring_context(&scorer, "in", "out", None);
        assert!(ctx.contains("a number on the scale 1-5"));

        let scorer = ScorerConfig::new("quality", "Rate overall quality", ScoreKind::Numeric);
        let ctx = build_scoring_context(&scorer, "in", "out", None);
        assert!(ctx.contains("a number on the scale 1-10"));
    }

    #[test]
    fn text_scorer_has_no_instruction_suffix() {
        let scorer = ScorerConfig::new("notes", "Comment on tone", ScoreKind::Text);
        let ctx = build_scoring_context(&scorer, "in", "out", None);
        assert!(!ctx.contains("**INSTRUCTIONS:**"));
    }

    // --- JudgeScorer tests ---

    struct StubJudge {
        reply: String,
        calls: Mutex<Vec<(String, Vec<Message>, Option<f64>)>>,
    }

    impl StubJudge {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.into(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatClient for StubJudge {
        async fn complete(
            &self,
            model: &str,
            messages: &[Message],
            options: &CallOptions,
        ) -> Result<ChatResult> {
            self.calls.lock().unwrap().push((
                model.into(),
                messages.to_vec(),
                options.temperature,
            ));
            Ok(ChatResult {
                content: self.reply.clone(),
                usage: None,
            })
        }
    }

    #[tokio::test]
    async fn judge_call_shape() {
        let client = StubJudge::new("true");
        let judge = JudgeScorer::new(&client);
        let scorer = bool_scorer().with_model("gpt-4o");

        let score = judge
            .score(&scorer, "input", "response", Some("expected"))
            .await
            .unwrap();
        assert_eq!(score, Some(ScoreValue::Bool(true)));

        let calls = client.calls.lock().unwrap();
        let (model, messages, temperature) = &calls[0];
        assert_eq!(model, "gpt-4o");
        assert_eq!(messages[0], Message::system(JUDGE_SYSTEM_PROMPT));
        assert!(messages[1].content().contains("**EXPECTED/CORRECT ANSWER:**"));
        assert_eq!(*temperature, Some(JUDGE_TEMPERATURE));
    }

    #[tokio::test]
    async fn judge_uses_default_model_when_unset() {
        let client = StubJudge::new("8");
        let judge = JudgeScorer::new(&client);
        let scorer = ScorerConfig::new("quality", "Rate it", ScoreKind::Numeric);

        judge.score(&scorer, "in", "out", None).await.unwrap();

        let calls = client.calls.lock().unwrap();
        assert_eq!(calls[0].0, crate::config::DEFAULT_JUDGE_MODEL);
    }

    #[tokio::test]
    async fn unparseable_judge_output_is_none_not_error() {
        let client = StubJudge::new("I would say it's quite good");
        let judge = JudgeScorer::new(&client);
        let scorer = ScorerConfig::new("quality", "Rate it", ScoreKind::Numeric);

        let score = judge.score(&scorer, "in", "out", None).await.unwrap();
        assert_eq!(score, None);
    }

    #[tokio::test]
    async fn deterministic_stub_scores_identically() {
        let client = StubJudge::new("7");
        let judge = JudgeScorer::new(&client);
        let scorer = ScorerConfig::new("quality", "Rate it", ScoreKind::Numeric);

        let first = judge.score(&scorer, "in", "out", None).await.unwrap();
        let second = judge.score(&scorer, "in", "out", None).await.unwrap();
        assert_eq!(first, second);
    }
}
