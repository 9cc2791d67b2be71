mod config;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use promptlab_eval::prelude::*;
use promptlab_llm::{is_known_model, OpenAIClient};

use crate::config::RunConfig;

#[derive(Parser)]
#[command(author, version, about = "Evaluate prompts against a dataset with LLM-as-judge scoring")]
struct Cli {
    /// Path to the TOML run configuration
    #[arg(long, default_value = "promptlab.toml")]
    config: PathBuf,

    /// Directory containing <reference>.json dataset files
    #[arg(long, default_value = "datasets")]
    dataset_dir: PathBuf,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: String,

    /// Override the OpenAI-compatible API base URL
    #[arg(long, env = "OPENAI_API_BASE")]
    openai_api_base: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let run_config = RunConfig::load(&cli.config)?;
    warn_on_unknown_models(&run_config);

    let source = JsonFileSource::new(&cli.dataset_dir);
    let dataset = source
        .fetch(&run_config.dataset)
        .await
        .with_context(|| format!("failed to load dataset '{}'", run_config.dataset))?;
    info!(dataset = %dataset.reference, rows = dataset.len(), "dataset loaded");

    let mut client = OpenAIClient::new(cli.openai_api_key);
    if let Some(base_url) = cli.openai_api_base {
        client = client.with_base_url(base_url);
    }

    let logger: Box<dyn EvalLogger> = match &run_config.log_file {
        Some(path) => Box::new(JsonlLogger::create(path)?),
        None => Box::new(TracingLogger),
    };

    let mut session = SessionState::new();
    session.prompts = run_config.prompts.clone();
    session.scorers = run_config.scorers.clone();

    let eval_name = run_config
        .eval_name
        .clone()
        .unwrap_or_else(|| format!("eval_{}", chrono::Local::now().format("%Y%m%d_%H%M%S")));

    let cancel = Arc::new(AtomicBool::new(false));
    let ctrlc_flag = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing current unit");
            ctrlc_flag.store(true, Ordering::Relaxed);
        }
    });

    let mut runner = EvalRunner::new(&client, logger.as_ref())
        .with_failure_policy(run_config.failure_policy)
        .with_cancel_flag(cancel);
    if let Some(secs) = run_config.timeout_secs {
        runner = runner.with_timeout(Duration::from_secs(secs));
    }

    let records = runner
        .run(&session, &dataset, &eval_name, |completed, total| {
            info!(completed, total, "unit complete");
        })
        .await?;

    let summary = summarize(&records);
    print_summary(&eval_name, &records, &summary);

    if let Some(path) = &run_config.output {
        write_results(path, &records, &summary)?;
        println!("Results stored to: {}", path.display());
    }

    Ok(())
}

fn warn_on_unknown_models(config: &RunConfig) {
    for prompt in config.prompts.iter().filter(|p| p.is_configured()) {
        if !is_known_model(&prompt.model) {
            warn!(model = %prompt.model, "prompt model is not in the known catalog");
        }
    }
    for scorer in &config.scorers {
        if !is_known_model(scorer.judge_model()) {
            warn!(
                scorer = %scorer.name,
                model = %scorer.judge_model(),
                "judge model is not in the known catalog"
            );
        }
    }
}

fn print_summary(eval_name: &str, records: &[ResultRecord], summary: &[(String, ScoreSummary)]) {
    println!("\nEvaluation '{eval_name}' complete: {} records", records.len());
    for (name, value) in summary {
        match value {
            ScoreSummary::TruePercent(pct) => println!("  {name}: {pct:.1}% true"),
            ScoreSummary::Mean(mean) => println!("  {name}: {mean:.2} average"),
            ScoreSummary::NoAggregate => println!("  {name}: text responses - no aggregate"),
        }
    }
}

fn write_results(
    path: &Path,
    records: &[ResultRecord],
    summary: &[(String, ScoreSummary)],
) -> Result<()> {
    let mut summary_map = serde_json::Map::new();
    for (name, value) in summary {
        summary_map.insert(name.clone(), serde_json::to_value(value)?);
    }
    let payload = serde_json::json!({
        "summary": summary_map,
        "results": records,
    });

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&payload)?)
        .with_context(|| format!("failed to write results to: {}", path.display()))?;
    Ok(())
}
