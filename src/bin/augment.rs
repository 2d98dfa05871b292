/*
cargo run --bin augment --release -- \
    --limit 10 \
    data/wikibooks.jsonl \
    result/genre_transformation/augmentation.json
*/

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use simplelog::{Config as LogConfig, LevelFilter, WriteLogger};
use std::{env, fs, path::PathBuf};
use tokio::time::{sleep, Duration};

use genre_transformation::output::{save_records, TransformedRecord};
use genre_transformation::{dataset, gemini};

#[derive(Parser, Debug)]
#[command(version, author, about = "Generate thesis statements for corpus texts with Gemini")]
struct Cli {
    input: PathBuf,
    output: PathBuf,

    #[arg(long, default_value = "gemini-2.0-flash")]
    model: String,

    #[arg(long, default_value_t = 3)]
    max_attempts: u8,

    #[arg(long = "delay-ms", default_value_t = 200)]
    delay_ms: u64,

    #[arg(long, default_value_t = 10)]
    limit: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long = "api-key", value_name = "KEY")]
    api_key: Option<String>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logger(&cli.output)?;
    info!("augmentation run started: model={} seed={}", cli.model, cli.seed);

    let mut texts = dataset::load_jsonl(&cli.input)?;
    info!("loaded {} corpus items from {}", texts.len(), cli.input.display());
    dataset::shuffle(&mut texts, cli.seed);
    texts.truncate(cli.limit);

    let key = cli
        .api_key
        .clone()
        .or_else(|| env::var("GOOGLE_API_KEY").ok())
        .context("GOOGLE_API_KEY not set and --api-key not given")?;
    let client = gemini::build_client()?;

    let bar = ProgressBar::new(texts.len() as u64);
    bar.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .unwrap());

    let mut results: Vec<TransformedRecord> = Vec::new();
    for (idx, text) in texts.iter().enumerate() {
        match ask(&cli, &client, &key, &thesis_prompt(text)).await {
            Ok(statement) => results.push(TransformedRecord {
                original_text: text.clone(),
                transformed_text: statement,
                kind: "augmentation".to_owned(),
                tag: vec![],
            }),
            Err(err) => warn!(
                "item {idx} failed after {} attempts, skipped: {err}",
                cli.max_attempts
            ),
        }
        bar.inc(1);
        sleep(Duration::from_millis(cli.delay_ms)).await;
    }
    bar.finish_with_message("done");

    save_records(&cli.output, &results)?;
    println!("output written to {}", cli.output.display());
    info!("{} records written to {}", results.len(), cli.output.display());

    Ok(())
}

fn thesis_prompt(text: &str) -> String {
    format!(
        "{text}\n\
         As a professional argumentative essay writer, your task is to generate a clear, independent, \
         debatable, and well-defined thesis statement based on the provided text. The thesis statement \
         should be a point to prove, not a fact that has been defined. The thesis statement must be strong \
         enough to serve as the central argument in an argumentative essay. You don't need to write the \
         entire essay, just provide the thesis statement."
    )
}

async fn ask(cli: &Cli, client: &reqwest::Client, key: &str, prompt: &str) -> Result<String> {
    let mut last_error: Option<anyhow::Error> = None;
    for attempt in 1..=cli.max_attempts {
        match gemini::query_text(client, key, &cli.model, prompt).await {
            Ok(text) => return Ok(text),
            Err(err) => {
                if attempt < cli.max_attempts {
                    warn!("attempt {}/{} failed: {err}", attempt, cli.max_attempts);
                    sleep(Duration::from_millis(500 * u64::from(attempt))).await;
                }
                last_error = Some(err);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| anyhow!("no attempts were made")))
}

fn init_logger(output: &std::path::Path) -> Result<()> {
    let log_dir = PathBuf::from("logs");
    fs::create_dir_all(&log_dir).context("failed to create logs directory")?;

    let ts = Local::now().format("%Y%m%d-%H%M%S");
    let stem = output.file_stem().unwrap_or_default().to_string_lossy();
    let log_path = log_dir.join(format!("augment_{stem}_{ts}.log"));

    let log_file = fs::File::create(&log_path)
        .with_context(|| format!("failed to create log file {}", log_path.display()))?;
    WriteLogger::init(LevelFilter::Info, LogConfig::default(), log_file)?;
    Ok(())
}
