/*
cargo run --bin summarize --release -- \
    --mode both \
    --limit 10 \
    data/wikibooks.jsonl \
    result/genre_transformation/summary.json
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

const OVERALL_PROMPT: &str = "\
As a professional summarizer, create a concise and comprehensive summary of the provided text, while adhering to these guidelines:\n\
1. Craft a summary that is detailed, thorough, in-depth, and complex, while maintaining clarity and conciseness.\n\
2. Incorporate main ideas and essential information, eliminating extraneous language and focusing on critical aspects.\n\
3. Ensure that the summary is self-contained and does not require the reader to refer back to the original text for context.";

const PERSPECTIVES_PROMPT: &str = "\
As a professional summarizer, summarize this text from 2~5 different directions(can be different perspectives, aspects, components, etc.). \
Each direction you pick should be content-rich and reflect specific insights or themes found in the original text that are different from the other directions. \
Avoid generic direction like content overview.\n\
The summaries should be an ordered list (each point is a direction), insightful, and tailored to the text's nuances and themes.\n\
Exclude and avoid using \"The text\", \"The article\", \"The summary\", \"the view\", \"the direction\", etc. \
Instead, use concept/entity in the original text to start each summary and make each summary self-contained.";

// Which (record kind, instruction block) pairs each mode runs
static MODES: phf::Map<&'static str, &'static [(&'static str, &'static str)]> = phf::phf_map! {
    "overall"      => &[("overall_summary", OVERALL_PROMPT)],
    "perspectives" => &[("different_perspectives", PERSPECTIVES_PROMPT)],
    "both"         => &[
        ("overall_summary", OVERALL_PROMPT),
        ("different_perspectives", PERSPECTIVES_PROMPT),
    ],
};

#[derive(Parser, Debug)]
#[command(version, author, about = "Summarize corpus texts with Gemini")]
struct Cli {
    input: PathBuf,
    output: PathBuf,

    // Which summaries to produce:  overall | perspectives | both
    #[arg(long, default_value = "both")]
    mode: String,

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

    let passes = *MODES
        .get(cli.mode.as_str())
        .ok_or_else(|| anyhow!("unknown mode {}", cli.mode))?;

    init_logger(&cli.output)?;
    info!(
        "summary run started: mode={} model={} seed={}",
        cli.mode, cli.model, cli.seed
    );

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

    let bar = ProgressBar::new((texts.len() * passes.len()) as u64);
    bar.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .unwrap());

    let mut results: Vec<TransformedRecord> = Vec::new();
    for (idx, text) in texts.iter().enumerate() {
        for (kind, instructions) in passes {
            let prompt = format!("{text}\n{instructions}");
            match ask(&cli, &client, &key, &prompt).await {
                Ok(summary) => results.push(TransformedRecord {
                    original_text: text.clone(),
                    transformed_text: summary,
                    kind: (*kind).to_owned(),
                    tag: vec![],
                }),
                Err(err) => warn!(
                    "item {idx} ({kind}) failed after {} attempts, skipped: {err}",
                    cli.max_attempts
                ),
            }
            bar.inc(1);
            sleep(Duration::from_millis(cli.delay_ms)).await;
        }
    }
    bar.finish_with_message("done");

    save_records(&cli.output, &results)?;
    println!("output written to {}", cli.output.display());
    info!("{} records written to {}", results.len(), cli.output.display());

    Ok(())
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
    let log_path = log_dir.join(format!("summarize_{stem}_{ts}.log"));

    let log_file = fs::File::create(&log_path)
        .with_context(|| format!("failed to create log file {}", log_path.display()))?;
    WriteLogger::init(LevelFilter::Info, LogConfig::default(), log_file)?;
    Ok(())
}
