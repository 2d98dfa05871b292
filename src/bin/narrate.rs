/*
cargo run --bin narrate --release -- \
    --model gemini-2.0-flash \
    --limit 10 \
    data/wikibooks.jsonl \
    result/genre_transformation/narration.json
*/

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use simplelog::{Config as LogConfig, LevelFilter, WriteLogger};
use std::{env, fs, path::PathBuf};
use tokio::time::{sleep, Duration};

use genre_transformation::extract::{extract_type_and_characters, is_affirmative};
use genre_transformation::freq::FrequencyTable;
use genre_transformation::output::{save_records, TransformedRecord};
use genre_transformation::{dataset, gemini};

// Seed vocabularies; the trackers fold whatever spelling the model
// actually returns into these.
const NARRATIVE_TYPES: [&str; 5] = ["Diary", "Blog", "Epistolary style", "Prose", "Novel"];
const CHARACTER_TYPES: [&str; 4] = [
    "Fictional person",
    "Author themselves",
    "Real people",
    "Anthropomorphized animals/objects/concepts",
];

#[derive(Parser, Debug)]
#[command(version, author, about = "Rewrite corpus texts as narratives with Gemini")]
struct Cli {
    input: PathBuf,
    output: PathBuf,

    #[arg(long, default_value = "gemini-2.0-flash")]
    model: String,

    #[arg(long, default_value_t = 3)]
    max_attempts: u8,

    // Milliseconds to wait after every successful request (avoid 429s)
    #[arg(long = "delay-ms", default_value_t = 200)]
    delay_ms: u64,

    // How many corpus items to process after shuffling
    #[arg(long, default_value_t = 10)]
    limit: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    // Google API key (overrides $GOOGLE_API_KEY)
    #[arg(long = "api-key", value_name = "KEY")]
    api_key: Option<String>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logger(&cli.output)?;
    info!("narration run started: model={} seed={}", cli.model, cli.seed);

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

    let mut narrative_counts = FrequencyTable::with_labels(NARRATIVE_TYPES);
    let mut character_counts = FrequencyTable::with_labels(CHARACTER_TYPES);

    let bar = ProgressBar::new(texts.len() as u64);
    bar.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .unwrap());

    let mut results: Vec<TransformedRecord> = Vec::new();
    for (idx, text) in texts.iter().enumerate() {
        match transform_one(
            &cli,
            &client,
            &key,
            text,
            &mut narrative_counts,
            &mut character_counts,
        )
        .await
        {
            Ok(Some(record)) => results.push(record),
            Ok(None) => info!("item {idx} not feasible as a narrative, skipped"),
            Err(err) => warn!("item {idx} failed after {} attempts, skipped: {err}", cli.max_attempts),
        }
        bar.inc(1);
        sleep(Duration::from_millis(cli.delay_ms)).await;
    }
    bar.finish_with_message("done");

    info!("narrative distribution: {:?}", narrative_counts.snapshot());
    info!("character distribution: {:?}", character_counts.snapshot());

    save_records(&cli.output, &results)?;
    println!("output written to {}", cli.output.display());
    info!("{} records written to {}", results.len(), cli.output.display());

    Ok(())
}

/// Full pipeline for one corpus item: feasibility gate, guidance pass with
/// the memory area, label bookkeeping, then the actual rewrite.
async fn transform_one(
    cli: &Cli,
    client: &reqwest::Client,
    key: &str,
    text: &str,
    narrative_counts: &mut FrequencyTable,
    character_counts: &mut FrequencyTable,
) -> Result<Option<TransformedRecord>> {
    let gate = ask(cli, client, key, &gate_prompt(text)).await?;
    if !is_affirmative(&gate) {
        return Ok(None);
    }

    let guidance_prompt = guidance_prompt(text, narrative_counts, character_counts);
    let guidance = ask(cli, client, key, &guidance_prompt).await?;

    let (narrative, characters) = extract_type_and_characters(&guidance);
    // An unmatched extraction records nothing; never a placeholder label.
    if let Some(label) = narrative.as_deref().filter(|l| !l.is_empty()) {
        narrative_counts.record_one(label)?;
    } else {
        warn!("no narrative type found in guidance response");
    }
    if let Some(label) = characters.as_deref().filter(|l| !l.is_empty()) {
        character_counts.record_one(label)?;
    } else {
        warn!("no character type found in guidance response");
    }

    let rewrite = ask(
        cli,
        client,
        key,
        &rewrite_prompt(text, narrative.as_deref(), characters.as_deref()),
    )
    .await?;

    Ok(Some(TransformedRecord {
        original_text: text.to_owned(),
        transformed_text: rewrite,
        kind: "narration".to_owned(),
        tag: vec![],
    }))
}

// Retry wrapper around the text query; linear backoff between attempts.
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

fn gate_prompt(text: &str) -> String {
    format!(
        "Narrative types: Diary, Epistolary style, Prose, Novel.\n\
         {text}\n\
         Is this text meaningful (has enough content) and feasible to be rewritten as a narrative? (yes/no)"
    )
}

fn guidance_prompt(
    text: &str,
    narrative_counts: &FrequencyTable,
    character_counts: &FrequencyTable,
) -> String {
    let narrative_dist = render_counts(narrative_counts);
    let character_dist = render_counts(character_counts);

    format!(
        "{text}\n\
         As a professional narrative writing expert, you know:\n\
         1. Types of narrative:\n   - Diary\n   - Blog\n   - Epistolary style\n   - Prose\n   - Novel\n\
         2. Types of main characters:\n   - Fictional person\n   - Author themselves\n   - Real people\n   - Anthropomorphized animals/objects/concepts\n\n\
         Your role is to guide another AI in transforming any given text into a narrative form. \
         You won't be writing the narrative itself, but rather completing the following three tasks, \
         which another AI will reference to generate the narrative:\n\
         1. Summarize the content of the given text.\n\
         2. Choose the type of narrative, Person(first, second, third), and the type of main characters.\n\
         3. Based on the given text, analyze how to transform the text into the (type_of_narrative, person, type_of_main_characters).\n\n\
         Output in a code block enclosed by triple backticks in the following format:\n\
         ```\n\
         1. {{summary}}\n\
         2. Type of narrative: {{type_of_narrative}}; Type of main characters: {{type_of_main_characters}}.\n\
         3. Analysis: {{analysis}}\n\
         ```\n\
         Do not provide any other information except the guidance of the three questions above.\n\n\
         ---\n\
         Memory area:\n\
         Here is the number of times you have chosen specific type_of_narrative:\n\
         {narrative_dist}, and the number of times you have chosen specific type_of_main_characters: {character_dist}.\n\
         You need to diversify the selection of type_of_narrative to ensure an even distribution, \
         in order to generate a diverse range of narratives."
    )
}

fn rewrite_prompt(text: &str, narrative: Option<&str>, characters: Option<&str>) -> String {
    let suggestions = format!(
        "type_of_narrative: {}; type_of_main_characters: {}",
        narrative.unwrap_or("your choice"),
        characters.unwrap_or("your choice"),
    );
    format!(
        "{text}\n\
         As a professional narrative writing expert, your task is to transform any given text, \
         which could be of any type, into type_of_narrative. The requirements are:\n\
         1. Avoid unnecessary filler content.\n\
         2. Integrate sufficient background information about the given text in the narrative.\n\
         3. Pay attention to causal logic in the narrative.\n\
         4. Refer to the following suggestions to complete this task:\n\
         {suggestions}"
    )
}

// Snapshot rendered as a JSON object; BTreeMap keeps the key order stable
// between runs.
fn render_counts(table: &FrequencyTable) -> String {
    serde_json::to_string(&table.snapshot()).unwrap_or_else(|_| "{}".to_string())
}

fn init_logger(output: &std::path::Path) -> Result<()> {
    let log_dir = PathBuf::from("logs");
    fs::create_dir_all(&log_dir).context("failed to create logs directory")?;

    let ts = Local::now().format("%Y%m%d-%H%M%S");
    let stem = output.file_stem().unwrap_or_default().to_string_lossy();
    let log_path = log_dir.join(format!("narrate_{stem}_{ts}.log"));

    let log_file = fs::File::create(&log_path)
        .with_context(|| format!("failed to create log file {}", log_path.display()))?;
    WriteLogger::init(LevelFilter::Info, LogConfig::default(), log_file)?;
    Ok(())
}
