//! JSON-lines corpus loading.

use anyhow::{anyhow, Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;
use std::{fs, path::Path};

// One corpus line: {"text": "..."} plus whatever metadata the dump carries.
#[derive(Debug, Deserialize)]
struct CorpusLine {
    text: String,
}

/// Read a `.jsonl` corpus, one JSON object per line, keeping the `text`
/// field of each. Blank lines are skipped; a malformed line aborts with
/// its line number.
pub fn load_jsonl(path: &Path) -> Result<Vec<String>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let mut texts = Vec::new();
    for (idx, line) in data.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let parsed: CorpusLine = serde_json::from_str(line)
            .map_err(|e| anyhow!("{}:{}: {e}", path.display(), idx + 1))?;
        texts.push(parsed.text);
    }

    Ok(texts)
}

/// Seeded shuffle so a run can be reproduced from its log line.
pub fn shuffle(texts: &mut [String], seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    texts.shuffle(&mut rng);
}
