//! Approximate-key frequency tracking.
//!
//! Generative models asked to pick a category from a list rarely echo the
//! label verbatim ("Diary" comes back as "Diairy", "diary entries", ...).
//! [`FrequencyTable`] keeps a running tally that folds such near-duplicates
//! into one canonical label via normalized edit distance, so the counts fed
//! back into later prompts stay meaningful.

use std::collections::BTreeMap;
use thiserror::Error;

/// Default fuzzy-fold threshold: up to 30% character-level divergence
/// (relative to the existing label) is treated as the same category.
pub const DEFAULT_THRESHOLD: f64 = 0.3;

/// Precondition violations; programming errors, never worth retrying.
#[derive(Debug, Error, PartialEq)]
pub enum FreqError {
    #[error("label must be a non-empty token")]
    EmptyKey,
    #[error("threshold {0} is outside [0, 1]")]
    BadThreshold(f64),
}

/// A label→count tally whose keys tolerate near-duplicate spellings.
///
/// Canonical labels are kept in insertion order; when two existing labels
/// are equally close to an incoming key, the earliest-inserted one wins.
/// By construction no two canonical labels lie within the fold threshold
/// of each other: an incoming label that close is folded, never inserted.
///
/// The table has no internal synchronization. One sequential caller is the
/// intended driver; anything parallel must serialize `record` externally.
#[derive(Debug, Clone, Default)]
pub struct FrequencyTable {
    entries: Vec<(String, i64)>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a fixed starting vocabulary, every label at count 0.
    ///
    /// Seeds run through the same fold rules as [`record`](Self::record),
    /// so duplicate or near-duplicate seeds collapse into one entry.
    /// Empty seed labels are skipped.
    pub fn with_labels<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut table = Self::new();
        for label in labels {
            if label.is_empty() {
                continue;
            }
            // Cannot fail: label is non-empty and DEFAULT_THRESHOLD is valid.
            let _ = table.record(label, 0, DEFAULT_THRESHOLD);
        }
        table
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical label that `key` should be attributed to.
    ///
    /// Exact matches short-circuit. Otherwise every canonical label `k` is
    /// scored with `levenshtein(key, k) / len(k)` (char counts) and the
    /// minimum taken, scanning in insertion order with a strict `<` so the
    /// earliest-inserted label wins ties. The key folds into that label iff
    /// its normalized distance is strictly below `threshold`; otherwise the
    /// key is returned unchanged and would become a new canonical label on
    /// the next `record`.
    ///
    /// Note the strict comparison: a single-character label at threshold
    /// 0.3 can only be matched exactly (any edit normalizes to >= 1.0).
    ///
    /// Pure with respect to the table; never mutates.
    pub fn resolve<'a>(&'a self, key: &'a str, threshold: f64) -> Result<&'a str, FreqError> {
        validate(key, threshold)?;

        if self.entries.iter().any(|(k, _)| k == key) {
            return Ok(key);
        }

        let mut best: Option<(&str, f64)> = None;
        for (k, _) in &self.entries {
            let d = levenshtein(key, k) as f64 / k.chars().count() as f64;
            match best {
                Some((_, min_d)) if d >= min_d => {}
                _ => best = Some((k, d)),
            }
        }

        match best {
            Some((k, d)) if d < threshold => Ok(k),
            _ => Ok(key),
        }
    }

    /// Resolve `key` and add `delta` to its count, inserting the key as a
    /// new canonical label if nothing folds.
    ///
    /// `delta` may be negative (corrective adjustments); the resulting
    /// count is not clamped — callers needing non-negativity check it
    /// themselves.
    pub fn record(&mut self, key: &str, delta: i64, threshold: f64) -> Result<(), FreqError> {
        let canonical = self.resolve(key, threshold)?.to_owned();
        match self.entries.iter_mut().find(|(k, _)| *k == canonical) {
            Some((_, count)) => *count += delta,
            None => self.entries.push((canonical, delta)),
        }
        Ok(())
    }

    /// `record(key, 1, DEFAULT_THRESHOLD)`.
    pub fn record_one(&mut self, key: &str) -> Result<(), FreqError> {
        self.record(key, 1, DEFAULT_THRESHOLD)
    }

    /// Detached copy of the current label→count mapping. Mutating the copy
    /// never affects the table.
    pub fn snapshot(&self) -> BTreeMap<String, i64> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }
}

fn validate(key: &str, threshold: f64) -> Result<(), FreqError> {
    if key.is_empty() {
        return Err(FreqError::EmptyKey);
    }
    if !(0.0..=1.0).contains(&threshold) {
        return Err(FreqError::BadThreshold(threshold));
    }
    Ok(())
}

/// Char-level Levenshtein distance, unit cost for insert / delete / substitute.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (a_len, b_len) = (a_chars.len(), b_chars.len());

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut matrix = vec![vec![0usize; b_len + 1]; a_len + 1];
    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b_len {
        matrix[0][j] = j;
    }

    for i in 1..=a_len {
        for j in 1..=b_len {
            let cost = usize::from(a_chars[i - 1] != b_chars[j - 1]);
            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
        }
    }

    matrix[a_len][b_len]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("abc", "abd"), 1);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("Diary", "Diairy"), 1);
    }

    #[test]
    fn exact_match_short_circuits_at_any_threshold() {
        let table = FrequencyTable::with_labels(["Diary", "Blog"]);
        for t in [0.0, 0.3, 0.5, 1.0] {
            assert_eq!(table.resolve("Diary", t).unwrap(), "Diary");
        }
    }

    #[test]
    fn empty_table_returns_key_unchanged() {
        let table = FrequencyTable::new();
        assert_eq!(table.resolve("Diary", 0.3).unwrap(), "Diary");
    }

    #[test]
    fn threshold_monotonicity() {
        let table = FrequencyTable::with_labels(["Diary"]);
        // "Diarey" folds at 0.3 (distance 1/5 = 0.2); raising the threshold
        // must never un-fold it.
        assert_eq!(table.resolve("Diarey", 0.3).unwrap(), "Diary");
        for t in [0.4, 0.6, 0.9, 1.0] {
            assert_eq!(table.resolve("Diarey", t).unwrap(), "Diary");
        }
        // And below the qualifying threshold there is no fold.
        assert_eq!(table.resolve("Diarey", 0.2).unwrap(), "Diarey");
    }

    #[test]
    fn repeated_recording_accumulates() {
        let mut table = FrequencyTable::new();
        for _ in 0..3 {
            table.record_one("Diary").unwrap();
        }
        let snap = table.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap["Diary"], 3);
    }

    #[test]
    fn fuzzy_fold_into_existing_label() {
        let mut table = FrequencyTable::with_labels(["Diary", "Blog"]);
        table.record("Diary", 2, DEFAULT_THRESHOLD).unwrap();
        // distance("Diarey", "Diary") = 1, normalized 1/5 = 0.2 < 0.3
        table.record("Diarey", 1, DEFAULT_THRESHOLD).unwrap();
        let snap = table.snapshot();
        assert_eq!(snap["Diary"], 3);
        assert_eq!(snap["Blog"], 0);
        assert_eq!(snap.len(), 2);
    }

    #[test]
    fn no_false_fold_across_distinct_categories() {
        let mut table = FrequencyTable::with_labels(["Diary", "Novel"]);
        table.record("Diary", 1, DEFAULT_THRESHOLD).unwrap();
        table.record("Novel", 1, DEFAULT_THRESHOLD).unwrap();
        table.record("Blog", 1, DEFAULT_THRESHOLD).unwrap();
        let snap = table.snapshot();
        assert_eq!(snap["Diary"], 1);
        assert_eq!(snap["Novel"], 1);
        assert_eq!(snap["Blog"], 1);
        assert_eq!(snap.len(), 3);
    }

    #[test]
    fn single_character_labels_require_exact_match() {
        let mut table = FrequencyTable::with_labels(["A"]);
        // distance 1 normalizes to 1.0, and the comparison is strict, so
        // even threshold 1.0 would not fold; 0.3 certainly does not.
        table.record("B", 1, DEFAULT_THRESHOLD).unwrap();
        let snap = table.snapshot();
        assert_eq!(snap["A"], 0);
        assert_eq!(snap["B"], 1);
    }

    #[test]
    fn negative_delta_is_not_clamped() {
        let mut table = FrequencyTable::new();
        table.record("Diary", 3, DEFAULT_THRESHOLD).unwrap();
        table.record("Diary", -1, DEFAULT_THRESHOLD).unwrap();
        assert_eq!(table.snapshot()["Diary"], 2);
        table.record("Diary", -5, DEFAULT_THRESHOLD).unwrap();
        assert_eq!(table.snapshot()["Diary"], -3);
    }

    #[test]
    fn snapshot_is_isolated_from_the_table() {
        let mut table = FrequencyTable::with_labels(["Diary"]);
        let mut snap = table.snapshot();
        snap.insert("Blog".to_string(), 99);
        *snap.get_mut("Diary").unwrap() = 42;

        table.record_one("Diary").unwrap();
        let fresh = table.snapshot();
        assert_eq!(fresh["Diary"], 1);
        assert!(!fresh.contains_key("Blog"));
    }

    #[test]
    fn ties_resolve_to_the_earliest_inserted_label() {
        // "dog" and "fog" are both distance 1 (normalized 1/3) from "log".
        let table = FrequencyTable::with_labels(["dog", "fog"]);
        assert_eq!(table.resolve("log", 0.5).unwrap(), "dog");

        // Same labels seeded in the opposite order flips the winner.
        let table = FrequencyTable::with_labels(["fog", "dog"]);
        assert_eq!(table.resolve("log", 0.5).unwrap(), "fog");
    }

    #[test]
    fn resolve_is_pure_and_deterministic() {
        let table = FrequencyTable::with_labels(["Diary", "Blog"]);
        let before = table.snapshot();
        let first = table.resolve("Diarey", 0.3).unwrap().to_owned();
        let second = table.resolve("Diarey", 0.3).unwrap().to_owned();
        assert_eq!(first, second);
        assert_eq!(table.snapshot(), before);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let mut table = FrequencyTable::new();
        assert_eq!(table.resolve("", 0.3), Err(FreqError::EmptyKey));
        assert_eq!(table.record("", 1, 0.3), Err(FreqError::EmptyKey));
        assert_eq!(
            table.resolve("Diary", -0.1),
            Err(FreqError::BadThreshold(-0.1))
        );
        assert_eq!(
            table.record("Diary", 1, 1.5),
            Err(FreqError::BadThreshold(1.5))
        );
    }

    #[test]
    fn seeding_folds_near_duplicate_seeds() {
        let table = FrequencyTable::with_labels(["Diary", "Diarey", "Diary"]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.snapshot()["Diary"], 0);
    }
}
