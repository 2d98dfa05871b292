//! Toolkit for turning a JSON-lines text corpus into derived artifacts
//! (summaries, narrative rewrites, thesis statements) by prompting the
//! Gemini generative-language API.
//!
//! The binaries under `src/bin/` are the pipelines; the library holds the
//! shared pieces, most notably [`freq::FrequencyTable`], the fuzzy-folding
//! tally that steers narrative-type selection toward under-represented
//! categories.

pub mod dataset;
pub mod extract;
pub mod freq;
pub mod gemini;
pub mod output;
