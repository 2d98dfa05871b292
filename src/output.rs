//! The fixed result schema shared by every pipeline.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// One transformed corpus item. `kind` identifies the pipeline that
/// produced it ("narration", "overall_summary", ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformedRecord {
    pub original_text: String,
    pub transformed_text: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub tag: Vec<String>,
}

/// Write the records as a pretty-printed JSON array, creating parent
/// directories as needed.
pub fn save_records(path: &Path, records: &[TransformedRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let out = serde_json::to_string_pretty(records)?;
    fs::write(path, out).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_as_type() {
        let rec = TransformedRecord {
            original_text: "orig".into(),
            transformed_text: "summary".into(),
            kind: "overall_summary".into(),
            tag: vec![],
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["type"], "overall_summary");
        assert!(json.get("kind").is_none());
        assert_eq!(json["tag"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = std::env::temp_dir().join("genre_transformation_out_test");
        fs::remove_dir_all(&dir).ok();
        let path = dir.join("nested").join("narration.json");

        let records = vec![TransformedRecord {
            original_text: "a".into(),
            transformed_text: "b".into(),
            kind: "narration".into(),
            tag: vec!["checked".into()],
        }];
        save_records(&path, &records).unwrap();

        let data = fs::read_to_string(&path).unwrap();
        let parsed: Vec<TransformedRecord> = serde_json::from_str(&data).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].kind, "narration");
        fs::remove_dir_all(&dir).ok();
    }
}
