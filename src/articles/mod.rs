// Article ingestion — the typed Document and the JSON file loader.

pub mod document;

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};

pub use document::{Coercion, Document, SkipReason, SkippedDocument};

/// Everything that came out of reading one articles file.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Usable records, in file order
    pub documents: Vec<Document>,
    /// Records that were not objects
    pub skipped: Vec<SkippedDocument>,
    /// Fields that held non-string values and were converted
    pub coercions: Vec<Coercion>,
}

/// Read an articles file (one JSON array of objects) wholesale.
pub fn load_articles(path: &Path) -> Result<LoadReport> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read articles file {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let report = parse_articles(&value)?;

    info!(
        path = %path.display(),
        documents = report.documents.len(),
        skipped = report.skipped.len(),
        coerced = report.coercions.len(),
        "Loaded articles"
    );

    Ok(report)
}

/// Decode an already-parsed JSON array into Documents.
///
/// Only a non-array top level is an error. Bad records are skipped and bad
/// fields are coerced, both recorded in the report.
pub fn parse_articles(value: &Value) -> Result<LoadReport> {
    let Value::Array(records) = value else {
        anyhow::bail!("Articles file must contain a JSON array of objects");
    };

    let mut report = LoadReport::default();
    for (index, record) in records.iter().enumerate() {
        match document::decode_document(index, record) {
            Ok((doc, coercions)) => {
                report.documents.push(doc);
                report.coercions.extend(coercions);
            }
            Err(reason) => report.skipped.push(SkippedDocument { index, reason }),
        }
    }

    if !report.coercions.is_empty() {
        warn!(
            count = report.coercions.len(),
            "Some article fields were not strings and were converted"
        );
    }

    Ok(report)
}

/// How many articles carry each author, most frequent first. Ties are
/// ordered by name. Each article counts once per distinct author.
pub fn author_counts(documents: &[Document]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for doc in documents {
        let mut seen: Vec<&str> = Vec::new();
        for name in &doc.authors {
            if !seen.contains(&name.as_str()) {
                seen.push(name);
                *counts.entry(name).or_insert(0) += 1;
            }
        }
    }

    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_mixed_records() {
        let value = json!([
            {"title": "Primo", "description": "articolo"},
            17,
            {"title": ["a", "b"]},
        ]);
        let report = parse_articles(&value).unwrap();
        assert_eq!(report.documents.len(), 2);
        assert_eq!(report.documents[1].index, 2);
        assert_eq!(report.documents[1].title, "a, b");
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].index, 1);
        assert_eq!(report.coercions.len(), 1);
    }

    #[test]
    fn test_non_array_fails() {
        assert!(parse_articles(&json!({"title": "x"})).is_err());
    }
}
