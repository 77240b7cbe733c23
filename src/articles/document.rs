// The Document type and lenient decoding from untyped JSON records.
//
// Collected article files are loose: fields go missing, arrive as null, or
// come back as numbers and lists depending on the source. Every lookup with
// a fallback is a declared optional field here, and every coercion is
// recorded so it can be inspected after loading.

use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::config::TextSource;
use crate::error::PipelineError;

/// One article as it enters the pipeline. Immutable after loading.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    /// Position in the input file
    pub index: usize,
    /// Provider article ID (default: None)
    pub article_id: Option<String>,
    /// Headline (default: "")
    pub title: String,
    /// Summary / lede (default: "")
    pub description: String,
    /// Full body, when the provider supplies it (default: None)
    pub content: Option<String>,
    pub link: Option<String>,
    /// Publisher identifier (default: None)
    pub source_id: Option<String>,
    /// Publication timestamp (default: None)
    pub pub_date: Option<NaiveDateTime>,
    /// Bylines, from `creator` (a list) or `author` (a string) (default: empty)
    pub authors: Vec<String>,
}

impl Document {
    /// Build the text to tokenize from the configured fields.
    ///
    /// Parts are joined with a single space and the result trimmed, so a
    /// document with only a title yields just the title.
    pub fn text(&self, source: TextSource) -> String {
        let title = self.title.as_str();
        let description = self.description.as_str();
        let content = self.content.as_deref().unwrap_or("");
        let parts: Vec<&str> = match source {
            TextSource::TitleAndDescription => vec![title, description],
            TextSource::Content => vec![content],
            TextSource::All => vec![title, description, content],
        };
        parts
            .into_iter()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A non-string value that was turned into a string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coercion {
    pub index: usize,
    pub field: String,
    /// JSON type that was found ("number", "array", ...)
    pub found: &'static str,
}

/// Why a record never made it into the corpus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SkipReason {
    /// The record itself was unusable (not a JSON object)
    Malformed(String),
    /// Title/description/content were all empty
    EmptyText,
    /// Text was present but nothing survived tokenization
    NoTokens,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Malformed(msg) => write!(f, "malformed record: {msg}"),
            SkipReason::EmptyText => f.write_str("empty text"),
            SkipReason::NoTokens => f.write_str("no tokens after preprocessing"),
        }
    }
}

/// A record excluded from the corpus, with its original position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedDocument {
    pub index: usize,
    pub reason: SkipReason,
}

/// Decode one JSON record into a Document.
///
/// Returns the document plus any coercions applied, or a skip reason when the
/// record is not an object at all.
pub fn decode_document(
    index: usize,
    value: &Value,
) -> Result<(Document, Vec<Coercion>), SkipReason> {
    let Value::Object(map) = value else {
        let message = format!("expected object, got {}", json_type(value));
        warn!(
            error = %PipelineError::malformed_input(index, message.as_str()),
            "Skipping article record"
        );
        return Err(SkipReason::Malformed(message));
    };

    let mut coercions = Vec::new();
    let mut field = |names: &[&str]| -> Option<String> {
        let (name, value) = lookup(map, names)?;
        let (text, coerced) = coerce_text(value)?;
        if let Some(found) = coerced {
            warn!(index, field = name, found, "Expected string field, converting");
            coercions.push(Coercion {
                index,
                field: name.to_string(),
                found,
            });
        }
        Some(text)
    };

    let article_id = field(&["article_id", "id"]);
    let title = field(&["title"]).unwrap_or_default();
    let description = field(&["description"]).unwrap_or_default();
    let content = field(&["content"]);
    let link = field(&["link", "url"]);
    let source_id = field(&["source_id", "source_name"]);
    let pub_date = field(&["pubDate", "publishedAt"]).and_then(|raw| parse_pub_date(&raw));
    let authors = lookup(map, &["creator", "author"])
        .map(|(_, value)| author_names(value))
        .unwrap_or_default();

    Ok((
        Document {
            index,
            article_id,
            title,
            description,
            content,
            link,
            source_id,
            pub_date,
            authors,
        },
        coercions,
    ))
}

/// First present key among `names`.
fn lookup<'m, 'n>(
    map: &'m Map<String, Value>,
    names: &[&'n str],
) -> Option<(&'n str, &'m Value)> {
    names
        .iter()
        .find_map(|name| map.get(*name).map(|v| (*name, v)))
}

/// Turn any JSON value into text.
///
/// Strings pass through. `null` counts as missing. Everything else becomes
/// its string representation (arrays of strings are joined with ", ") and
/// the original JSON type is reported so the caller can log it.
pub fn coerce_text(value: &Value) -> Option<(String, Option<&'static str>)> {
    match value {
        Value::Null => None,
        Value::String(s) => Some((s.clone(), None)),
        Value::Array(items) if items.iter().all(Value::is_string) => {
            let joined = items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            Some((joined, Some("array")))
        }
        other => Some((other.to_string(), Some(json_type(other)))),
    }
}

/// Author names from a byline field. Non-string entries and blanks are
/// dropped; a byline is never coerced.
fn author_names(value: &Value) -> Vec<String> {
    let names: Vec<&str> = match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    names
        .into_iter()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parse `2024-09-12 10:30:00` (NewsData) or RFC 3339 timestamps.
pub fn parse_pub_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_full_record() {
        let record = json!({
            "article_id": "abc",
            "title": "Il governo annuncia nuove misure",
            "description": "Il primo ministro",
            "pubDate": "2024-09-12 10:30:00",
            "source_id": "ansa"
        });
        let (doc, coercions) = decode_document(3, &record).unwrap();
        assert_eq!(doc.index, 3);
        assert_eq!(doc.article_id.as_deref(), Some("abc"));
        assert_eq!(doc.source_id.as_deref(), Some("ansa"));
        assert!(doc.pub_date.is_some());
        assert!(coercions.is_empty());
    }

    #[test]
    fn test_missing_and_null_fields_default() {
        let (doc, coercions) = decode_document(0, &json!({"title": null})).unwrap();
        assert_eq!(doc.title, "");
        assert_eq!(doc.description, "");
        assert!(doc.content.is_none());
        assert!(coercions.is_empty());
    }

    #[test]
    fn test_non_string_title_is_coerced_and_recorded() {
        let (doc, coercions) =
            decode_document(7, &json!({"title": 42, "description": true})).unwrap();
        assert_eq!(doc.title, "42");
        assert_eq!(doc.description, "true");
        assert_eq!(coercions.len(), 2);
        assert_eq!(coercions[0].field, "title");
        assert_eq!(coercions[0].found, "number");
        assert_eq!(coercions[1].found, "boolean");
    }

    #[test]
    fn test_non_object_is_skipped() {
        let err = decode_document(1, &json!("just a string")).unwrap_err();
        assert!(matches!(err, SkipReason::Malformed(_)));
    }

    #[test]
    fn test_authors_from_creator_or_author() {
        let (doc, coercions) = decode_document(
            0,
            &json!({"title": "x", "creator": ["Mario Rossi", " ", 3, "Anna Bianchi"]}),
        )
        .unwrap();
        assert_eq!(doc.authors, vec!["Mario Rossi", "Anna Bianchi"]);
        assert!(coercions.is_empty());

        let (doc, _) = decode_document(1, &json!({"author": "Redazione"})).unwrap();
        assert_eq!(doc.authors, vec!["Redazione"]);

        let (doc, _) = decode_document(2, &json!({"creator": null})).unwrap();
        assert!(doc.authors.is_empty());
    }

    #[test]
    fn test_text_sources() {
        let doc = Document {
            title: " Titolo ".to_string(),
            description: String::new(),
            content: Some("Corpo".to_string()),
            ..Default::default()
        };
        assert_eq!(doc.text(TextSource::TitleAndDescription), "Titolo");
        assert_eq!(doc.text(TextSource::Content), "Corpo");
        assert_eq!(doc.text(TextSource::All), "Titolo Corpo");
    }

    #[test]
    fn test_parse_pub_date_formats() {
        assert!(parse_pub_date("2024-09-12 10:30:00").is_some());
        assert!(parse_pub_date("2024-09-12T10:30:00Z").is_some());
        assert!(parse_pub_date("yesterday").is_none());
    }
}
