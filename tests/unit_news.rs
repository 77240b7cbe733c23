// Unit tests for the NewsData.io response types and the article store.
//
// No network access: responses are built with serde_json::json! and run
// through the same deserialization the client uses. The pagination loop is
// driven by a scripted page source.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use notizie::articles;
use notizie::news::client::{
    collect_news, ApiResponse, NewsPageSource, NewsQuery, NewsSource, StoredArticle,
};
use notizie::news::store;
use serde_json::{json, Value};

/// Replays canned pages in order and records the params of every request.
/// `Err` entries stand in for transport failures.
struct ScriptedPages {
    pages: Mutex<VecDeque<std::result::Result<Value, String>>>,
    requests: Mutex<Vec<Vec<(String, String)>>>,
}

impl ScriptedPages {
    fn new(pages: Vec<std::result::Result<Value, String>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<Vec<(String, String)>> {
        self.requests.lock().unwrap().clone()
    }

    fn cursor(request: &[(String, String)]) -> Option<&str> {
        request
            .iter()
            .find(|(key, _)| key == "page")
            .map(|(_, value)| value.as_str())
    }
}

#[async_trait]
impl NewsPageSource for ScriptedPages {
    async fn fetch_page(&self, params: &[(&str, String)]) -> Result<ApiResponse> {
        self.requests.lock().unwrap().push(
            params
                .iter()
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect(),
        );
        let page = self
            .pages
            .lock()
            .unwrap()
            .pop_front()
            .expect("no more scripted pages");
        match page {
            Ok(body) => Ok(serde_json::from_value(body)?),
            Err(message) => anyhow::bail!(message),
        }
    }
}

fn page(ids: &[&str], next: Option<&str>) -> std::result::Result<Value, String> {
    let results: Vec<Value> = ids
        .iter()
        .map(|id| json!({"article_id": id, "title": format!("Articolo {id}")}))
        .collect();
    let mut body = json!({"status": "success", "results": results});
    if let Some(next) = next {
        body["nextPage"] = json!(next);
    }
    Ok(body)
}

fn ids(articles: &[StoredArticle]) -> Vec<&str> {
    articles
        .iter()
        .filter_map(|a| a.article_id.as_deref())
        .collect()
}

#[test]
fn success_page_deserializes() {
    let resp: ApiResponse = serde_json::from_value(json!({
        "status": "success",
        "totalResults": 120,
        "results": [
            {"article_id": "1", "title": "Primo", "description": "Uno"},
            {"article_id": "2", "title": "Secondo", "description": null}
        ],
        "nextPage": "17283"
    }))
    .unwrap();

    assert!(resp.is_success());
    assert_eq!(resp.items().len(), 2);
    assert_eq!(resp.total_results, Some(120));
    assert_eq!(resp.next_page.as_deref(), Some("17283"));
}

#[test]
fn last_page_has_no_cursor() {
    let resp: ApiResponse = serde_json::from_value(json!({
        "status": "success",
        "results": []
    }))
    .unwrap();
    assert!(resp.next_page.is_none());
    assert!(resp.items().is_empty());
}

#[test]
fn error_envelope_reports_message() {
    let resp: ApiResponse = serde_json::from_value(json!({
        "status": "error",
        "results": {"message": "Rate limit exceeded", "code": "RateLimitExceeded"}
    }))
    .unwrap();
    assert!(!resp.is_success());
    assert_eq!(resp.error_message(), "Rate limit exceeded");
}

// ============================================================
// Pagination
// ============================================================

#[tokio::test]
async fn collection_stops_when_credits_run_out() {
    let source = ScriptedPages::new(vec![
        page(&["1", "2"], Some("p2")),
        page(&["3"], Some("p3")),
        page(&["4"], Some("p4")),
    ]);
    let collection = collect_news(&source, &NewsQuery::new("it"), 2)
        .await
        .unwrap();

    assert_eq!(collection.credits_used, 2);
    assert_eq!(ids(&collection.articles), vec!["1", "2", "3"]);
    assert!(collection.stopped_by.is_none());

    let requests = source.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(ScriptedPages::cursor(&requests[0]), None);
    assert_eq!(ScriptedPages::cursor(&requests[1]), Some("p2"));
}

#[tokio::test]
async fn collection_stops_without_a_cursor() {
    let source = ScriptedPages::new(vec![
        page(&["1"], Some("p2")),
        page(&["2"], None),
        page(&["never"], None),
    ]);
    let collection = collect_news(&source, &NewsQuery::new("it"), 12)
        .await
        .unwrap();

    assert_eq!(collection.credits_used, 2);
    assert_eq!(ids(&collection.articles), vec!["1", "2"]);
    assert!(collection.stopped_by.is_none());
    assert_eq!(source.requests().len(), 2);
}

#[tokio::test]
async fn error_status_keeps_earlier_pages() {
    let source = ScriptedPages::new(vec![
        page(&["1", "2"], Some("p2")),
        Ok(json!({
            "status": "error",
            "results": {"message": "Rate limit exceeded", "code": "RateLimitExceeded"}
        })),
    ]);
    let collection = collect_news(&source, &NewsQuery::new("it"), 12)
        .await
        .unwrap();

    assert_eq!(collection.credits_used, 1);
    assert_eq!(ids(&collection.articles), vec!["1", "2"]);
    assert_eq!(collection.stopped_by.as_deref(), Some("Rate limit exceeded"));
}

#[tokio::test]
async fn transport_failure_keeps_earlier_pages() {
    let source = ScriptedPages::new(vec![
        page(&["1"], Some("p2")),
        page(&["2"], Some("p3")),
        Err("connection reset".to_string()),
    ]);
    let collection = collect_news(&source, &NewsQuery::new("it"), 12)
        .await
        .unwrap();

    assert_eq!(collection.credits_used, 2);
    assert_eq!(ids(&collection.articles), vec!["1", "2"]);
    assert!(collection
        .stopped_by
        .as_deref()
        .is_some_and(|reason| reason.contains("connection reset")));
}

#[test]
fn query_params_skip_unset_filters() {
    let query = NewsQuery {
        language: "it".to_string(),
        country: None,
        category: Some("politics".to_string()),
    };
    assert_eq!(
        query.params(),
        vec![
            ("language", "it".to_string()),
            ("category", "politics".to_string())
        ]
    );
}

#[test]
fn sources_deserialize_with_defaults() {
    let sources: Vec<NewsSource> = serde_json::from_value(json!([
        {"id": "ansa", "name": "ANSA", "url": "https://www.ansa.it", "category": ["top"], "language": ["italian"]},
        {"id": "minimal"}
    ]))
    .unwrap();
    assert_eq!(sources[0].name, "ANSA");
    assert!(sources[1].url.is_empty());
}

#[test]
fn stored_articles_load_back_as_documents() {
    let raw = json!({
        "article_id": "abc",
        "title": "Il governo annuncia nuove misure",
        "description": "Il primo ministro proviene da Roma",
        "pubDate": "2024-10-01 08:30:00",
        "source_id": "ansa",
        "creator": ["Redazione"],
        "country": ["italy"],
        "image_url": "https://example.invalid/img.jpg"
    });
    let stored = vec![StoredArticle::from_api(&raw)];

    let dir = std::env::temp_dir().join(format!("notizie-news-{}", std::process::id()));
    let date = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
    let path = store::articles_path(&dir, date);
    store::save_json(&path, &stored).unwrap();

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(saved[0].get("image_url").is_none());
    assert_eq!(saved[0]["pubDate"], "2024-10-01 08:30:00");

    let report = articles::load_articles(&path).unwrap();
    assert_eq!(report.documents.len(), 1);
    let doc = &report.documents[0];
    assert_eq!(doc.article_id.as_deref(), Some("abc"));
    assert_eq!(doc.source_id.as_deref(), Some("ansa"));
    assert!(doc.pub_date.is_some());

    assert_eq!(store::latest_articles_file(&dir).unwrap(), Some(path));
    std::fs::remove_dir_all(&dir).unwrap();
}
