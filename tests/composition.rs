// Composition tests — verifying that the pipeline stages chain together.
//
// These tests exercise the data flow between modules:
//   JSON records -> Documents -> Tokenizer -> Corpus -> LDA -> Selection -> Export
// without any network calls. The export test writes under the temp dir.

use notizie::articles;
use notizie::config::{PipelineConfig, TopicCount};
use notizie::error::PipelineError;
use notizie::output::json::{write_export, ModelExport};
use notizie::output::truncate_chars;
use notizie::pipeline::{self, CancellationToken};
use notizie::topics::selection::SelectionConfig;
use notizie::topics::GibbsLda;
use serde_json::json;

fn fixed(k: usize) -> PipelineConfig {
    PipelineConfig {
        topics: TopicCount::Fixed(k),
        lda: GibbsLda {
            iterations: 100,
            ..GibbsLda::default()
        },
        ..PipelineConfig::default()
    }
}

// ============================================================
// End to end: Italian articles -> two-topic model
// ============================================================

#[test]
fn italian_articles_fit_two_topics() {
    let records = json!([
        {"title": "Il governo annuncia nuove misure", "description": "Il primo ministro proviene da Roma"},
        {"title": "La squadra vince il campionato", "description": "Grande vittoria per i tifosi"}
    ]);
    let report = articles::parse_articles(&records).unwrap();
    let output = pipeline::run(&report.documents, &fixed(2), &CancellationToken::new()).unwrap();

    assert_eq!(output.preprocess.processed.len(), 2);
    for doc in &output.preprocess.processed {
        assert!(!doc.tokens.is_empty());
        for dropped in ["il", "per", "i", "la", "proviene", "da", "roma"] {
            assert!(
                !doc.tokens.iter().any(|t| t == dropped),
                "{dropped} survived in {:?}",
                doc.tokens
            );
        }
    }

    let model = &output.model;
    assert_eq!(model.doc_topic.len(), 2);
    for row in &model.doc_topic {
        assert_eq!(row.len(), 2);
        assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-6);
    }
    assert!(output.selection.is_none());
}

#[test]
fn all_empty_corpus_is_reported() {
    let records = json!([
        {"title": "", "description": "   "},
        {"title": "Il la per", "description": null},
        {"description": "2024"}
    ]);
    let report = articles::parse_articles(&records).unwrap();
    let err = pipeline::run(&report.documents, &fixed(2), &CancellationToken::new()).unwrap_err();
    assert!(matches!(err, PipelineError::EmptyCorpus { .. }));
}

#[test]
fn empty_documents_are_dropped_not_padded() {
    let records = json!([
        {"title": "Borsa Milano mercati rialzo"},
        {"title": ""},
        {"title": "Squadra campionato tifosi stadio"}
    ]);
    let report = articles::parse_articles(&records).unwrap();
    let output = pipeline::run(&report.documents, &fixed(2), &CancellationToken::new()).unwrap();

    assert_eq!(output.model.num_documents(), 2);
    assert_eq!(output.source_index(0), Some(0));
    assert_eq!(output.source_index(1), Some(2));
    assert_eq!(output.preprocess.skipped.len(), 1);
    assert_eq!(output.preprocess.skipped[0].index, 1);
}

// ============================================================
// Sweep -> export
// ============================================================

#[test]
fn sweep_then_export() {
    let records = json!([
        {"title": "Calcio squadra campionato", "description": "Gol allenatore tifosi"},
        {"title": "Squadra vittoria stadio", "description": "Tifosi campionato partita"},
        {"title": "Parlamento legge senato", "description": "Riforma voto ministro"},
        {"title": "Senato riforma decreto", "description": "Ministro legge parlamento"}
    ]);
    let report = articles::parse_articles(&records).unwrap();
    let config = PipelineConfig {
        topics: TopicCount::Select(SelectionConfig {
            k_min: 2,
            k_max: 3,
            top_n: 5,
            ..SelectionConfig::default()
        }),
        lda: GibbsLda {
            iterations: 100,
            ..GibbsLda::default()
        },
        ..PipelineConfig::default()
    };

    let output = pipeline::run(&report.documents, &config, &CancellationToken::new()).unwrap();
    let selection = output.selection.as_ref().unwrap();
    assert_eq!(selection.candidates.len(), 2);
    assert_eq!(output.model.num_topics(), selection.best_k);

    let path = std::env::temp_dir()
        .join(format!("notizie-export-{}", std::process::id()))
        .join("topics.json");
    let export = ModelExport::new(&output, 5);
    write_export(&export, &path).unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["num_topics"], selection.best_k);
    assert_eq!(written["documents"].as_array().unwrap().len(), 4);
    assert_eq!(written["selection"]["candidates"].as_array().unwrap().len(), 2);
    assert_eq!(
        written["vocabulary"].as_array().unwrap().len(),
        output.corpus.vocab_size()
    );

    if let Some(dir) = path.parent() {
        std::fs::remove_dir_all(dir).unwrap();
    }
}

#[test]
fn long_titles_truncate_on_char_boundaries() {
    let title = "Perché l'Italia è così attenta alle città d'arte: un'analisi approfondita";
    let short = truncate_chars(title, 20);
    assert!(short.ends_with("..."));
    assert_eq!(short.chars().count(), 23);
}
