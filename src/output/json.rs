// JSON export of a fitted model, for dashboards and later inspection.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use crate::articles::SkippedDocument;
use crate::pipeline::PipelineOutput;
use crate::topics::selection::CandidateScore;

#[derive(Debug, Serialize)]
pub struct ModelExport<'a> {
    pub num_topics: usize,
    pub alpha: f64,
    pub beta: f64,
    pub iterations: usize,
    pub seed: u64,
    pub vocabulary: &'a [String],
    pub topics: Vec<TopicExport<'a>>,
    pub documents: Vec<DocumentExport>,
    /// K × V
    pub topic_term: &'a [Vec<f64>],
    /// N × K, rows follow `documents`
    pub doc_topic: &'a [Vec<f64>],
    pub selection: Option<SelectionExport>,
    pub skipped: &'a [SkippedDocument],
}

#[derive(Debug, Serialize)]
pub struct TopicExport<'a> {
    pub topic: usize,
    pub prevalence: f64,
    pub top_terms: Vec<TermWeight<'a>>,
}

#[derive(Debug, Serialize)]
pub struct TermWeight<'a> {
    pub term: &'a str,
    pub weight: f64,
}

#[derive(Debug, Serialize)]
pub struct DocumentExport {
    /// Position in the input file
    pub source_index: usize,
    pub dominant_topic: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SelectionExport {
    pub measure: String,
    pub best_k: usize,
    pub fallback: bool,
    pub candidates: Vec<CandidateExport>,
}

#[derive(Debug, Serialize)]
pub struct CandidateExport {
    pub k: usize,
    /// None when the candidate failed
    pub score: Option<f64>,
    pub error: Option<String>,
}

impl<'a> ModelExport<'a> {
    pub fn new(output: &'a PipelineOutput, top_n: usize) -> Self {
        let model = &output.model;
        let prevalence = model.topic_prevalence();

        let topics = (0..model.num_topics())
            .map(|topic| TopicExport {
                topic,
                prevalence: prevalence[topic],
                top_terms: model
                    .top_terms(topic, top_n, &output.corpus.vocabulary)
                    .into_iter()
                    .map(|(term, weight)| TermWeight { term, weight })
                    .collect(),
            })
            .collect();

        let documents = output
            .preprocess
            .processed
            .iter()
            .enumerate()
            .map(|(row, doc)| DocumentExport {
                source_index: doc.source_index,
                dominant_topic: model.dominant_topic(row),
            })
            .collect();

        let selection = output.selection.as_ref().map(|sel| SelectionExport {
            measure: sel.measure.to_string(),
            best_k: sel.best_k,
            fallback: sel.fallback,
            candidates: sel
                .candidates
                .iter()
                .map(|c| match &c.score {
                    CandidateScore::Score(s) => CandidateExport {
                        k: c.k,
                        score: Some(*s),
                        error: None,
                    },
                    CandidateScore::Unavailable(e) => CandidateExport {
                        k: c.k,
                        score: None,
                        error: Some(e.to_string()),
                    },
                })
                .collect(),
        });

        Self {
            num_topics: model.num_topics(),
            alpha: model.alpha,
            beta: model.beta,
            iterations: model.iterations,
            seed: model.seed,
            vocabulary: output.corpus.vocabulary.tokens(),
            topics,
            documents,
            topic_term: &model.topic_term,
            doc_topic: &model.doc_topic,
            selection,
            skipped: &output.preprocess.skipped,
        }
    }
}

/// `<output_dir>/topics-<date>.json`
pub fn export_path(output_dir: &Path, date: NaiveDate) -> PathBuf {
    output_dir.join(format!("topics-{}.json", date.format("%Y-%m-%d")))
}

/// Serialize the export and write it, creating the directory if needed.
pub fn write_export(export: &ModelExport<'_>, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(export).context("Failed to serialize model export")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
