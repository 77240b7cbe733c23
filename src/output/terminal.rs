// Colored terminal output for topics, sweeps and article listings.
//
// This module handles all terminal-specific formatting: colors, tables and
// bar charts. The main.rs command handlers delegate here.

use colored::Colorize;

use crate::articles::{Document, SkippedDocument};
use crate::news::NewsSource;
use crate::pipeline::PipelineOutput;
use crate::topics::selection::{CandidateScore, Selection};

const BAR_WIDTH: usize = 20;

/// Display each topic's prevalence as a bar chart with its top terms.
pub fn display_topics(output: &PipelineOutput, top_n: usize) {
    let model = &output.model;
    let prevalence = model.topic_prevalence();

    println!(
        "\n{}",
        format!(
            "=== {} Topics (from {} articles, {} terms) ===",
            model.num_topics(),
            output.corpus.num_documents(),
            output.corpus.vocab_size()
        )
        .bold()
    );
    println!();

    for (topic, weight) in prevalence.iter().enumerate() {
        let filled = (weight * BAR_WIDTH as f64).round() as usize;
        let empty = BAR_WIDTH.saturating_sub(filled);
        let bar = format!("[{}{}]", "=".repeat(filled), " ".repeat(empty));

        let colored_bar = if *weight >= 0.25 {
            bar.bright_green()
        } else if *weight >= 0.10 {
            bar.bright_yellow()
        } else {
            bar.bright_blue()
        };

        println!(
            "  {:>2}. {:<12} {} {:.2}",
            topic + 1,
            format!("Topic {}", topic + 1).bold(),
            colored_bar,
            weight
        );

        let terms: Vec<String> = model
            .top_terms(topic, top_n, &output.corpus.vocabulary)
            .iter()
            .map(|(term, w)| format!("{term} ({w:.3})"))
            .collect();
        println!("      Terms: {}", terms.join(", ").dimmed());
        println!();
    }
}

/// Display the coherence sweep: one row per candidate K.
pub fn display_selection(selection: &Selection) {
    println!(
        "\n{}",
        format!(
            "=== Topic Count Sweep ({} coherence, {} candidates) ===",
            selection.measure,
            selection.candidates.len()
        )
        .bold()
    );
    println!();
    println!("  {:>4}  {:>10}  {}", "K".dimmed(), "Score".dimmed(), "".dimmed());
    println!("  {}", "-".repeat(40).dimmed());

    for candidate in &selection.candidates {
        let marker = if !selection.fallback && candidate.k == selection.best_k {
            "<- best".green().bold()
        } else {
            "".normal()
        };
        match &candidate.score {
            CandidateScore::Score(score) => {
                println!("  {:>4}  {:>10.4}  {}", candidate.k, score, marker);
            }
            CandidateScore::Unavailable(err) => {
                println!(
                    "  {:>4}  {:>10}  {}",
                    candidate.k,
                    "n/a".yellow(),
                    super::truncate_chars(&err.to_string(), 60).dimmed()
                );
            }
        }
    }

    if selection.fallback {
        println!(
            "\n  {} No candidate could be scored; using the default of {} topics",
            "!".bright_red(),
            selection.best_k
        );
    }
    println!();
}

/// Display the articles each topic dominates, most confident first.
pub fn display_topic_articles(output: &PipelineOutput, documents: &[Document], per_topic: usize) {
    let model = &output.model;

    for topic in 0..model.num_topics() {
        let mut rows: Vec<(usize, f64)> = (0..model.num_documents())
            .filter(|&row| model.dominant_topic(row) == Some(topic))
            .map(|row| (row, model.doc_topic[row][topic]))
            .collect();
        rows.sort_by(|a, b| b.1.total_cmp(&a.1));

        println!(
            "  {} ({} articles)",
            format!("Topic {}", topic + 1).bold(),
            rows.len()
        );
        for (row, weight) in rows.into_iter().take(per_topic) {
            let title = output
                .source_index(row)
                .and_then(|index| documents.iter().find(|d| d.index == index))
                .map(|d| d.title.as_str())
                .unwrap_or("");
            println!(
                "      {:.2}  {}",
                weight,
                super::truncate_chars(title, 90).dimmed()
            );
        }
        println!();
    }
}

/// Summarize the documents that never made it into the corpus.
pub fn display_skipped(skipped: &[SkippedDocument]) {
    if skipped.is_empty() {
        return;
    }
    println!(
        "  {} {} articles excluded from the corpus",
        "~".yellow(),
        skipped.len()
    );
    for doc in skipped.iter().take(10) {
        println!("      #{:<5} {}", doc.index, doc.reason.to_string().dimmed());
    }
    if skipped.len() > 10 {
        println!("      ... and {} more", skipped.len() - 10);
    }
    println!();
}

/// Display one page of article summaries, numbered from `start`.
pub fn display_article_summaries(documents: &[Document], start: usize) {
    for (offset, doc) in documents.iter().enumerate() {
        println!("\n{}", format!("Article {}:", start + offset + 1).bold());
        println!("  Title:       {}", non_empty(&doc.title));
        println!(
            "  Source:      {}",
            doc.source_id.as_deref().unwrap_or("N/A")
        );
        println!(
            "  Published:   {}",
            doc.pub_date
                .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "N/A".to_string())
        );
        println!(
            "  Description: {}",
            super::truncate_chars(non_empty(&doc.description), 100).dimmed()
        );
    }
}

/// Display a source listing.
pub fn display_sources(sources: &[NewsSource]) {
    println!(
        "\n{}",
        format!("=== {} News Sources ===", sources.len()).bold()
    );
    println!();
    for source in sources {
        println!("  {:<24} {}", source.id.bold(), source.name);
        if !source.url.is_empty() {
            println!("  {:<24} {}", "", source.url.dimmed());
        }
    }
    println!();
}

/// Author frequency listing, most prolific first.
pub fn display_authors(counts: &[(String, usize)], articles: usize) {
    println!(
        "\n{}",
        format!("=== {} Authors (from {} articles) ===", counts.len(), articles).bold()
    );
    println!();
    if counts.is_empty() {
        println!("  {}", "No bylines in this file.".dimmed());
    }
    for (name, count) in counts {
        let noun = if *count == 1 { "article" } else { "articles" };
        println!("  {:<32} {} {noun}", name.bold(), count);
    }
    println!();
}

fn non_empty(text: &str) -> &str {
    if text.trim().is_empty() {
        "N/A"
    } else {
        text
    }
}
