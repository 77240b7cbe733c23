use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

use notizie::articles::{self, LoadReport};
use notizie::config::{Config, Language, PipelineConfig, TextSource, TopicCount};
use notizie::news::{client, store, NewsDataClient, NewsQuery};
use notizie::output::{json, terminal};
use notizie::pipeline::{self, CancellationToken, PipelineOutput};
use notizie::topics::coherence::CoherenceMeasure;
use notizie::topics::selection::SelectionConfig;

/// Notizie: topic modeling for Italian news.
///
/// Collects articles from NewsData.io, preprocesses them, and fits LDA
/// topic models, choosing the number of topics by coherence.
#[derive(Parser)]
#[command(name = "notizie", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch articles from NewsData.io into data/articles_<date>.json
    Collect {
        /// Article language (default: NOTIZIE_LANGUAGE or "it")
        #[arg(long)]
        language: Option<String>,

        /// Country code filter (e.g. "it")
        #[arg(long, default_value = "it")]
        country: String,

        /// Category filter (e.g. "politics")
        #[arg(long)]
        category: Option<String>,

        /// Pages to request; each page costs one credit (default: 12)
        #[arg(long, default_value_t = client::DEFAULT_MAX_CREDITS)]
        max_credits: usize,
    },

    /// List the news sources available for a language and country
    Sources {
        #[arg(long)]
        language: Option<String>,

        #[arg(long, default_value = "it")]
        country: String,
    },

    /// Show summaries of collected articles
    View {
        #[command(flatten)]
        input: InputArgs,

        /// Articles per page (default: 5)
        #[arg(long, default_value = "5")]
        count: usize,

        /// Page to show, starting at 1
        #[arg(long, default_value = "1")]
        page: usize,
    },

    /// Count articles per author in a collected file
    Authors {
        #[command(flatten)]
        input: InputArgs,

        /// Show only the N most frequent authors
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Fit a topic model and export it
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        model: ModelArgs,

        /// Fit exactly this many topics instead of sweeping K
        #[arg(long)]
        topics: Option<usize>,

        /// Skip the JSON export
        #[arg(long)]
        no_export: bool,

        /// Export path (default: <output dir>/topics-<date>.json)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Sweep the number of topics and show the coherence of each
    Sweep {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        model: ModelArgs,

        /// Coherence measure: c_v or u_mass
        #[arg(long, default_value = "c_v")]
        measure: String,

        /// Fit candidates one at a time
        #[arg(long)]
        sequential: bool,
    },
}

#[derive(clap::Args)]
struct InputArgs {
    /// Articles file to read (default: the latest in the data directory)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Read data/articles_<date>.json (YYYY-MM-DD)
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(clap::Args)]
struct ModelArgs {
    /// Smallest K to try
    #[arg(long)]
    k_min: Option<usize>,

    /// Largest K to try (inclusive)
    #[arg(long)]
    k_max: Option<usize>,

    /// Step between candidate K values
    #[arg(long)]
    k_step: Option<usize>,

    /// Apply the Snowball stemmer
    #[arg(long)]
    stem: bool,

    /// Use the regex tokenizer only
    #[arg(long)]
    no_library_tokenizer: bool,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Gibbs sampling sweeps (default: 500)
    #[arg(long)]
    iterations: Option<usize>,

    /// Top terms shown (and scored) per topic
    #[arg(long, default_value = "10")]
    top_terms: usize,

    /// Tokenize the article body instead of title + description
    #[arg(long)]
    content: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("notizie=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Collect {
            language,
            country,
            category,
            max_credits,
        } => {
            config.require_api_key()?;
            let language = resolve_language(language.as_deref(), &config)?;
            let client = NewsDataClient::new(&config.newsdata_base_url, &config.newsdata_api_key)?;

            let query = NewsQuery {
                language: language.code().to_string(),
                country: Some(country).filter(|c| !c.is_empty()),
                category,
            };
            println!("Collecting {language} news ({max_credits} credits)...");
            let collection = client.fetch_news(&query, max_credits).await?;

            if let Some(reason) = &collection.stopped_by {
                println!("  {} Stopped early: {}", "!".bright_red(), reason);
            }
            if collection.articles.is_empty() {
                println!("No articles fetched.");
                return Ok(());
            }

            let path = store::articles_path(&config.data_dir, Local::now().date_naive());
            store::save_json(&path, &collection.articles)?;
            println!(
                "Saved {} articles to {} ({} credits used)",
                collection.articles.len(),
                path.display(),
                collection.credits_used
            );
        }

        Commands::Sources { language, country } => {
            config.require_api_key()?;
            let language = resolve_language(language.as_deref(), &config)?;
            let client = NewsDataClient::new(&config.newsdata_base_url, &config.newsdata_api_key)?;

            let country = Some(country.as_str()).filter(|c| !c.is_empty());
            let sources = client.fetch_sources(language.code(), country).await?;
            terminal::display_sources(&sources);

            let path = store::sources_path(&config.data_dir, language.code(), Local::now().date_naive());
            store::save_json(&path, &sources)?;
            println!("Saved {} sources to {}", sources.len(), path.display());
        }

        Commands::View { input, count, page } => {
            let path = resolve_input(&input, &config)?;
            let report = articles::load_articles(&path)?;
            println!("Viewing articles from: {}", path.display());
            println!("Total articles: {}", report.documents.len());

            let count = count.max(1);
            let start = page.saturating_sub(1) * count;
            if start >= report.documents.len() {
                println!("No more articles to display.");
                return Ok(());
            }
            let end = (start + count).min(report.documents.len());
            terminal::display_article_summaries(&report.documents[start..end], start);
            if end < report.documents.len() {
                println!("\nNext page: --page {}", page.max(1) + 1);
            }
        }

        Commands::Authors { input, limit } => {
            let path = resolve_input(&input, &config)?;
            let report = articles::load_articles(&path)?;
            let mut counts = articles::author_counts(&report.documents);
            if let Some(limit) = limit {
                counts.truncate(limit);
            }
            terminal::display_authors(&counts, report.documents.len());
        }

        Commands::Analyze {
            input,
            model,
            topics,
            no_export,
            output,
        } => {
            let path = resolve_input(&input, &config)?;
            let report = articles::load_articles(&path)?;

            let mut pipeline_config = model.apply(&config)?;
            if let Some(k) = topics {
                pipeline_config.topics = TopicCount::Fixed(k);
            }
            pipeline_config.show_progress = true;

            let result = run_pipeline(&report, pipeline_config).await?;

            if let Some(selection) = &result.selection {
                terminal::display_selection(selection);
            }
            terminal::display_topics(&result, model.top_terms);
            terminal::display_topic_articles(&result, &report.documents, 3);
            terminal::display_skipped(&result.preprocess.skipped);

            if !no_export {
                let out = output.unwrap_or_else(|| {
                    json::export_path(&config.output_dir, Local::now().date_naive())
                });
                let export = json::ModelExport::new(&result, model.top_terms);
                json::write_export(&export, &out)?;
                println!("Exported model to {}", out.display());
            }
        }

        Commands::Sweep {
            input,
            model,
            measure,
            sequential,
        } => {
            let path = resolve_input(&input, &config)?;
            let report = articles::load_articles(&path)?;

            let mut pipeline_config = model.apply(&config)?;
            let measure: CoherenceMeasure = measure.parse()?;
            if let TopicCount::Select(sel) = &mut pipeline_config.topics {
                sel.measure = measure;
                sel.parallel = !sequential;
            }
            pipeline_config.show_progress = true;

            let result = run_pipeline(&report, pipeline_config).await?;
            if let Some(selection) = &result.selection {
                terminal::display_selection(selection);
            }
            terminal::display_topics(&result, model.top_terms);
        }
    }

    Ok(())
}

impl ModelArgs {
    /// Layer the CLI flags over the environment configuration.
    fn apply(&self, config: &Config) -> Result<PipelineConfig> {
        let mut pipeline = config.pipeline.clone();
        if self.stem {
            pipeline.stemming = true;
        }
        if self.no_library_tokenizer {
            pipeline.library_tokenizer = false;
        }
        if let Some(seed) = self.seed {
            pipeline.seed = seed;
        }
        if let Some(iterations) = self.iterations {
            pipeline.lda.iterations = iterations;
        }
        if self.content {
            pipeline.text_source = TextSource::Content;
        }

        let mut selection = match &pipeline.topics {
            TopicCount::Select(sel) => sel.clone(),
            TopicCount::Fixed(_) => SelectionConfig::default(),
        };
        selection.k_min = self.k_min.unwrap_or(selection.k_min);
        selection.k_max = self.k_max.unwrap_or(selection.k_max);
        selection.step = self.k_step.unwrap_or(selection.step);
        selection.top_n = self.top_terms;
        selection.candidates().context("Invalid topic range")?;
        pipeline.topics = TopicCount::Select(selection);

        Ok(pipeline)
    }
}

fn resolve_language(flag: Option<&str>, config: &Config) -> Result<Language> {
    match flag {
        Some(code) => code.parse(),
        None => Ok(config.pipeline.language),
    }
}

/// Explicit file, then the file for a date, then the latest collected file.
fn resolve_input(input: &InputArgs, config: &Config) -> Result<PathBuf> {
    if let Some(file) = &input.file {
        return Ok(file.clone());
    }
    if let Some(date) = input.date {
        return Ok(store::articles_path(&config.data_dir, date));
    }
    store::latest_articles_file(&config.data_dir)?.with_context(|| {
        format!(
            "No article files found in {}. Run `notizie collect` first.",
            config.data_dir.display()
        )
    })
}

/// Run the pipeline on a blocking thread; Ctrl-C cancels it between stages.
async fn run_pipeline(report: &LoadReport, config: PipelineConfig) -> Result<PipelineOutput> {
    if !report.skipped.is_empty() {
        warn!(skipped = report.skipped.len(), "Some records were not articles");
    }

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, stopping (press Ctrl-C again to exit now)");
                cancel.cancel();
            }
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Second interrupt, exiting");
                std::process::exit(130);
            }
        })
    };

    let documents = report.documents.clone();
    let result =
        tokio::task::spawn_blocking(move || pipeline::run(&documents, &config, &cancel)).await;
    watcher.abort();

    let output = result
        .context("Pipeline task panicked")?
        .context("Topic modeling failed")?;
    info!(topics = output.model.num_topics(), "Pipeline finished");
    Ok(output)
}
