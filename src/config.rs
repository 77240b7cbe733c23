use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::topics::lda::GibbsLda;
use crate::topics::selection::SelectionConfig;

/// Default NewsData.io API root. Endpoints are appended (`/news`, `/sources`).
pub const DEFAULT_NEWSDATA_BASE_URL: &str = "https://newsdata.io/api/1";

/// Marker that news aggregators append before the source name.
pub const DEFAULT_ATTRIBUTION_MARKER: &str = "proviene da";

/// Article language. Drives the stopword list and the stemmer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    Italian,
    English,
    French,
    German,
    Spanish,
    Portuguese,
}

impl Language {
    /// ISO 639-1 code, as used by the news API.
    pub fn code(&self) -> &'static str {
        match self {
            Language::Italian => "it",
            Language::English => "en",
            Language::French => "fr",
            Language::German => "de",
            Language::Spanish => "es",
            Language::Portuguese => "pt",
        }
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "it" | "italian" => Ok(Language::Italian),
            "en" | "english" => Ok(Language::English),
            "fr" | "french" => Ok(Language::French),
            "de" | "german" => Ok(Language::German),
            "es" | "spanish" => Ok(Language::Spanish),
            "pt" | "portuguese" => Ok(Language::Portuguese),
            other => anyhow::bail!(
                "Unsupported language '{other}'. Supported: it, en, fr, de, es, pt"
            ),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Which article fields make up the text that gets tokenized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextSource {
    /// `title + " " + description` (the default, as the dashboard used it)
    #[default]
    TitleAndDescription,
    /// The article body only
    Content,
    /// Title, description and body together
    All,
}

/// How many topics to fit.
#[derive(Debug, Clone, PartialEq)]
pub enum TopicCount {
    /// Fit exactly this many topics.
    Fixed(usize),
    /// Sweep a range of K and keep the most coherent model.
    Select(SelectionConfig),
}

/// Everything a single pipeline run needs. Passed explicitly into each stage.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub language: Language,
    /// Apply the Snowball stemmer after stopword filtering
    pub stemming: bool,
    /// Use Unicode word segmentation (falls back to the regex tokenizer on failure)
    pub library_tokenizer: bool,
    /// Case-insensitive phrase that starts the trailing source attribution
    pub attribution_marker: String,
    pub text_source: TextSource,
    /// Seed for every source of randomness in fitting
    pub seed: u64,
    pub lda: GibbsLda,
    pub topics: TopicCount,
    /// Draw a progress bar over model-selection candidates
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            language: Language::Italian,
            stemming: false,
            library_tokenizer: true,
            attribution_marker: DEFAULT_ATTRIBUTION_MARKER.to_string(),
            text_source: TextSource::default(),
            seed: 100,
            lda: GibbsLda::default(),
            topics: TopicCount::Select(SelectionConfig::default()),
            show_progress: false,
        }
    }
}

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded at startup via dotenvy. CLI flags override the
/// pipeline settings per command.
pub struct Config {
    pub newsdata_api_key: String,
    pub newsdata_base_url: String,
    /// Where collected `articles_YYYY-MM-DD.json` files live
    pub data_dir: PathBuf,
    /// Where topic exports are written
    pub output_dir: PathBuf,
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default except the API key, which is only checked
    /// by the commands that talk to the news API.
    pub fn load() -> Result<Self> {
        let mut pipeline = PipelineConfig::default();

        if let Ok(code) = env::var("NOTIZIE_LANGUAGE") {
            pipeline.language = code.parse()?;
        }
        pipeline.stemming = env_flag("NOTIZIE_STEMMING", pipeline.stemming)?;
        pipeline.library_tokenizer =
            env_flag("NOTIZIE_LIBRARY_TOKENIZER", pipeline.library_tokenizer)?;
        pipeline.seed = env_number("NOTIZIE_SEED", pipeline.seed)?;

        let defaults = SelectionConfig::default();
        pipeline.topics = TopicCount::Select(SelectionConfig {
            k_min: env_number("NOTIZIE_K_MIN", defaults.k_min)?,
            k_max: env_number("NOTIZIE_K_MAX", defaults.k_max)?,
            step: env_number("NOTIZIE_K_STEP", defaults.step)?,
            ..defaults
        });

        Ok(Self {
            newsdata_api_key: env::var("NEWSDATA_API_KEY").unwrap_or_default(),
            newsdata_base_url: env::var("NEWSDATA_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_NEWSDATA_BASE_URL.to_string()),
            data_dir: env::var("NOTIZIE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            output_dir: env::var("NOTIZIE_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("output")),
            pipeline,
        })
    }

    /// Check that the NewsData.io key is configured.
    /// Call this before any command that hits the news API.
    pub fn require_api_key(&self) -> Result<()> {
        if self.newsdata_api_key.is_empty() {
            anyhow::bail!(
                "NEWSDATA_API_KEY not set. Add it to your .env file.\n\
                 See .env.example for the required variables."
            );
        }
        Ok(())
    }
}

/// Parse a boolean env var ("1", "true", "yes", "on" and their negatives).
fn env_flag(name: &str, default: bool) -> Result<bool> {
    match env::var(name) {
        Ok(raw) => parse_flag(&raw).with_context(|| format!("{name} must be a boolean")),
        Err(_) => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("unrecognized flag value '{other}'"),
    }
}

fn env_number<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a non-negative integer, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
