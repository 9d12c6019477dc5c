//! Keyword-to-post orchestration.
//!
//! Each keyword runs through two stages:
//!
//! ```text
//! scout:  search(keyword) ──▶ refine_topic ──▶ topic
//! write:  search(topic)   ──▶ generate_post ──▶ store
//! ```
//!
//! Any failing step ends that keyword with [`KeywordOutcome::Skipped`] and
//! the run moves on. Keywords are processed strictly one after another.

use anyhow::{Context, Result};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::db;
use crate::generate::{self, GeminiClient, LanguageModel};
use crate::keywords;
use crate::schema;
use crate::search::{SearchProvider, SerperClient};
use crate::store::PostStore;

/// Step at which a keyword was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    BroadSearch,
    Refine,
    FocusedSearch,
    Draft,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::BroadSearch => "broad search",
            Stage::Refine => "topic refinement",
            Stage::FocusedSearch => "focused search",
            Stage::Draft => "draft",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordOutcome {
    Published {
        keyword: String,
        topic: String,
        slug: String,
    },
    Skipped {
        keyword: String,
        stage: Stage,
        reason: String,
    },
}

impl KeywordOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, KeywordOutcome::Published { .. })
    }

    fn skipped(keyword: &str, stage: Stage, reason: impl fmt::Display) -> Self {
        tracing::warn!(keyword, %stage, %reason, "skipping keyword");
        KeywordOutcome::Skipped {
            keyword: keyword.to_string(),
            stage,
            reason: reason.to_string(),
        }
    }
}

/// Result of a whole run. Displays as `<successes>/<total>`.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub outcomes: Vec<KeywordOutcome>,
}

impl RunSummary {
    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_published()).count()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.successes(), self.total())
    }
}

/// The search → generate → persist pipeline with its collaborators injected.
pub struct Pipeline {
    search: Arc<dyn SearchProvider>,
    model: Arc<dyn LanguageModel>,
    store: PostStore,
}

impl Pipeline {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        model: Arc<dyn LanguageModel>,
        store: PostStore,
    ) -> Self {
        Self {
            search,
            model,
            store,
        }
    }

    /// Production wiring: Serper search, Gemini generation, configured store.
    pub fn from_config(config: &Config) -> Result<Self> {
        let search = SerperClient::new(&config.search).context("Failed to build search client")?;
        let model =
            GeminiClient::new(&config.generation).context("Failed to build generation client")?;
        Ok(Self::new(
            Arc::new(search),
            Arc::new(model),
            PostStore::from_config(&config.db),
        ))
    }

    /// Process keywords in order; a failing keyword never stops the run.
    pub async fn run(&self, keywords: &[String]) -> RunSummary {
        let mut summary = RunSummary::default();
        for keyword in keywords {
            let outcome = self.process_keyword(keyword).await;
            summary.outcomes.push(outcome);
        }
        summary
    }

    pub async fn process_keyword(&self, keyword: &str) -> KeywordOutcome {
        tracing::info!(keyword, "processing keyword");

        // Scout
        let context = match self.search.search(keyword).await {
            Ok(context) => context,
            Err(e) => return KeywordOutcome::skipped(keyword, Stage::BroadSearch, e),
        };
        let topic = match generate::refine_topic(self.model.as_ref(), &context, keyword).await {
            Ok(topic) => topic,
            Err(e) => return KeywordOutcome::skipped(keyword, Stage::Refine, e),
        };
        tracing::info!(keyword, topic = %topic, "topic selected");

        // Write
        let context = match self.search.search(&topic).await {
            Ok(context) => context,
            Err(e) => return KeywordOutcome::skipped(keyword, Stage::FocusedSearch, e),
        };
        let bundle = match generate::generate_post(self.model.as_ref(), &context, &topic).await {
            Ok(bundle) => bundle,
            Err(e) => return KeywordOutcome::skipped(keyword, Stage::Draft, e),
        };
        match self.store.upsert_bundle(&bundle).await {
            Ok(written) => KeywordOutcome::Published {
                keyword: keyword.to_string(),
                topic,
                slug: written.slug,
            },
            Err(e) => KeywordOutcome::skipped(keyword, Stage::Persist, e),
        }
    }
}

/// `postsmith run`: load keywords, make sure the tables exist, process every
/// keyword and print the tally.
///
/// Fails only when the keyword file cannot be read. A database that cannot be
/// prepared is logged; each keyword then fails at the persist stage.
pub async fn run_pipeline(config: &Config, keywords_path: Option<&Path>) -> Result<RunSummary> {
    let path = keywords_path.unwrap_or(config.keywords.path.as_path());
    let keywords = keywords::load_keywords(path).context("Failed to read keywords")?;
    if keywords.is_empty() {
        println!(
            "No keywords found. Ensure '{}' contains a 'keywords' array.",
            path.display()
        );
        return Ok(RunSummary::default());
    }
    println!("Found {} keywords. Starting workflow...", keywords.len());

    if let Some(url) = config.db.url.as_deref() {
        if let Err(e) = prepare_database(url).await {
            tracing::error!(url, error = %e, "could not prepare database");
        }
    }

    let pipeline = Pipeline::from_config(config)?;
    let summary = pipeline.run(&keywords).await;

    for outcome in &summary.outcomes {
        match outcome {
            KeywordOutcome::Published { keyword, slug, .. } => {
                println!("  published  {:<32} {}", keyword, slug);
            }
            KeywordOutcome::Skipped { keyword, stage, .. } => {
                println!("  skipped    {:<32} ({})", keyword, stage);
            }
        }
    }
    println!("Completed. Successfully processed {} keywords.", summary);
    Ok(summary)
}

async fn prepare_database(url: &str) -> Result<(), sqlx::Error> {
    let pool = db::connect(url).await?;
    let result = schema::ensure_schema(&pool).await;
    pool.close().await;
    result
}
