//! # Postsmith CLI (`postsmith`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `postsmith init` | Create the post tables if they are missing |
//! | `postsmith run` | Research, draft and store a post for every keyword |
//! | `postsmith search "<query>"` | Print the search digest for a query |
//! | `postsmith show <slug>` | Print a stored post with tags and authors |
//! | `postsmith stats` | Summarize what is stored |
//!
//! Credentials come from the environment (or a `.env` file):
//! `SERPER_API_KEY`, `GEMINI_API_KEY`, optionally `GEMINI_MODEL` and
//! `DATABASE_URL`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use postsmith::{config, pipeline, schema, search, show, stats};

/// Postsmith — keyword-driven blog post generation.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means defaults plus environment variables.
#[derive(Parser)]
#[command(
    name = "postsmith",
    about = "Postsmith — research, draft and store blog posts from a keyword list",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/postsmith.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database tables.
    ///
    /// Idempotent: running it against an initialized database is safe.
    Init,

    /// Run the pipeline over every keyword in the keyword file.
    ///
    /// Keywords are processed one at a time. A keyword that fails at any
    /// stage is skipped; the run always continues with the next one.
    Run {
        /// Keyword file (JSON with a top-level "keywords" array).
        /// Overrides `[keywords].path` from the config.
        #[arg(long)]
        keywords: Option<PathBuf>,
    },

    /// Run a single web search and print the digest.
    Search {
        /// The search query string.
        query: String,
    },

    /// Print a stored post.
    Show {
        /// Post slug.
        slug: String,

        /// Print as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Show counts of stored posts, tags and authors.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            schema::run_init(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Run { keywords } => {
            pipeline::run_pipeline(&cfg, keywords.as_deref()).await?;
        }
        Commands::Search { query } => {
            search::run_search(&cfg, &query).await?;
        }
        Commands::Show { slug, json } => {
            show::run_show(&cfg, &slug, json).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
