//! # Postsmith
//!
//! Turns a list of keywords into researched, model-drafted blog posts stored
//! in a relational database.
//!
//! For each keyword the pipeline searches the web, asks a language model to
//! pick a specific angle, searches again on that angle, asks the model for a
//! structured draft, and upserts the post with its tags and authors.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//! │ keywords │──▶│ search       │──▶│ generate     │──▶│  store   │
//! │  .json   │   │ (Serper)     │   │ (Gemini)     │   │ (SQLite) │
//! └──────────┘   └──────┬───────┘   └──────┬───────┘   └──────────┘
//!                       └──── pipeline ────┘
//!                        scout, then write
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export SERPER_API_KEY=... GEMINI_API_KEY=...
//! export DATABASE_URL=sqlite:./data/posts.sqlite
//! postsmith init
//! postsmith run --keywords keywords.json
//! postsmith show quantum-error-correction-in-2025
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment credentials |
//! | [`models`] | Post bundle and stored-row types |
//! | [`slug`] | Slug derivation |
//! | [`search`] | Web search client |
//! | [`generate`] | Topic refinement and post drafting |
//! | [`prompts`] | Prompt templates and response schema |
//! | [`keywords`] | Keyword file loading |
//! | [`store`] | Transactional post upserts |
//! | [`pipeline`] | Per-keyword orchestration |
//! | [`db`] | Database connection |
//! | [`schema`] | Table bootstrap |
//! | [`show`] | Post retrieval for the CLI |
//! | [`stats`] | Database statistics |

pub mod config;
pub mod db;
pub mod generate;
pub mod keywords;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod schema;
pub mod search;
pub mod show;
pub mod slug;
pub mod stats;
pub mod store;
