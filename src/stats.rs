//! Database statistics overview.
//!
//! A quick summary of what the pipeline has written so far: row counts per
//! table, the most used tags, and when a post was last touched. Used by
//! `postsmith stats` to confirm runs are landing where expected.

use anyhow::Result;

use crate::config::Config;
use crate::show::format_ts_iso;
use crate::store::PostStore;

const TOP_TAGS: i64 = 10;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = PostStore::from_config(&config.db);
    let counts = store.count_rows().await?;
    let tags = store.tag_usage(TOP_TAGS).await?;

    println!("Postsmith — Database Stats");
    println!("==========================");
    println!();
    if let Some(ref url) = config.db.url {
        println!("  Database:     {}", url);
    }
    println!("  Posts:        {}", counts.posts);
    println!("  Tags:         {}", counts.tags);
    println!("  Authors:      {}", counts.authors);
    println!("  Tag links:    {}", counts.post_tags);
    println!("  Author links: {}", counts.post_authors);
    println!(
        "  Last update:  {}",
        counts
            .last_updated
            .map(format_ts_relative)
            .unwrap_or_else(|| "never".to_string())
    );

    if !tags.is_empty() {
        println!();
        println!("  Top tags:");
        println!("  {:<32} {:>6}", "TAG", "POSTS");
        println!("  {}", "-".repeat(39));
        for (name, uses) in &tags {
            println!("  {:<32} {:>6}", name, uses);
        }
    }

    println!();
    Ok(())
}

const HOUR: i64 = 3600;
const DAY: i64 = 24 * HOUR;

/// "just now", "5 mins ago", "2 days ago"; older or future times fall back to
/// an ISO timestamp.
fn format_ts_relative(ts: i64) -> String {
    let elapsed = chrono::Utc::now().timestamp() - ts;
    let (amount, unit) = match elapsed {
        e if !(0..30 * DAY).contains(&e) => return format_ts_iso(ts),
        e if e < 60 => return "just now".to_string(),
        e if e < HOUR => (e / 60, "min"),
        e if e < DAY => (e / HOUR, "hour"),
        e => (e / DAY, "day"),
    };
    let plural = if amount == 1 { "" } else { "s" };
    format!("{} {}{} ago", amount, unit, plural)
}
