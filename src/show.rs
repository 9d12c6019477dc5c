//! Post retrieval by slug for `postsmith show`.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::store::PostStore;

/// Print a stored post with its tags and authors, as text or JSON.
pub async fn run_show(config: &Config, slug: &str, json: bool) -> Result<()> {
    let store = PostStore::from_config(&config.db);
    let Some(post) = store.get_post(slug).await? else {
        bail!("post not found: {}", slug);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&post)?);
        return Ok(());
    }

    println!("--- Post ---");
    println!("id:           {}", post.id);
    println!("slug:         {}", post.slug);
    println!("title:        {}", post.title);
    if let Some(ref summary) = post.summary {
        println!("summary:      {}", summary);
    }
    if let Some(ref date) = post.date {
        println!("date:         {}", date);
    }
    if let Some(ref image) = post.image {
        println!("image:        {}", image);
    }
    if let Some(minutes) = post.reading_time_minutes {
        println!("reading time: {} min", minutes);
    }
    println!("created_at:   {}", format_ts_iso(post.created_at));
    println!("updated_at:   {}", format_ts_iso(post.updated_at));
    println!("tags:         {}", post.tags.join(", "));
    println!();

    println!("--- Authors ({}) ---", post.authors.len());
    for author in &post.authors {
        let mut line = author.name.clone();
        if let Some(ref handle) = author.twitter {
            line.push_str(&format!("  {}", handle));
        }
        if let Some(ref avatar) = author.avatar_url {
            line.push_str(&format!("  <{}>", avatar));
        }
        println!("{}", line);
    }
    println!();

    println!("--- Content ---");
    println!("{}", post.content_html);

    Ok(())
}

pub(crate) fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
