//! Prompt templates and the structured-output schema sent to the model.
//!
//! The drafting prompt carries no JSON instructions; the output shape is
//! enforced by [`post_bundle_schema`] through the model's response schema.

use serde_json::{json, Value};

/// Ask the model to pick one specific, timely angle on a broad keyword.
pub fn topic_scout_prompt(search_context: &str, keyword: &str) -> String {
    format!(
        r#"You are an editor planning a tech blog.
Given the broad subject "{keyword}" and the recent search results below, propose ONE specific,
timely angle for a single article. The angle must be narrow enough to research with one web search.

Reply with the topic only: a single line, no quotes, no explanation.

SEARCH CONTEXT
---
{search_context}
---
"#
    )
}

/// Ask the model to draft a post on `topic` grounded in `search_context`.
pub fn blog_post_prompt(search_context: &str, topic: &str) -> String {
    format!(
        r#"You are an expert tech blogger.
Write an insightful ~300-word article about "{topic}".

Use the recent search results below as factual context. Synthesize ideas; avoid listing.
Include a compelling title and a short 1-2 sentence summary. Write the body in semantic HTML.
Suggest a few short tags.

SEARCH CONTEXT
---
{search_context}
---
"#
    )
}

/// Response schema for a post bundle, in the OpenAPI subset the generation
/// API accepts.
pub fn post_bundle_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "post": {
                "type": "OBJECT",
                "properties": {
                    "slug": { "type": "STRING" },
                    "title": { "type": "STRING" },
                    "summary": { "type": "STRING" },
                    "contentHtml": { "type": "STRING" },
                    "date": { "type": "STRING", "format": "date-time" },
                    "image": { "type": "STRING" },
                    "readingTimeMinutes": { "type": "INTEGER" }
                },
                "required": ["title", "contentHtml"]
            },
            "tags": { "type": "ARRAY", "items": { "type": "STRING" } },
            "authors": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "twitter": { "type": "STRING" },
                        "avatarUrl": { "type": "STRING" }
                    },
                    "required": ["name"]
                }
            }
        },
        "required": ["post"]
    })
}
