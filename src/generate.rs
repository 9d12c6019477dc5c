//! Content generation: topic refinement and post drafting.
//!
//! [`LanguageModel`] is the transport seam: it turns a prompt into raw text.
//! What to ask for and how to read the answer lives in the free functions
//! [`refine_topic`] and [`generate_post`], so a fake model in tests exercises
//! the same parsing as production.
//!
//! Model output is normalized by one adapter, [`parse_bundle`], which accepts
//! both the structured `{post, tags, authors}` shape and the legacy flat
//! `{title, contentHtml | content}` shape.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use thiserror::Error;

use crate::config::GenerationConfig;
use crate::models::{AuthorInput, PostBundle, PostInput};
use crate::prompts;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("GEMINI_API_KEY is not set")]
    MissingApiKey,
    #[error("generation request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("generation API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model returned an empty response")]
    EmptyResponse,
    #[error("model returned invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("model output is not a JSON object")]
    UnexpectedShape,
    #[error("model output is missing required field '{0}'")]
    MissingField(&'static str),
}

/// A text-generation backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a free-text prompt.
    async fn complete(&self, prompt: &str) -> Result<String, GenerateError>;

    /// Complete a prompt whose reply must be JSON matching `schema`.
    ///
    /// The default ignores the schema; backends with server-side structured
    /// output should override it.
    async fn complete_structured(
        &self,
        prompt: &str,
        schema: &Value,
    ) -> Result<String, GenerateError> {
        let _ = schema;
        self.complete(prompt).await
    }
}

/// Ask the model for one specific angle on `keyword`.
pub async fn refine_topic(
    model: &dyn LanguageModel,
    search_context: &str,
    keyword: &str,
) -> Result<String, GenerateError> {
    tracing::info!(keyword, "refining topic");
    let reply = model
        .complete(&prompts::topic_scout_prompt(search_context, keyword))
        .await?;
    extract_topic(&reply).ok_or(GenerateError::EmptyResponse)
}

/// Draft a post about `topic` and normalize it into a [`PostBundle`].
pub async fn generate_post(
    model: &dyn LanguageModel,
    search_context: &str,
    topic: &str,
) -> Result<PostBundle, GenerateError> {
    tracing::info!(topic, "generating blog post");
    let raw = model
        .complete_structured(
            &prompts::blog_post_prompt(search_context, topic),
            &prompts::post_bundle_schema(),
        )
        .await?;

    parse_bundle(&raw).inspect_err(|e| {
        let preview: String = raw.chars().take(500).collect();
        tracing::warn!(error = %e, raw = %preview, "unusable model output");
    })
}

/// First non-empty line of a reply, minus list markers, markdown emphasis
/// and surrounding quotes.
fn extract_topic(reply: &str) -> Option<String> {
    reply
        .lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(['-', '*', '#', '>'])
                .trim()
                .trim_matches(['"', '\'', '*', '`'])
                .trim()
        })
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Parse raw model output into a validated bundle.
///
/// A surrounding markdown code fence is tolerated. Fails when the post has
/// no non-blank title or content.
pub fn parse_bundle(raw: &str) -> Result<PostBundle, GenerateError> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(GenerateError::EmptyResponse);
    }
    let value: Value = serde_json::from_str(body)?;
    normalize_bundle(value)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = rest.trim_end();
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Drop the info string (e.g. `json`), whether or not the body starts on
    // the same line as the opening fence.
    let body = match inner.split_once('\n') {
        Some((info, body)) if !info.trim_start().starts_with(['{', '[']) => body,
        _ => inner.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    body.trim()
}

fn normalize_bundle(value: Value) -> Result<PostBundle, GenerateError> {
    let Value::Object(mut root) = value else {
        return Err(GenerateError::UnexpectedShape);
    };

    let tags = root.remove("tags").map(string_list).unwrap_or_default();
    let authors = root.remove("authors").map(author_list).unwrap_or_default();

    let post_fields = match root.remove("post") {
        Some(Value::Object(post)) if !post.is_empty() => post,
        // Legacy flat output: the post fields sit at the top level.
        _ => root,
    };
    let post = post_from_fields(post_fields);

    let bundle = PostBundle {
        post,
        tags,
        authors,
    };
    if bundle.title().is_none() {
        return Err(GenerateError::MissingField("title"));
    }
    if bundle.content_html().is_none() {
        return Err(GenerateError::MissingField("contentHtml"));
    }
    Ok(bundle)
}

/// Build post fields from a JSON object. Only string values count for text
/// fields; anything else is treated as absent rather than failing the bundle.
fn post_from_fields(mut fields: Map<String, Value>) -> PostInput {
    let reading_time_minutes = fields.remove("readingTimeMinutes").and_then(whole_minutes);
    let mut text = |key: &str| fields.remove(key).and_then(string_value);

    let content_html = text("contentHtml").or_else(|| text("content"));
    PostInput {
        slug: text("slug"),
        title: text("title"),
        summary: text("summary"),
        content_html,
        date: text("date"),
        image: text("image"),
        reading_time_minutes,
    }
}

fn string_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        _ => None,
    }
}

/// Accepts `4`, `4.0` and `"4"`; anything fractional or non-numeric is absent.
fn whole_minutes(value: Value) -> Option<i64> {
    let as_whole = |f: f64| (f.is_finite() && f.fract() == 0.0).then_some(f as i64);
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(as_whole)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(as_whole))
        }
        _ => None,
    }
}

fn string_list(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.into_iter().filter_map(string_value).collect(),
        _ => Vec::new(),
    }
}

/// Authors may arrive as objects or as bare name strings. Non-string
/// optional fields on an author are dropped, the author is kept.
fn author_list(value: Value) -> Vec<AuthorInput> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(AuthorInput::named(name)),
            Value::Object(mut obj) => {
                let mut text = |key: &str| obj.remove(key).and_then(string_value);
                Some(AuthorInput {
                    name: text("name").unwrap_or_default(),
                    twitter: text("twitter"),
                    avatar_url: text("avatarUrl"),
                })
            }
            _ => None,
        })
        .collect()
}

// ============ Gemini ============

/// Google Gemini via the `generateContent` REST endpoint.
pub struct GeminiClient {
    api_key: Option<String>,
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &GenerationConfig) -> Result<Self, GenerateError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        generation_config: Option<Value>,
    ) -> Result<String, GenerateError> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::error!("missing GEMINI_API_KEY; set it in the environment or a .env file");
            return Err(GenerateError::MissingApiKey);
        };

        let mut body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });
        if let Some(generation_config) = generation_config {
            body["generationConfig"] = generation_config;
        }

        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        tracing::debug!(model = %self.model, prompt_length = prompt.len(), "calling generation API");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: GenerateContentResponse = response.json().await?;
        let text: String = payload
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerateError::EmptyResponse);
        }
        tracing::debug!(model = %self.model, response_length = text.len(), "generation API responded");
        Ok(text)
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, GenerateError> {
        self.generate(prompt, None).await.inspect_err(|e| {
            tracing::warn!(model = %self.model, error = %e, "generation failed");
        })
    }

    async fn complete_structured(
        &self,
        prompt: &str,
        schema: &Value,
    ) -> Result<String, GenerateError> {
        let generation_config = json!({
            "responseMimeType": "application/json",
            "responseSchema": schema,
        });
        self.generate(prompt, Some(generation_config))
            .await
            .inspect_err(|e| {
                tracing::warn!(model = %self.model, error = %e, "structured generation failed");
            })
    }
}
