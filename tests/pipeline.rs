//! Pipeline tests with in-memory search and model fakes.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use postsmith::config::Config;
use postsmith::db;
use postsmith::generate::{GenerateError, LanguageModel};
use postsmith::pipeline::{run_pipeline, KeywordOutcome, Pipeline, Stage};
use postsmith::schema::ensure_schema;
use postsmith::search::{SearchError, SearchProvider};
use postsmith::store::PostStore;
use tempfile::TempDir;

// ─── Fakes ──────────────────────────────────────────────────────────

/// Returns a canned digest per query; unknown queries have no results.
#[derive(Default)]
struct FakeSearch {
    digests: HashMap<String, String>,
    queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    fn with(mut self, query: &str, digest: &str) -> Self {
        self.digests.insert(query.to_string(), digest.to_string());
        self
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, query: &str) -> Result<String, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.digests
            .get(query)
            .cloned()
            .ok_or(SearchError::NoResults)
    }
}

/// Answers topic prompts with `topic` and draft prompts with `draft`.
/// A `None` topic makes every topic request fail.
struct FakeModel {
    topic: Option<String>,
    draft: String,
    drafts_requested: AtomicUsize,
}

impl FakeModel {
    fn new(topic: &str, draft: &str) -> Self {
        Self {
            topic: Some(topic.to_string()),
            draft: draft.to_string(),
            drafts_requested: AtomicUsize::new(0),
        }
    }

    fn failing_topic(draft: &str) -> Self {
        Self {
            topic: None,
            ..Self::new("", draft)
        }
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn complete(&self, _prompt: &str) -> Result<String, GenerateError> {
        self.topic.clone().ok_or(GenerateError::Status {
            status: 503,
            body: "unavailable".to_string(),
        })
    }

    async fn complete_structured(
        &self,
        _prompt: &str,
        schema: &Value,
    ) -> Result<String, GenerateError> {
        assert!(schema.get("properties").is_some());
        self.drafts_requested.fetch_add(1, Ordering::SeqCst);
        Ok(self.draft.clone())
    }
}

const TOPIC: &str = "Error correction milestones in 2025";

const DRAFT: &str = r#"{
    "post": {
        "title": "Error Correction Milestones in 2025",
        "summary": "Where logical qubits stand.",
        "contentHtml": "<h2>Intro</h2><p>Logical qubits crossed a threshold.</p>",
        "readingTimeMinutes": 4
    },
    "tags": ["quantum", "hardware"],
    "authors": [{"name": "Research Desk", "twitter": null, "avatarUrl": null}]
}"#;

async fn store(tmp: &TempDir) -> (String, PostStore) {
    let url = format!("sqlite:{}", tmp.path().join("posts.sqlite").display());
    let pool = db::connect(&url).await.unwrap();
    ensure_schema(&pool).await.unwrap();
    pool.close().await;
    (url.clone(), PostStore::new(url))
}

async fn post_count(url: &str) -> i64 {
    let pool = db::connect(url).await.unwrap();
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(&pool)
        .await
        .unwrap();
    pool.close().await;
    n
}

fn keywords(list: &[&str]) -> Vec<String> {
    list.iter().map(|k| k.to_string()).collect()
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_single_keyword_published() {
    let tmp = TempDir::new().unwrap();
    let (url, store) = store(&tmp).await;
    let search = Arc::new(
        FakeSearch::default()
            .with("quantum computing", "Title: Broad\nSnippet: s\nURL: u")
            .with(TOPIC, "Title: Focused\nSnippet: s\nURL: u"),
    );
    let model = Arc::new(FakeModel::new(TOPIC, DRAFT));
    let pipeline = Pipeline::new(search.clone(), model, store.clone());

    let summary = pipeline.run(&keywords(&["quantum computing"])).await;

    assert_eq!(summary.to_string(), "1/1");
    assert_eq!(
        summary.outcomes[0],
        KeywordOutcome::Published {
            keyword: "quantum computing".into(),
            topic: TOPIC.into(),
            slug: "error-correction-milestones-in-2025".into(),
        }
    );
    assert_eq!(search.queries(), vec!["quantum computing", TOPIC]);
    assert_eq!(post_count(&url).await, 1);

    let post = store
        .get_post("error-correction-milestones-in-2025")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(post.tags, vec!["hardware", "quantum"]);
    assert_eq!(post.authors[0].name, "Research Desk");
    assert_eq!(post.reading_time_minutes, Some(4));
}

#[tokio::test]
async fn test_broad_search_failure_skips_keyword() {
    let tmp = TempDir::new().unwrap();
    let (url, store) = store(&tmp).await;
    let model = Arc::new(FakeModel::new(TOPIC, DRAFT));
    let pipeline = Pipeline::new(Arc::new(FakeSearch::default()), model.clone(), store);

    let summary = pipeline.run(&keywords(&["quantum computing"])).await;

    assert_eq!(summary.to_string(), "0/1");
    assert!(matches!(
        summary.outcomes[0],
        KeywordOutcome::Skipped {
            stage: Stage::BroadSearch,
            ..
        }
    ));
    assert_eq!(model.drafts_requested.load(Ordering::SeqCst), 0);
    assert_eq!(post_count(&url).await, 0);
}

#[tokio::test]
async fn test_focused_search_failure_skips_keyword() {
    let tmp = TempDir::new().unwrap();
    let (url, store) = store(&tmp).await;
    let search = Arc::new(FakeSearch::default().with("quantum computing", "Title: Broad"));
    let pipeline = Pipeline::new(search, Arc::new(FakeModel::new(TOPIC, DRAFT)), store);

    let outcome = pipeline.process_keyword("quantum computing").await;

    assert!(matches!(
        outcome,
        KeywordOutcome::Skipped {
            stage: Stage::FocusedSearch,
            ..
        }
    ));
    assert_eq!(post_count(&url).await, 0);
}

#[tokio::test]
async fn test_draft_without_title_skips_keyword() {
    let tmp = TempDir::new().unwrap();
    let (url, store) = store(&tmp).await;
    let search = Arc::new(
        FakeSearch::default()
            .with("quantum computing", "Title: Broad")
            .with(TOPIC, "Title: Focused"),
    );
    let model = Arc::new(FakeModel::new(
        TOPIC,
        r#"{"post": {"contentHtml": "<p>no title</p>"}, "tags": ["x"]}"#,
    ));
    let pipeline = Pipeline::new(search, model, store);

    let summary = pipeline.run(&keywords(&["quantum computing"])).await;

    assert_eq!(summary.to_string(), "0/1");
    assert!(matches!(
        summary.outcomes[0],
        KeywordOutcome::Skipped {
            stage: Stage::Draft,
            ..
        }
    ));
    assert_eq!(post_count(&url).await, 0);
}

#[tokio::test]
async fn test_flat_draft_is_accepted() {
    let tmp = TempDir::new().unwrap();
    let (_url, store) = store(&tmp).await;
    let search = Arc::new(
        FakeSearch::default()
            .with("rust", "Title: Broad")
            .with(TOPIC, "Title: Focused"),
    );
    let model = Arc::new(FakeModel::new(
        TOPIC,
        "```json\n{\"title\": \"Flat Post\", \"content\": \"<p>flat</p>\"}\n```",
    ));
    let pipeline = Pipeline::new(search, model, store.clone());

    let summary = pipeline.run(&keywords(&["rust"])).await;

    assert_eq!(summary.to_string(), "1/1");
    let post = store.get_post("flat-post").await.unwrap().unwrap();
    assert_eq!(post.content_html, "<p>flat</p>");
    assert!(post.tags.is_empty());
}

#[tokio::test]
async fn test_failing_keyword_does_not_stop_run() {
    let tmp = TempDir::new().unwrap();
    let (url, store) = store(&tmp).await;
    let search = Arc::new(
        FakeSearch::default()
            .with("second", "Title: Broad")
            .with(TOPIC, "Title: Focused"),
    );
    let pipeline = Pipeline::new(search, Arc::new(FakeModel::new(TOPIC, DRAFT)), store);

    let summary = pipeline.run(&keywords(&["first", "second"])).await;

    assert_eq!(summary.successes(), 1);
    assert_eq!(summary.total(), 2);
    assert!(!summary.outcomes[0].is_published());
    assert!(summary.outcomes[1].is_published());
    assert_eq!(post_count(&url).await, 1);
}

#[tokio::test]
async fn test_rerun_updates_same_post() {
    let tmp = TempDir::new().unwrap();
    let (url, store) = store(&tmp).await;
    let search = Arc::new(
        FakeSearch::default()
            .with("quantum computing", "Title: Broad")
            .with(TOPIC, "Title: Focused"),
    );
    let pipeline = Pipeline::new(search, Arc::new(FakeModel::new(TOPIC, DRAFT)), store);

    let summary = pipeline
        .run(&keywords(&["quantum computing", "quantum computing"]))
        .await;

    assert_eq!(summary.to_string(), "2/2");
    assert_eq!(post_count(&url).await, 1);
}

#[tokio::test]
async fn test_unconfigured_store_fails_at_persist() {
    let search = Arc::new(
        FakeSearch::default()
            .with("quantum computing", "Title: Broad")
            .with(TOPIC, "Title: Focused"),
    );
    let store = PostStore::from_config(&postsmith::config::DbConfig { url: None });
    let pipeline = Pipeline::new(search, Arc::new(FakeModel::new(TOPIC, DRAFT)), store);

    let outcome = pipeline.process_keyword("quantum computing").await;

    assert!(matches!(
        outcome,
        KeywordOutcome::Skipped {
            stage: Stage::Persist,
            ..
        }
    ));
}

#[tokio::test]
async fn test_blank_topic_skips_keyword() {
    let tmp = TempDir::new().unwrap();
    let (url, store) = store(&tmp).await;
    let search = Arc::new(
        FakeSearch::default()
            .with("quantum computing", "Title: Broad")
            .with(TOPIC, "Title: Focused"),
    );
    let model = Arc::new(FakeModel::new("  \n \"\" ", DRAFT));
    let pipeline = Pipeline::new(search.clone(), model.clone(), store);

    let summary = pipeline.run(&keywords(&["quantum computing"])).await;

    assert_eq!(summary.to_string(), "0/1");
    assert!(matches!(
        summary.outcomes[0],
        KeywordOutcome::Skipped {
            stage: Stage::Refine,
            ..
        }
    ));
    assert_eq!(search.queries(), vec!["quantum computing"]);
    assert_eq!(model.drafts_requested.load(Ordering::SeqCst), 0);
    assert_eq!(post_count(&url).await, 0);
}

#[tokio::test]
async fn test_failing_topic_call_skips_keyword() {
    let tmp = TempDir::new().unwrap();
    let (url, store) = store(&tmp).await;
    let search = Arc::new(FakeSearch::default().with("quantum computing", "Title: Broad"));
    let model = Arc::new(FakeModel::failing_topic(DRAFT));
    let pipeline = Pipeline::new(search.clone(), model, store);

    let outcome = pipeline.process_keyword("quantum computing").await;

    match outcome {
        KeywordOutcome::Skipped { stage, reason, .. } => {
            assert_eq!(stage, Stage::Refine);
            assert!(reason.contains("503"));
        }
        other => panic!("expected a skipped keyword, got {:?}", other),
    }
    assert_eq!(search.queries().len(), 1);
    assert_eq!(post_count(&url).await, 0);
}

// ─── run_pipeline ───────────────────────────────────────────────────

fn config_with_keywords(tmp: &TempDir, content: &str) -> Config {
    let path = tmp.path().join("keywords.json");
    std::fs::write(&path, content).unwrap();
    let mut config = Config::default();
    config.keywords.path = path;
    config
}

#[tokio::test]
async fn test_run_with_unopenable_database_reports_failures() {
    let tmp = TempDir::new().unwrap();
    let blocker = tmp.path().join("file");
    std::fs::write(&blocker, "").unwrap();
    let mut config = config_with_keywords(&tmp, r#"{"keywords": ["quantum computing"]}"#);
    config.db.url = Some(format!("sqlite:{}", blocker.join("posts.sqlite").display()));

    let summary = run_pipeline(&config, None).await.unwrap();

    assert_eq!(summary.to_string(), "0/1");
}

#[tokio::test]
async fn test_run_with_empty_keyword_list_is_ok() {
    let tmp = TempDir::new().unwrap();
    let config = config_with_keywords(&tmp, r#"{"keywords": []}"#);

    let summary = run_pipeline(&config, None).await.unwrap();

    assert_eq!(summary.total(), 0);
}

#[tokio::test]
async fn test_run_with_malformed_keywords_is_ok() {
    let tmp = TempDir::new().unwrap();
    let config = config_with_keywords(&tmp, "{not json");

    let summary = run_pipeline(&config, None).await.unwrap();

    assert_eq!(summary.to_string(), "0/0");
}

#[tokio::test]
async fn test_run_with_missing_keyword_file_fails() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("missing.json");

    let err = run_pipeline(&Config::default(), Some(&missing))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Failed to read keywords"));
}
