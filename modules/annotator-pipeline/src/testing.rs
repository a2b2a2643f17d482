// Test mocks for the annotation pipeline.
//
// One mock per trait boundary:
// - MockGenerator (Generator): scripted JSON replies, call log, optional delay
// - MockClassifier (SafetyClassifier): fixed verdict, records inputs
// - MockContent (ContentSource): canned fetch-stage outputs
// - MockVocabulary (TagVocabulary): canned tags or a bookmark-service error
//
// Plus helpers for building a pipeline around them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use ai_client::ModerationResult;
use annotator_common::{MarkdownProvenance, MarkdownResult, PageMetadata};
use bookmark_client::BookmarkError;

use crate::pipeline::{AnnotationPipeline, PipelineDeps};
use crate::traits::{ContentSource, Generator, SafetyClassifier, TagVocabulary};

// ---------------------------------------------------------------------------
// MockGenerator
// ---------------------------------------------------------------------------

/// One recorded generation request.
#[derive(Debug, Clone)]
pub struct GenerationCall {
    pub schema_name: String,
    pub system: String,
    pub prompt: String,
}

type Responder = dyn Fn(usize, &GenerationCall) -> Result<String> + Send + Sync;

/// Generator that answers from a closure. The closure sees the zero-based
/// call index and the request.
pub struct MockGenerator {
    responder: Box<Responder>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    log: Mutex<Vec<GenerationCall>>,
}

impl MockGenerator {
    pub fn from_fn(
        responder: impl Fn(usize, &GenerationCall) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            delay: None,
            calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Same reply to every call.
    pub fn fixed(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::from_fn(move |_, _| Ok(reply.clone()))
    }

    /// Replies in order, repeating the last one once exhausted.
    pub fn sequence(replies: Vec<String>) -> Self {
        Self::from_fn(move |n, _| match replies.get(n).or(replies.last()) {
            Some(reply) => Ok(reply.clone()),
            None => bail!("MockGenerator: empty sequence"),
        })
    }

    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self::from_fn(move |_, _| bail!("{message}"))
    }

    /// Writer that returns `summary` for summary drafts and `tags` for tag drafts.
    pub fn drafts(summary: &str, tags: &[&str]) -> Self {
        let summary = summary.to_string();
        let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        Self::from_fn(move |_, call| match call.schema_name.as_str() {
            "SummaryDraft" => Ok(json!({ "summary": summary }).to_string()),
            "TagsDraft" => Ok(json!({ "tags": tags }).to_string()),
            other => bail!("MockGenerator: unexpected schema {other}"),
        })
    }

    /// Judge that passes everything.
    pub fn judge_passing() -> Self {
        Self::fixed(&verdict(true, "Meets every rule."))
    }

    /// Judge that rejects everything with `reason`.
    pub fn judge_rejecting(reason: &str) -> Self {
        Self::fixed(&verdict(false, reason))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Recorded requests for one schema, in call order.
    pub fn calls_for(&self, schema_name: &str) -> Vec<GenerationCall> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.schema_name == schema_name)
            .cloned()
            .collect()
    }
}

/// JSON text of a judge verdict.
pub fn verdict(passed: bool, reason: &str) -> String {
    json!({ "passed": passed, "reason": reason }).to_string()
}

#[async_trait]
impl Generator for MockGenerator {
    async fn complete_json(
        &self,
        system: &str,
        prompt: &str,
        schema_name: &str,
        _schema: Value,
    ) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let call = GenerationCall {
            schema_name: schema_name.to_string(),
            system: system.to_string(),
            prompt: prompt.to_string(),
        };
        self.log.lock().unwrap().push(call.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(n, &call)
    }
}

// ---------------------------------------------------------------------------
// MockClassifier
// ---------------------------------------------------------------------------

pub struct MockClassifier {
    flagged_categories: Option<Vec<String>>,
    fail: bool,
    inputs: Mutex<Vec<String>>,
}

impl MockClassifier {
    pub fn safe() -> Self {
        Self {
            flagged_categories: None,
            fail: false,
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn flagged(categories: &[&str]) -> Self {
        Self {
            flagged_categories: Some(categories.iter().map(|c| c.to_string()).collect()),
            ..Self::safe()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::safe()
        }
    }

    pub fn calls(&self) -> usize {
        self.inputs.lock().unwrap().len()
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl SafetyClassifier for MockClassifier {
    async fn classify(&self, text: &str) -> Result<ModerationResult> {
        self.inputs.lock().unwrap().push(text.to_string());
        if self.fail {
            bail!("MockClassifier: moderation endpoint unavailable");
        }
        Ok(match &self.flagged_categories {
            Some(categories) => ModerationResult {
                flagged: true,
                categories: categories.clone(),
            },
            None => ModerationResult {
                flagged: false,
                categories: Vec::new(),
            },
        })
    }
}

// ---------------------------------------------------------------------------
// MockContent
// ---------------------------------------------------------------------------

/// Canned fetch-stage outputs. Defaults to fully degraded content.
pub struct MockContent {
    markdown: MarkdownResult,
    metadata: PageMetadata,
    web_context: Option<String>,
    calls: AtomicUsize,
}

impl MockContent {
    pub fn new() -> Self {
        Self {
            markdown: MarkdownResult::empty(),
            metadata: PageMetadata::default(),
            web_context: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_markdown(mut self, markdown: &str) -> Self {
        self.markdown = MarkdownResult::new(markdown, MarkdownProvenance::PageRender);
        self
    }

    pub fn with_metadata(mut self, metadata: PageMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_web_context(mut self, context: &str) -> Self {
        self.web_context = Some(context.to_string());
        self
    }

    /// Total fetcher invocations across all three methods.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockContent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentSource for MockContent {
    async fn markdown(&self, _url: &str) -> MarkdownResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.markdown.clone()
    }

    async fn metadata(&self, _url: &str) -> PageMetadata {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.metadata.clone()
    }

    async fn web_context(&self, _url: &str) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.web_context.clone()
    }
}

// ---------------------------------------------------------------------------
// MockVocabulary
// ---------------------------------------------------------------------------

pub struct MockVocabulary {
    outcome: Box<dyn Fn() -> bookmark_client::Result<Vec<String>> + Send + Sync>,
    calls: AtomicUsize,
}

impl MockVocabulary {
    pub fn tags(tags: &[&str]) -> Self {
        let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        Self {
            outcome: Box::new(move || Ok(tags.clone())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: impl Fn() -> BookmarkError + Send + Sync + 'static) -> Self {
        Self {
            outcome: Box::new(move || Err(error())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TagVocabulary for MockVocabulary {
    async fn existing_tags(&self) -> bookmark_client::Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.outcome)()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A well-formed article page with metadata.
pub fn article_content() -> MockContent {
    MockContent::new()
        .with_markdown(
            "# Structured concurrency in async Rust\n\n\
             Tokio tasks, cancellation on drop, and FuturesUnordered patterns \
             for racing speculative work.",
        )
        .with_metadata(PageMetadata {
            title: Some("Structured concurrency in async Rust".into()),
            description: Some("Racing futures and cancelling the losers.".into()),
            lang: Some("en".into()),
            og_type: Some("article".into()),
            site_name: Some("Example Blog".into()),
            canonical_url: Some("https://blog.example.com/structured-concurrency".into()),
            ..Default::default()
        })
        .with_web_context("- Discussion: Readers compare Tokio JoinSet with FuturesUnordered.")
}

/// Pipeline over the given mocks with default generation settings.
pub fn pipeline_with(
    content: Arc<dyn ContentSource>,
    classifier: Arc<dyn SafetyClassifier>,
    writer: Arc<dyn Generator>,
    judge: Arc<dyn Generator>,
) -> AnnotationPipeline {
    AnnotationPipeline::new(
        PipelineDeps::builder()
            .content(content)
            .classifier(classifier)
            .writer(writer)
            .judge(judge)
            .generation_timeout(Duration::from_secs(5))
            .build(),
    )
}
