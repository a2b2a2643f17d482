// Trait seams for every external collaborator of the pipeline.
//
// Generator: structured-output generation (also used by the judge).
// SafetyClassifier: moderation of user-supplied context.
// ContentSource: the three fetch-stage content fetchers.
// TagVocabulary: the user's existing tags on the bookmarking service.
//
// Production wiring uses ai_client::OpenAi, annotator_fetch::Fetchers and
// bookmark_client::BookmarkClient; tests use the mocks in `crate::testing`.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use ai_client::{ModerationResult, OpenAi};
use annotator_common::{MarkdownResult, PageMetadata};
use annotator_fetch::Fetchers;
use bookmark_client::BookmarkClient;

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Generator: Send + Sync {
    /// Ask for a JSON object conforming to `schema`. Returns the raw JSON text;
    /// validation is the caller's job.
    async fn complete_json(
        &self,
        system: &str,
        prompt: &str,
        schema_name: &str,
        schema: Value,
    ) -> Result<String>;
}

#[async_trait]
impl Generator for OpenAi {
    async fn complete_json(
        &self,
        system: &str,
        prompt: &str,
        schema_name: &str,
        schema: Value,
    ) -> Result<String> {
        self.structured_output(system, prompt, schema_name, schema)
            .await
    }
}

// ---------------------------------------------------------------------------
// SafetyClassifier
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SafetyClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<ModerationResult>;
}

#[async_trait]
impl SafetyClassifier for OpenAi {
    async fn classify(&self, text: &str) -> Result<ModerationResult> {
        self.moderate(text).await
    }
}

// ---------------------------------------------------------------------------
// ContentSource
// ---------------------------------------------------------------------------

/// Fetch-stage content. Every method is best-effort and infallible: failures
/// come back as empty values.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn markdown(&self, url: &str) -> MarkdownResult;
    async fn metadata(&self, url: &str) -> PageMetadata;
    async fn web_context(&self, url: &str) -> Option<String>;
}

#[async_trait]
impl ContentSource for Fetchers {
    async fn markdown(&self, url: &str) -> MarkdownResult {
        self.markdown.fetch(url).await
    }

    async fn metadata(&self, url: &str) -> PageMetadata {
        self.metadata.fetch(url).await
    }

    async fn web_context(&self, url: &str) -> Option<String> {
        self.web_context.fetch(url).await
    }
}

// ---------------------------------------------------------------------------
// TagVocabulary
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TagVocabulary: Send + Sync {
    async fn existing_tags(&self) -> bookmark_client::Result<Vec<String>>;
}

#[async_trait]
impl TagVocabulary for BookmarkClient {
    async fn existing_tags(&self) -> bookmark_client::Result<Vec<String>> {
        self.tags().await
    }
}
