// Trait seams for the fetch-stage collaborators.
//
// PageRenderer: generic headless page to markdown rendering.
// StatusSource: one tier of the specialized social-status extraction chain.
// WebSearcher: web search used to build supplementary context.
//
// Fetchers hold these as `Arc<dyn _>` so tests can swap in fakes without HTTP.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::router::StatusRef;

#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Render `url` and return its markdown. Empty output is not an error.
    async fn render(&self, url: &str) -> Result<String>;
}

#[async_trait]
impl PageRenderer for page_render_client::PageRenderClient {
    async fn render(&self, url: &str) -> Result<String> {
        Ok(self.markdown(url).await?)
    }
}

#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Extract a status post as markdown. Empty output means "nothing found".
    async fn fetch(&self, status: &StatusRef) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

#[async_trait]
pub trait WebSearcher: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;
}
