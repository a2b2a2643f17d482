pub mod markdown;
pub mod metadata;
pub mod readability;
pub mod router;
pub mod services;
pub mod traits;
pub mod web_context;

use std::sync::Arc;

use annotator_common::Config;
use page_render_client::PageRenderClient;
use tracing::info;

pub use markdown::{is_interstitial, MarkdownFetcher};
pub use metadata::{parse_metadata, MetadataFetcher};
pub use router::{is_social_status, is_video_host, social_status, StatusRef};
pub use services::search::SerperSearcher;
pub use services::status::{FxStatusService, OembedStatusService};
pub use traits::{PageRenderer, SearchHit, StatusSource, WebSearcher};
pub use web_context::WebContextFetcher;

/// The three content fetchers of the fetch stage, wired to their services.
pub struct Fetchers {
    pub markdown: MarkdownFetcher,
    pub metadata: MetadataFetcher,
    pub web_context: WebContextFetcher,
}

impl Fetchers {
    /// Build the production fetchers. Services whose keys are absent are left
    /// out and their fetchers degrade to empty results.
    pub fn from_config(config: &Config) -> Self {
        let renderer: Option<Arc<dyn PageRenderer>> = config.render_base_url.as_deref().map(|base| {
            Arc::new(PageRenderClient::new(base, config.render_token.as_deref())) as Arc<dyn PageRenderer>
        });
        let searcher: Option<Arc<dyn WebSearcher>> = config
            .serper_api_key
            .as_deref()
            .map(|key| Arc::new(SerperSearcher::new(key)) as Arc<dyn WebSearcher>);

        info!(
            render = renderer.is_some(),
            search = searcher.is_some(),
            "fetchers: configured"
        );

        let status_sources: Vec<Arc<dyn StatusSource>> = vec![
            Arc::new(FxStatusService::new()),
            Arc::new(OembedStatusService::new()),
        ];

        Self {
            markdown: MarkdownFetcher::new(renderer, status_sources),
            metadata: MetadataFetcher::new(),
            web_context: WebContextFetcher::new(searcher),
        }
    }
}
