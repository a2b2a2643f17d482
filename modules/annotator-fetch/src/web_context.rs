// WebContextFetcher: short supplementary prose about the bookmarked URL,
// assembled from web search snippets. Best-effort; never an error.

use std::sync::Arc;

use annotator_common::{squash_whitespace, truncate_chars, WEB_CONTEXT_CHAR_CAP};
use tracing::{info, warn};

use crate::router::{social_status, StatusRef};
use crate::traits::{SearchHit, WebSearcher};

const MAX_RESULTS: usize = 5;

pub struct WebContextFetcher {
    searcher: Option<Arc<dyn WebSearcher>>,
}

impl WebContextFetcher {
    /// Without a searcher every lookup yields no context.
    pub fn new(searcher: Option<Arc<dyn WebSearcher>>) -> Self {
        Self { searcher }
    }

    pub async fn fetch(&self, url: &str) -> Option<String> {
        let searcher = self.searcher.as_ref()?;
        let query = match social_status(url) {
            Some(status) => thread_query(&status),
            None => page_query(url),
        };

        let hits = match searcher.search(&query, MAX_RESULTS).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(url, error = %e, "web_context: search failed");
                return None;
            }
        };

        let context = compose(&hits);
        info!(
            url,
            hits = hits.len(),
            chars = context.as_deref().map_or(0, |c| c.chars().count()),
            "web_context: composed"
        );
        context
    }
}

/// Replies and quotes of a status mention its id; restrict to the status host.
fn thread_query(status: &StatusRef) -> String {
    match &status.user {
        Some(user) => format!("site:x.com \"{user}/status/{}\"", status.id),
        None => format!("site:x.com \"status/{}\"", status.id),
    }
}

fn page_query(url: &str) -> String {
    let bare = url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.")
        .trim_end_matches('/');
    format!("\"{bare}\"")
}

/// One `- title: snippet` line per useful hit, capped as a whole.
fn compose(hits: &[SearchHit]) -> Option<String> {
    let lines: Vec<String> = hits
        .iter()
        .filter_map(|hit| {
            let snippet = squash_whitespace(&hit.snippet);
            if snippet.is_empty() {
                return None;
            }
            let title = squash_whitespace(&hit.title);
            Some(if title.is_empty() {
                format!("- {snippet}")
            } else {
                format!("- {title}: {snippet}")
            })
        })
        .collect();

    if lines.is_empty() {
        return None;
    }
    Some(truncate_chars(&lines.join("\n"), WEB_CONTEXT_CHAR_CAP))
}
