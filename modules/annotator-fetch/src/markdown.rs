// MarkdownFetcher: best-effort page markdown with per-content-type fallback.
//
// Social-status URLs: status API -> oEmbed -> generic render. A generic render
// that turns out to be the host's interstitial/error page is never returned;
// the specialized chain gets one more try and the interstitial is dropped.
// Everything else: generic render only.

use std::sync::Arc;

use annotator_common::{truncate_chars, MarkdownProvenance, MarkdownResult, MARKDOWN_CHAR_CAP};
use tracing::{info, warn};

use crate::router::{social_status, StatusRef};
use crate::traits::{PageRenderer, StatusSource};

/// Phrases that only appear on the status host's JS-wall / error / login pages.
const INTERSTITIAL_SIGNATURES: &[&str] = &[
    "something went wrong, but don't fret",
    "javascript is not available",
    "we've detected that javascript is disabled",
    "this page is not supported. please visit the author's profile",
    "don't miss what's happening",
    "hmm...this page doesn't exist",
];

/// True if `markdown` looks like an interstitial page rather than post content.
pub fn is_interstitial(markdown: &str) -> bool {
    let normalized = markdown.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'");
    INTERSTITIAL_SIGNATURES
        .iter()
        .any(|sig| normalized.contains(sig))
}

pub struct MarkdownFetcher {
    renderer: Option<Arc<dyn PageRenderer>>,
    status_sources: Vec<Arc<dyn StatusSource>>,
}

impl MarkdownFetcher {
    /// `status_sources` are tried in order for social-status URLs.
    pub fn new(
        renderer: Option<Arc<dyn PageRenderer>>,
        status_sources: Vec<Arc<dyn StatusSource>>,
    ) -> Self {
        Self {
            renderer,
            status_sources,
        }
    }

    /// Never fails: total failure yields empty markdown with `None` provenance.
    pub async fn fetch(&self, url: &str) -> MarkdownResult {
        let Some(status) = social_status(url) else {
            return self.rendered(url).await;
        };

        if let Some(result) = self.status_chain(&status).await {
            return result;
        }

        let Some(markdown) = self.render(url).await else {
            return MarkdownResult::empty();
        };

        if !is_interstitial(&markdown) {
            return MarkdownResult::new(markdown, MarkdownProvenance::PageRender);
        }

        warn!(url, "markdown: render returned an interstitial page, retrying status chain");
        self.status_chain(&status)
            .await
            .unwrap_or_else(MarkdownResult::empty)
    }

    async fn rendered(&self, url: &str) -> MarkdownResult {
        match self.render(url).await {
            Some(markdown) => MarkdownResult::new(markdown, MarkdownProvenance::PageRender),
            None => MarkdownResult::empty(),
        }
    }

    /// First status source that yields non-empty markdown.
    async fn status_chain(&self, status: &StatusRef) -> Option<MarkdownResult> {
        for (tier, source) in self.status_sources.iter().enumerate() {
            match source.fetch(status).await {
                Ok(markdown) if !markdown.trim().is_empty() => {
                    info!(source = source.name(), id = %status.id, "markdown: status extracted");
                    let provenance = if tier == 0 {
                        MarkdownProvenance::StatusApi
                    } else {
                        MarkdownProvenance::StatusOembed
                    };
                    return Some(MarkdownResult::new(
                        truncate_chars(markdown.trim(), MARKDOWN_CHAR_CAP),
                        provenance,
                    ));
                }
                Ok(_) => {
                    info!(source = source.name(), id = %status.id, "markdown: status source returned nothing");
                }
                Err(e) => {
                    warn!(source = source.name(), id = %status.id, error = %e, "markdown: status source failed");
                }
            }
        }
        None
    }

    /// Generic render, capped. `None` when unavailable, failed, or blank.
    async fn render(&self, url: &str) -> Option<String> {
        let renderer = self.renderer.as_ref()?;
        match renderer.render(url).await {
            Ok(markdown) if !markdown.trim().is_empty() => {
                let markdown = markdown.trim();
                info!(url, chars = markdown.chars().count(), "markdown: rendered");
                Some(truncate_chars(markdown, MARKDOWN_CHAR_CAP))
            }
            Ok(_) => {
                warn!(url, "markdown: render returned empty content");
                None
            }
            Err(e) => {
                warn!(url, error = %e, "markdown: render failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::{bail, Result};
    use async_trait::async_trait;

    const STATUS_URL: &str = "https://x.com/rustlang/status/1234";
    const INTERSTITIAL: &str =
        "Something went wrong, but don\u{2019}t fret \u{2014} let\u{2019}s give it another shot.";

    struct FixedRenderer {
        output: Result<String, String>,
        calls: AtomicUsize,
    }

    impl FixedRenderer {
        fn ok(markdown: &str) -> Arc<Self> {
            Arc::new(Self {
                output: Ok(markdown.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                output: Err("render service down".to_string()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PageRenderer for FixedRenderer {
        async fn render(&self, _url: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.output {
                Ok(md) => Ok(md.clone()),
                Err(e) => bail!("{e}"),
            }
        }
    }

    /// Returns its scripted outputs in order, then repeats the last one.
    struct ScriptedStatus {
        name: &'static str,
        outputs: Vec<Option<&'static str>>,
        calls: AtomicUsize,
    }

    impl ScriptedStatus {
        fn new(name: &'static str, outputs: Vec<Option<&'static str>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                outputs,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl StatusSource for ScriptedStatus {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self, _status: &StatusRef) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let output = self.outputs[n.min(self.outputs.len() - 1)];
            match output {
                Some(md) => Ok(md.to_string()),
                None => bail!("{} unavailable", self.name),
            }
        }
    }

    fn fetcher(
        renderer: Arc<FixedRenderer>,
        primary: Arc<ScriptedStatus>,
        secondary: Arc<ScriptedStatus>,
    ) -> MarkdownFetcher {
        let sources: Vec<Arc<dyn StatusSource>> = vec![primary, secondary];
        MarkdownFetcher::new(Some(renderer), sources)
    }

    #[test]
    fn detects_interstitial_with_curly_quotes() {
        assert!(is_interstitial(INTERSTITIAL));
        assert!(is_interstitial("JavaScript is not available.\n\nWe’ve detected..."));
        assert!(!is_interstitial("# Release notes\n\nRust 1.80 ships LazyLock."));
    }

    #[tokio::test]
    async fn generic_url_uses_render_only() {
        let renderer = FixedRenderer::ok("# Article\n\nBody");
        let primary = ScriptedStatus::new("primary", vec![Some("never")]);
        let secondary = ScriptedStatus::new("secondary", vec![Some("never")]);
        let f = fetcher(renderer.clone(), primary.clone(), secondary.clone());

        let result = f.fetch("https://blog.example.com/post").await;

        assert_eq!(result.markdown, "# Article\n\nBody");
        assert_eq!(result.provenance, MarkdownProvenance::PageRender);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn generic_render_is_capped() {
        let long = "a".repeat(MARKDOWN_CHAR_CAP + 500);
        let f = MarkdownFetcher::new(Some(FixedRenderer::ok(&long)), vec![]);

        let result = f.fetch("https://blog.example.com/long").await;

        assert_eq!(result.markdown.chars().count(), MARKDOWN_CHAR_CAP);
    }

    #[tokio::test]
    async fn status_prefers_primary() {
        let renderer = FixedRenderer::ok("rendered");
        let primary = ScriptedStatus::new("primary", vec![Some("post text")]);
        let secondary = ScriptedStatus::new("secondary", vec![Some("oembed text")]);
        let f = fetcher(renderer.clone(), primary, secondary.clone());

        let result = f.fetch(STATUS_URL).await;

        assert_eq!(result.markdown, "post text");
        assert_eq!(result.provenance, MarkdownProvenance::StatusApi);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn status_falls_back_to_secondary() {
        let primary = ScriptedStatus::new("primary", vec![None]);
        let secondary = ScriptedStatus::new("secondary", vec![Some("oembed text")]);
        let f = fetcher(FixedRenderer::ok("rendered"), primary, secondary);

        let result = f.fetch(STATUS_URL).await;

        assert_eq!(result.markdown, "oembed text");
        assert_eq!(result.provenance, MarkdownProvenance::StatusOembed);
    }

    #[tokio::test]
    async fn status_falls_back_to_render_when_chain_fails() {
        let primary = ScriptedStatus::new("primary", vec![None]);
        let secondary = ScriptedStatus::new("secondary", vec![Some("")]);
        let f = fetcher(FixedRenderer::ok("Real post content"), primary, secondary);

        let result = f.fetch(STATUS_URL).await;

        assert_eq!(result.markdown, "Real post content");
        assert_eq!(result.provenance, MarkdownProvenance::PageRender);
    }

    #[tokio::test]
    async fn interstitial_is_discarded_when_retry_fails() {
        let renderer = FixedRenderer::ok(INTERSTITIAL);
        let primary = ScriptedStatus::new("primary", vec![None]);
        let secondary = ScriptedStatus::new("secondary", vec![None]);
        let f = fetcher(renderer, primary.clone(), secondary.clone());

        let result = f.fetch(STATUS_URL).await;

        assert_eq!(result.markdown, "");
        assert_eq!(result.provenance, MarkdownProvenance::None);
        // Specialized chain ran twice: before the render and once after the interstitial.
        assert_eq!(primary.calls.load(Ordering::SeqCst), 2);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn interstitial_retry_can_recover() {
        let primary = ScriptedStatus::new("primary", vec![None, Some("recovered post")]);
        let secondary = ScriptedStatus::new("secondary", vec![None]);
        let f = fetcher(FixedRenderer::ok(INTERSTITIAL), primary, secondary);

        let result = f.fetch(STATUS_URL).await;

        assert_eq!(result.markdown, "recovered post");
        assert_eq!(result.provenance, MarkdownProvenance::StatusApi);
    }

    #[tokio::test]
    async fn total_failure_is_empty_not_error() {
        let primary = ScriptedStatus::new("primary", vec![None]);
        let secondary = ScriptedStatus::new("secondary", vec![None]);
        let f = fetcher(FixedRenderer::failing(), primary, secondary);

        let result = f.fetch(STATUS_URL).await;
        assert_eq!(result, MarkdownResult::empty());

        let generic = MarkdownFetcher::new(Some(FixedRenderer::failing()), vec![]);
        assert_eq!(generic.fetch("https://example.com").await, MarkdownResult::empty());

        let no_renderer = MarkdownFetcher::new(None, vec![]);
        assert_eq!(no_renderer.fetch("https://example.com").await, MarkdownResult::empty());
    }
}
