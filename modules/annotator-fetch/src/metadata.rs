use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use annotator_common::{squash_whitespace, truncate_chars, PageMetadata};
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::router::is_video_host;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; BookmarkAnnotator/0.1)";
const VIDEO_OEMBED_URL: &str = "https://www.youtube.com/oembed";
const VIDEO_SITE_NAME: &str = "youtube";

/// Pages are parsed from at most this many characters of HTML.
const HTML_CHAR_CAP: usize = 500_000;

/// Individual metadata values are cut off at this many characters.
const FIELD_CHAR_CAP: usize = 500;

static META_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[content]").expect("valid selector"));
static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("head title, title").expect("valid selector"));
static HTML_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("html[lang]").expect("valid selector"));
static CANONICAL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("link[rel][href]").expect("valid selector"));

pub struct MetadataFetcher {
    client: reqwest::Client,
    video_oembed_url: String,
}

impl MetadataFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(Duration::from_secs(15))
                .build()
                .expect("Failed to build HTTP client"),
            video_oembed_url: VIDEO_OEMBED_URL.to_string(),
        }
    }

    pub fn with_video_oembed_url(mut self, url: &str) -> Self {
        self.video_oembed_url = url.to_string();
        self
    }

    /// Never fails: any error degrades to empty metadata.
    pub async fn fetch(&self, url: &str) -> PageMetadata {
        let mut metadata = match self.fetch_html(url).await {
            Ok(html) => parse_metadata(&html, url),
            Err(e) => {
                warn!(url, error = %e, "metadata: page fetch failed");
                PageMetadata::default()
            }
        };

        if is_video_host(url) && needs_video_fallback(&metadata) {
            match self.video_oembed(url).await {
                Ok(embed) => embed.fill(&mut metadata),
                Err(e) => warn!(url, error = %e, "metadata: video oembed fallback failed"),
            }
        }

        info!(
            url,
            has_title = metadata.title.is_some(),
            has_description = metadata.description.is_some(),
            lang = metadata.lang.as_deref().unwrap_or(""),
            "metadata: extracted"
        );
        metadata
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        let body = self
            .client
            .get(url)
            .send()
            .await
            .context("page request failed")?
            .error_for_status()
            .context("page returned an error status")?
            .text()
            .await
            .context("failed to read page body")?;
        Ok(truncate_chars(&body, HTML_CHAR_CAP))
    }

    async fn video_oembed(&self, url: &str) -> Result<VideoOembed> {
        debug!(url, "metadata: falling back to video oembed");
        self.client
            .get(&self.video_oembed_url)
            .query(&[("url", url), ("format", "json")])
            .send()
            .await
            .context("video oembed request failed")?
            .error_for_status()
            .context("video oembed returned an error status")?
            .json()
            .await
            .context("failed to parse video oembed response")
    }
}

impl Default for MetadataFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct VideoOembed {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author_name: Option<String>,
    #[serde(default)]
    provider_name: Option<String>,
}

impl VideoOembed {
    fn fill(self, metadata: &mut PageMetadata) {
        if let Some(title) = clean(self.title) {
            metadata.title = Some(title);
        }
        if metadata.author.is_none() {
            metadata.author = clean(self.author_name);
        }
        if metadata.site_name.is_none() {
            metadata.site_name = clean(self.provider_name);
        }
        if metadata.og_type.is_none() {
            metadata.og_type = Some("video".to_string());
        }
    }
}

/// Video pages served to non-browsers often carry only the site name as title.
fn needs_video_fallback(metadata: &PageMetadata) -> bool {
    match metadata.title.as_deref() {
        None => true,
        Some(title) => {
            let title = title.trim().to_lowercase();
            title.is_empty() || title == VIDEO_SITE_NAME
        }
    }
}

/// Extract normalized metadata from `html`. `requested_url` is used to reject a
/// canonical URL that merely repeats the request.
pub fn parse_metadata(html: &str, requested_url: &str) -> PageMetadata {
    let document = Html::parse_document(html);

    let mut props: Vec<(String, String)> = Vec::new();
    for element in document.select(&META_SEL) {
        let key = element
            .value()
            .attr("property")
            .or_else(|| element.value().attr("name"))
            .map(|k| k.trim().to_lowercase());
        let (Some(key), Some(content)) = (key, element.value().attr("content")) else {
            continue;
        };
        props.push((key, content.to_string()));
    }
    let meta = |key: &str| {
        props
            .iter()
            .find(|(k, v)| k == key && !v.trim().is_empty())
            .and_then(|(_, v)| clean(Some(v.clone())))
    };

    let title_tag = document
        .select(&TITLE_SEL)
        .next()
        .and_then(|el| clean(Some(el.text().collect::<String>())));

    let lang = document
        .select(&HTML_SEL)
        .next()
        .and_then(|el| clean(el.value().attr("lang").map(str::to_string)))
        .or_else(|| meta("og:locale").map(|l| l.replace('_', "-")));

    let declared_canonical = document
        .select(&CANONICAL_SEL)
        .find(|el| {
            el.value()
                .attr("rel")
                .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("canonical")))
        })
        .and_then(|el| el.value().attr("href").map(str::to_string))
        .or_else(|| meta("og:url"));

    PageMetadata {
        title: meta("og:title").or_else(|| meta("twitter:title")).or(title_tag),
        description: meta("og:description")
            .or_else(|| meta("description"))
            .or_else(|| meta("twitter:description")),
        lang,
        og_type: meta("og:type"),
        site_name: meta("og:site_name"),
        keywords: meta("keywords"),
        author: meta("author").or_else(|| meta("article:author")),
        canonical_url: declared_canonical.and_then(|c| accept_canonical(&c, requested_url)),
    }
}

/// Keep a declared canonical URL only if it is absolute http(s) and points
/// somewhere other than the requested URL.
fn accept_canonical(declared: &str, requested_url: &str) -> Option<String> {
    let canonical = annotator_common::parse_http_url(declared)?;
    let same = url::Url::parse(requested_url.trim())
        .map(|requested| comparable(&requested) == comparable(&canonical))
        .unwrap_or(false);
    if same {
        return None;
    }
    Some(canonical.to_string())
}

fn comparable(url: &url::Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.as_str().trim_end_matches('/').to_string()
}

fn clean(value: Option<String>) -> Option<String> {
    let value = squash_whitespace(value?.trim());
    if value.is_empty() {
        None
    } else {
        Some(truncate_chars(&value, FIELD_CHAR_CAP))
    }
}
