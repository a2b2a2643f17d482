// Social-status services: the two tiers of specialized status extraction.
//
// Primary: FxTwitter-style JSON status API, gives text + author + quoted post.
// Secondary: publish oEmbed endpoint, gives an HTML blockquote we convert to markdown.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::readability::fragment_to_markdown;
use crate::router::StatusRef;
use crate::traits::StatusSource;

const FX_API_URL: &str = "https://api.fxtwitter.com";
const OEMBED_URL: &str = "https://publish.twitter.com/oembed";

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .expect("Failed to build HTTP client")
}

// ---------------------------------------------------------------------------
// Primary: structured status API
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FxResponse {
    #[serde(default)]
    tweet: Option<FxTweet>,
}

#[derive(Debug, Deserialize)]
struct FxTweet {
    #[serde(default)]
    text: String,
    #[serde(default)]
    author: Option<FxAuthor>,
    #[serde(default)]
    quote: Option<Box<FxTweet>>,
}

#[derive(Debug, Deserialize)]
struct FxAuthor {
    #[serde(default)]
    name: String,
    #[serde(default)]
    screen_name: String,
}

impl FxAuthor {
    fn byline(&self) -> String {
        match (self.name.trim(), self.screen_name.trim()) {
            ("", "") => String::new(),
            (name, "") => name.to_string(),
            ("", handle) => format!("@{handle}"),
            (name, handle) => format!("{name} (@{handle})"),
        }
    }
}

impl FxTweet {
    fn to_markdown(&self) -> String {
        let text = self.text.trim();
        if text.is_empty() {
            return String::new();
        }

        let mut out = String::new();
        if let Some(byline) = self.author.as_ref().map(FxAuthor::byline) {
            if !byline.is_empty() {
                out.push_str(&format!("**{byline}**\n\n"));
            }
        }
        out.push_str(text);

        if let Some(quote) = &self.quote {
            let quoted = quote.text.trim();
            if !quoted.is_empty() {
                let who = quote
                    .author
                    .as_ref()
                    .map(FxAuthor::byline)
                    .unwrap_or_default();
                out.push_str("\n\n> Quoting ");
                out.push_str(if who.is_empty() { "a post" } else { who.as_str() });
                out.push_str(":\n> ");
                out.push_str(&quoted.replace('\n', "\n> "));
            }
        }
        out
    }
}

pub struct FxStatusService {
    client: reqwest::Client,
    base_url: String,
}

impl FxStatusService {
    pub fn new() -> Self {
        Self {
            client: http_client(),
            base_url: FX_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

impl Default for FxStatusService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusSource for FxStatusService {
    fn name(&self) -> &'static str {
        "status_api"
    }

    async fn fetch(&self, status: &StatusRef) -> Result<String> {
        let user = status.user.as_deref().unwrap_or("i");
        let url = format!("{}/{}/status/{}", self.base_url, user, status.id);
        debug!(url, "status: fetching via status api");

        let resp: FxResponse = self
            .client
            .get(&url)
            .send()
            .await
            .context("status API request failed")?
            .error_for_status()
            .context("status API returned an error status")?
            .json()
            .await
            .context("failed to parse status API response")?;

        Ok(resp.tweet.map(|t| t.to_markdown()).unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Secondary: oEmbed
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct OembedResponse {
    #[serde(default)]
    html: String,
}

pub struct OembedStatusService {
    client: reqwest::Client,
    endpoint: String,
}

impl OembedStatusService {
    pub fn new() -> Self {
        Self {
            client: http_client(),
            endpoint: OEMBED_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}

impl Default for OembedStatusService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusSource for OembedStatusService {
    fn name(&self) -> &'static str {
        "status_oembed"
    }

    async fn fetch(&self, status: &StatusRef) -> Result<String> {
        let target = status.canonical_url();
        debug!(url = %target, "status: fetching via oembed");

        let resp: OembedResponse = self
            .client
            .get(&self.endpoint)
            .query(&[("url", target.as_str()), ("omit_script", "true"), ("dnt", "true")])
            .send()
            .await
            .context("oEmbed request failed")?
            .error_for_status()
            .context("oEmbed returned an error status")?
            .json()
            .await
            .context("failed to parse oEmbed response")?;

        if resp.html.trim().is_empty() {
            return Ok(String::new());
        }
        Ok(fragment_to_markdown(&resp.html, Some(&target)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn status() -> StatusRef {
        StatusRef {
            user: Some("rustlang".into()),
            id: "99".into(),
        }
    }

    #[test]
    fn tweet_markdown_includes_byline_and_quote() {
        let tweet: FxTweet = serde_json::from_value(serde_json::json!({
            "text": "Rust 2.0 is not happening.",
            "author": {"name": "Rust Language", "screen_name": "rustlang"},
            "quote": {"text": "Is Rust 2.0 coming?\nAsking for a friend", "author": {"screen_name": "ferris"}}
        }))
        .unwrap();

        let md = tweet.to_markdown();
        assert!(md.starts_with("**Rust Language (@rustlang)**"));
        assert!(md.contains("Rust 2.0 is not happening."));
        assert!(md.contains("> Quoting @ferris:\n> Is Rust 2.0 coming?\n> Asking for a friend"));
    }

    #[test]
    fn empty_text_gives_empty_markdown() {
        let tweet: FxTweet = serde_json::from_value(serde_json::json!({
            "text": "  ",
            "author": {"name": "Someone", "screen_name": "someone"}
        }))
        .unwrap();
        assert_eq!(tweet.to_markdown(), "");
    }

    #[tokio::test]
    async fn status_api_fetches_by_user_and_id() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rustlang/status/99"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 200,
                "tweet": {"text": "hello", "author": {"name": "Rust", "screen_name": "rustlang"}}
            })))
            .mount(&server)
            .await;

        let service = FxStatusService::new().with_base_url(&server.uri());
        let md = service.fetch(&status()).await.unwrap();
        assert!(md.contains("hello"));
    }

    #[tokio::test]
    async fn status_api_404_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let service = FxStatusService::new().with_base_url(&server.uri());
        assert!(service.fetch(&status()).await.is_err());
    }

    #[tokio::test]
    async fn oembed_with_empty_html_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/oembed"))
            .and(query_param("url", "https://x.com/rustlang/status/99"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"html": ""})))
            .expect(1)
            .mount(&server)
            .await;

        let service =
            OembedStatusService::new().with_endpoint(&format!("{}/oembed", server.uri()));
        assert_eq!(service.fetch(&status()).await.unwrap(), "");
    }
}
