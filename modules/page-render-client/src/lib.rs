pub mod error;

pub use error::{RenderError, Result};

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

/// Response envelope of the render service.
#[derive(Debug, Deserialize)]
struct RenderResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    errors: Vec<RenderErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct RenderErrorDetail {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

pub struct PageRenderClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl PageRenderClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    /// Render `url` in a headless browser and return the page as markdown.
    ///
    /// A response with `success: false` is an [`RenderError::Unsuccessful`];
    /// a successful response without a result is an empty string.
    pub async fn markdown(&self, url: &str) -> Result<String> {
        let endpoint = format!("{}/markdown", self.base_url);
        let body = serde_json::json!({ "url": url });

        debug!(url, "page-render: requesting markdown");

        let mut request = self.client.post(&endpoint).json(&body);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(RenderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let rendered: RenderResponse = resp.json().await?;
        if !rendered.success {
            let detail = rendered
                .errors
                .iter()
                .map(|e| match e.code {
                    Some(code) => format!("{code}: {}", e.message),
                    None => e.message.clone(),
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(RenderError::Unsuccessful(detail));
        }

        Ok(rendered.result.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn returns_markdown_on_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/markdown"))
            .and(header("authorization", "Bearer render-token"))
            .and(body_json(serde_json::json!({ "url": "https://example.com/post" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "result": "# Hello\n\nWorld"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = PageRenderClient::new(&server.uri(), Some("render-token"));
        let markdown = client.markdown("https://example.com/post").await.unwrap();
        assert_eq!(markdown, "# Hello\n\nWorld");
    }

    #[tokio::test]
    async fn unsuccessful_envelope_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/markdown"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "errors": [{"code": 6001, "message": "navigation timeout"}]
            })))
            .mount(&server)
            .await;

        let client = PageRenderClient::new(&server.uri(), None);
        match client.markdown("https://example.com").await {
            Err(RenderError::Unsuccessful(detail)) => assert!(detail.contains("navigation timeout")),
            other => panic!("expected Unsuccessful, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_error_carries_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/markdown"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let client = PageRenderClient::new(&format!("{}/", server.uri()), None);
        match client.markdown("https://example.com").await {
            Err(RenderError::Api { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "overloaded");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
