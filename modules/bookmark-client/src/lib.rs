pub mod error;
pub mod signer;
mod types;

pub use error::{BookmarkError, Result};
pub use signer::{BearerSigner, RequestSigner};

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use rand::Rng;
use regex::Regex;
use reqwest::header::{HeaderMap, LOCATION, WWW_AUTHENTICATE};
use reqwest::{Method, StatusCode};
use tracing::{info, warn};

use types::TagsResponse;

/// Attempts before an unexplained 401 becomes fatal.
const MAX_ATTEMPTS: u32 = 3;
/// Backoff after the first unexplained 401; doubles on each further retry,
/// plus up to 100ms of jitter.
const BACKOFF_BASE: Duration = Duration::from_millis(500);

static PROBLEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:oauth_)?problem\s*=\s*"?([A-Za-z0-9_.\-]+)"?"#).expect("valid regex")
});

pub struct BookmarkClient {
    client: reqwest::Client,
    base_url: String,
    signer: Arc<dyn RequestSigner>,
}

impl BookmarkClient {
    pub fn new(base_url: &str, signer: Arc<dyn RequestSigner>) -> Self {
        // The service drops auth headers across redirects, so redirects are
        // surfaced as errors instead of followed.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            signer,
        }
    }

    /// Fetch the user's tag vocabulary.
    ///
    /// Only a 401 without a problem code is retried (the signing clock may have
    /// been briefly rejected); everything else is terminal on first sight.
    pub async fn tags(&self) -> Result<Vec<String>> {
        let url = format!("{}/tags", self.base_url);
        let mut backoff = BACKOFF_BASE;

        for attempt in 1..=MAX_ATTEMPTS {
            let headers = self.signer.sign(&Method::GET, &url)?;
            let resp = self.client.get(&url).headers(headers).send().await?;
            let status = resp.status();

            if status.is_redirection() {
                let location = header_str(resp.headers(), LOCATION);
                warn!(status = status.as_u16(), location = ?location, "bookmark: refusing redirect");
                return Err(BookmarkError::Redirect {
                    status: status.as_u16(),
                    location,
                });
            }

            if status.is_success() {
                let body: TagsResponse = resp.json().await?;
                let tags = body.into_names();
                info!(attempt, count = tags.len(), "bookmark: fetched tags");
                return Ok(tags);
            }

            if status == StatusCode::UNAUTHORIZED {
                if let Some(problem) = problem_code(resp.headers()) {
                    warn!(attempt, problem = %problem, "bookmark: unauthorized with problem code");
                    return Err(BookmarkError::Unauthorized { problem });
                }
                if attempt < MAX_ATTEMPTS {
                    warn!(attempt, backoff_ms = backoff.as_millis() as u64, "bookmark: unauthorized, retrying with a fresh signature");
                    let jitter = Duration::from_millis(rand::rng().random_range(0..=100));
                    tokio::time::sleep(backoff + jitter).await;
                    backoff *= 2;
                    continue;
                }
                break;
            }

            let message = resp.text().await.unwrap_or_default();
            return Err(BookmarkError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Err(BookmarkError::Exhausted {
            attempts: MAX_ATTEMPTS,
        })
    }
}

/// Machine-readable problem code from a `WWW-Authenticate` challenge, if any.
fn problem_code(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|challenge| {
            PROBLEM_RE
                .captures(challenge)
                .map(|c| c[1].to_string())
        })
}

fn header_str(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    use reqwest::header::HeaderValue;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Counts signatures and stamps each with its sequence number.
    struct CountingSigner {
        calls: AtomicU32,
    }

    impl CountingSigner {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
            })
        }
    }

    impl RequestSigner for CountingSigner {
        fn sign(&self, _method: &Method, _url: &str) -> Result<HeaderMap> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let mut headers = HeaderMap::new();
            headers.insert("x-request-nonce", HeaderValue::from(n));
            Ok(headers)
        }
    }

    fn tags_body() -> serde_json::Value {
        serde_json::json!({ "tags": [{"tag": "rust"}, {"tag": " async "}, {"tag": ""}] })
    }

    #[test]
    fn parses_problem_codes() {
        let mut headers = HeaderMap::new();
        headers.insert(
            WWW_AUTHENTICATE,
            HeaderValue::from_static(r#"OAuth realm="api", oauth_problem="timestamp_refused""#),
        );
        assert_eq!(problem_code(&headers).as_deref(), Some("timestamp_refused"));

        let mut bare = HeaderMap::new();
        bare.insert(WWW_AUTHENTICATE, HeaderValue::from_static(r#"OAuth realm="api""#));
        assert_eq!(problem_code(&bare), None);

        assert_eq!(problem_code(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn retries_unexplained_401_then_succeeds() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/tags"))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(tags_body()))
            .expect(1)
            .mount(&server)
            .await;

        let signer = CountingSigner::new();
        let client = BookmarkClient::new(&server.uri(), signer.clone());

        let started = Instant::now();
        let tags = client.tags().await.unwrap();

        assert_eq!(tags, vec!["rust".to_string(), "async".to_string()]);
        assert_eq!(signer.calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn problem_coded_401_is_terminal() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/tags"))
            .respond_with(
                ResponseTemplate::new(401)
                    .insert_header("www-authenticate", r#"OAuth oauth_problem="token_rejected""#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = BookmarkClient::new(&server.uri(), CountingSigner::new());
        match client.tags().await {
            Err(BookmarkError::Unauthorized { problem }) => assert_eq!(problem, "token_rejected"),
            other => panic!("expected Unauthorized, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn redirect_is_terminal_and_not_followed() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/tags"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/elsewhere"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/elsewhere"))
            .respond_with(ResponseTemplate::new(200).set_body_json(tags_body()))
            .expect(0)
            .mount(&server)
            .await;

        let client = BookmarkClient::new(&server.uri(), CountingSigner::new());
        match client.tags().await {
            Err(BookmarkError::Redirect { status, location }) => {
                assert_eq!(status, 302);
                assert_eq!(location.as_deref(), Some("/elsewhere"));
            }
            other => panic!("expected Redirect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn three_unexplained_401s_exhaust() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/tags"))
            .respond_with(ResponseTemplate::new(401))
            .expect(3)
            .mount(&server)
            .await;

        let client = BookmarkClient::new(&server.uri(), CountingSigner::new());
        assert!(matches!(
            client.tags().await,
            Err(BookmarkError::Exhausted { attempts: 3 })
        ));
    }

    #[tokio::test]
    async fn server_error_is_terminal() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/tags"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let client = BookmarkClient::new(&server.uri(), CountingSigner::new());
        assert!(matches!(
            client.tags().await,
            Err(BookmarkError::Api { status: 500, .. })
        ));
    }
}
