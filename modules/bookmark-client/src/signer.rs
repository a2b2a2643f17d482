use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;

use crate::error::{BookmarkError, Result};

/// Produces authentication headers for a single request.
///
/// Called once per attempt. Signatures carry a timestamp and nonce, so headers
/// from one attempt must never be replayed on another.
pub trait RequestSigner: Send + Sync {
    fn sign(&self, method: &Method, url: &str) -> Result<HeaderMap>;
}

/// Token signer for deployments that front the bookmarking service with a
/// bearer-token gateway. Each call stamps a fresh timestamp and nonce.
pub struct BearerSigner {
    token: String,
}

impl BearerSigner {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl RequestSigner for BearerSigner {
    fn sign(&self, _method: &Method, _url: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token))
                .map_err(|e| BookmarkError::Signing(e.to_string()))?,
        );
        headers.insert(
            "x-request-timestamp",
            HeaderValue::from(chrono::Utc::now().timestamp()),
        );
        headers.insert(
            "x-request-nonce",
            HeaderValue::from_str(&uuid::Uuid::new_v4().simple().to_string())
                .map_err(|e| BookmarkError::Signing(e.to_string()))?,
        );
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_signature_gets_a_fresh_nonce() {
        let signer = BearerSigner::new("token");
        let first = signer.sign(&Method::GET, "https://b.example/tags").unwrap();
        let second = signer.sign(&Method::GET, "https://b.example/tags").unwrap();
        assert_eq!(first[AUTHORIZATION], "Bearer token");
        assert_ne!(first["x-request-nonce"], second["x-request-nonce"]);
    }

    #[test]
    fn rejects_token_with_invalid_header_bytes() {
        let signer = BearerSigner::new("bad\ntoken");
        assert!(matches!(
            signer.sign(&Method::GET, "https://b.example/tags"),
            Err(BookmarkError::Signing(_))
        ));
    }
}
