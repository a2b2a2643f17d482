use anyhow::Result;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use crate::error::AiError;

use super::types::*;

pub(crate) const OPENAI_API_URL: &str = "https://api.openai.com/v1";

pub(crate) struct OpenAiClient<'a> {
    api_key: &'a str,
    http: &'a reqwest::Client,
    base_url: &'a str,
}

impl<'a> OpenAiClient<'a> {
    pub fn new(api_key: &'a str, http: &'a reqwest::Client, base_url: &'a str) -> Self {
        Self {
            api_key,
            http,
            base_url: base_url.trim_end_matches('/'),
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| AiError::Config(format!("invalid API key header: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Send a strict JSON-schema chat request and return the raw JSON text.
    pub async fn structured_output(&self, request: &StructuredRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model = %request.model, schema = %request.response_format.json_schema.name, "OpenAI structured output request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await
            .map_err(AiError::from)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(AiError::Api { status, message }.into());
        }

        let chat_response: ChatResponse = response.json().await.map_err(AiError::from)?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AiError::EmptyResponse("no choices".to_string()))?;

        if let Some(refusal) = choice.message.refusal {
            return Err(AiError::EmptyResponse(format!("model refused: {refusal}")).into());
        }

        choice.message.content.ok_or_else(|| {
            AiError::EmptyResponse(format!(
                "no content (finish_reason={})",
                choice.finish_reason.as_deref().unwrap_or("unknown")
            ))
            .into()
        })
    }

    pub async fn moderate(&self, request: &ModerationRequest) -> Result<ModerationResponse> {
        let url = format!("{}/moderations", self.base_url);

        debug!(model = %request.model, chars = request.input.chars().count(), "OpenAI moderation request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await
            .map_err(AiError::from)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(AiError::Api { status, message }.into());
        }

        Ok(response.json().await.map_err(AiError::from)?)
    }
}
