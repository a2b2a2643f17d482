mod client;
pub(crate) mod schema;
pub(crate) mod types;

pub use schema::StructuredOutput;

use std::time::Duration;

use anyhow::Result;

use crate::error::AiError;
use client::{OpenAiClient, OPENAI_API_URL};

const DEFAULT_MODERATION_MODEL: &str = "omni-moderation-latest";

// =============================================================================
// OpenAi
// =============================================================================

#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    pub(crate) model: String,
    moderation_model: String,
    base_url: Option<String>,
    http: reqwest::Client,
}

/// Outcome of a moderation call. `categories` lists only the categories that fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationResult {
    pub flagged: bool,
    pub categories: Vec<String>,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            api_key: api_key.into(),
            model: model.into(),
            moderation_model: DEFAULT_MODERATION_MODEL.to_string(),
            base_url: None,
            http,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Same credentials and endpoint, different model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub(crate) fn client(&self) -> OpenAiClient<'_> {
        OpenAiClient::new(
            &self.api_key,
            &self.http,
            self.base_url.as_deref().unwrap_or(OPENAI_API_URL),
        )
    }

    /// Generate structured output against a raw JSON schema. Returns the model's
    /// JSON text; validation against the caller's type is left to the caller.
    pub async fn structured_output(
        &self,
        system: &str,
        user: &str,
        schema_name: &str,
        schema: serde_json::Value,
    ) -> Result<String> {
        let request = types::StructuredRequest {
            model: self.model.clone(),
            messages: vec![
                types::WireMessage::system(system),
                types::WireMessage::user(user),
            ],
            temperature: types::supports_temperature(&self.model).then_some(0.7),
            response_format: types::ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: types::JsonSchemaFormat {
                    name: schema_name.to_string(),
                    strict: true,
                    schema,
                },
            },
        };

        self.client().structured_output(&request).await
    }

    /// Classify `input` with the moderation endpoint.
    pub async fn moderate(&self, input: &str) -> Result<ModerationResult> {
        let request = types::ModerationRequest {
            model: self.moderation_model.clone(),
            input: input.to_string(),
        };

        let response = self.client().moderate(&request).await?;

        let result = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| AiError::EmptyResponse("moderation returned no results".into()))?;

        Ok(ModerationResult {
            flagged: result.flagged,
            categories: result
                .categories
                .into_iter()
                .filter_map(|(name, hit)| hit.then_some(name))
                .collect(),
        })
    }
}
