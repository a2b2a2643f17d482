use std::sync::Arc;
use std::time::Duration;

use ai_client::{strip_code_blocks, StructuredOutput};
use anyhow::{anyhow, Context, Result};
use tracing::warn;

use crate::traits::Generator;

/// Extra attempts when the model's JSON does not match the requested schema.
const SCHEMA_RETRIES: usize = 2;

/// Typed structured output on top of a [`Generator`]: every call is bounded by
/// `timeout`, and schema-validation failures are retried a fixed number of
/// times before propagating. Transport errors and timeouts propagate at once.
#[derive(Clone)]
pub struct Llm {
    generator: Arc<dyn Generator>,
    timeout: Duration,
}

impl Llm {
    pub fn new(generator: Arc<dyn Generator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    pub async fn extract<T: StructuredOutput>(&self, system: &str, prompt: &str) -> Result<T> {
        let schema_name = T::response_name();
        let schema = T::strict_schema();
        let mut last_error = None;

        for attempt in 0..=SCHEMA_RETRIES {
            let raw = tokio::time::timeout(
                self.timeout,
                self.generator
                    .complete_json(system, prompt, &schema_name, schema.clone()),
            )
            .await
            .map_err(|_| {
                anyhow!(
                    "{schema_name} generation timed out after {}s",
                    self.timeout.as_secs()
                )
            })?
            .with_context(|| format!("{schema_name} generation failed"))?;

            match serde_json::from_str::<T>(strip_code_blocks(&raw)) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(
                        schema = schema_name.as_str(),
                        attempt = attempt + 1,
                        error = %e,
                        "llm: response failed schema validation"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(anyhow!(
            "{schema_name} response failed schema validation after {} attempts: {}",
            SCHEMA_RETRIES + 1,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        ))
    }
}
