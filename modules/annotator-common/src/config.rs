use std::time::Duration;

use anyhow::{Context, Result};

use crate::limits::{
    DEFAULT_CANDIDATES_PER_ROUND, DEFAULT_GENERATION_TIMEOUT_SECS, DEFAULT_MAX_ROUNDS,
    DEFAULT_SENTINEL_TAG, TAG_MAX_CHARS,
};
use crate::text::{char_len, contains_forbidden_tag_char};

const DEFAULT_GENERATION_MODEL: &str = "gpt-4o-mini";
const DEFAULT_JUDGE_MODEL: &str = "gpt-4o-mini";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // AI / LLM
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    pub generation_model: String,
    pub judge_model: String,

    // Page rendering
    pub render_base_url: Option<String>,
    pub render_token: Option<String>,

    // Web context search
    pub serper_api_key: Option<String>,

    // Bookmarking service
    pub bookmark_api_base: Option<String>,
    pub bookmark_token: Option<String>,

    // Generation knobs
    pub sentinel_tag: String,
    pub candidates_per_round: usize,
    pub max_rounds: usize,
    pub generation_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY environment variable is required")?,
            openai_base_url: optional_env("OPENAI_BASE_URL"),
            generation_model: optional_env("GENERATION_MODEL")
                .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string()),
            judge_model: optional_env("JUDGE_MODEL")
                .unwrap_or_else(|| DEFAULT_JUDGE_MODEL.to_string()),
            render_base_url: optional_env("RENDER_BASE_URL"),
            render_token: optional_env("RENDER_TOKEN"),
            serper_api_key: optional_env("SERPER_API_KEY"),
            bookmark_api_base: optional_env("BOOKMARK_API_BASE"),
            bookmark_token: optional_env("BOOKMARK_TOKEN"),
            sentinel_tag: optional_env("SENTINEL_TAG")
                .unwrap_or_else(|| DEFAULT_SENTINEL_TAG.to_string()),
            candidates_per_round: parse_env("CANDIDATES_PER_ROUND", DEFAULT_CANDIDATES_PER_ROUND)?,
            max_rounds: parse_env("MAX_ROUNDS", DEFAULT_MAX_ROUNDS)?,
            generation_timeout: Duration::from_secs(parse_env(
                "GENERATION_TIMEOUT_SECS",
                DEFAULT_GENERATION_TIMEOUT_SECS,
            )?),
        };

        config.validate()?;
        config.log_keys();
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.candidates_per_round == 0 {
            anyhow::bail!("CANDIDATES_PER_ROUND must be at least 1");
        }
        if self.max_rounds == 0 {
            anyhow::bail!("MAX_ROUNDS must be at least 1");
        }
        if self.sentinel_tag.trim().is_empty()
            || char_len(&self.sentinel_tag) > TAG_MAX_CHARS
            || contains_forbidden_tag_char(&self.sentinel_tag)
        {
            anyhow::bail!(
                "SENTINEL_TAG must be 1-{TAG_MAX_CHARS} characters without forbidden characters"
            );
        }
        Ok(())
    }

    pub fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let n = val.chars().take(5).collect::<String>();
            format!("{}...({} chars)", n, val.len())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  OPENAI_API_KEY: {}", preview(&self.openai_api_key));
        tracing::info!("  RENDER_BASE_URL: {}", self.render_base_url.as_deref().unwrap_or("<not set>"));
        tracing::info!("  RENDER_TOKEN: {}", preview_opt(&self.render_token));
        tracing::info!("  SERPER_API_KEY: {}", preview_opt(&self.serper_api_key));
        tracing::info!("  BOOKMARK_TOKEN: {}", preview_opt(&self.bookmark_token));
        tracing::info!(
            generation_model = %self.generation_model,
            judge_model = %self.judge_model,
            candidates = self.candidates_per_round,
            rounds = self.max_rounds,
            timeout_secs = self.generation_timeout.as_secs(),
            "  generation settings"
        );
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a number, got {raw:?}")),
        None => Ok(default),
    }
}
