use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// --- Pipeline Input ---

/// What the caller hands to the annotation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineInput {
    /// Absolute http(s) URL of the bookmark.
    pub url: String,
    /// The user's existing tag vocabulary, preferred when suggesting tags.
    #[serde(default)]
    pub existing_tags: Vec<String>,
    /// Free text the user attached to the bookmark. Untrusted; moderated before use.
    #[serde(default)]
    pub user_context: Option<String>,
}

impl PipelineInput {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            existing_tags: Vec::new(),
            user_context: None,
        }
    }

    pub fn with_existing_tags(mut self, tags: Vec<String>) -> Self {
        self.existing_tags = tags;
        self
    }

    pub fn with_user_context(mut self, context: impl Into<String>) -> Self {
        self.user_context = Some(context.into());
        self
    }
}

/// Parse `raw` as an absolute http or https URL.
pub fn parse_http_url(raw: &str) -> Option<url::Url> {
    let parsed = url::Url::parse(raw.trim()).ok()?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Some(parsed),
        _ => None,
    }
}

// --- Fetch Stage Outputs ---

/// Normalized page metadata. Every field is optional; an empty value means
/// extraction failed or the page declared nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub lang: Option<String>,
    pub og_type: Option<String>,
    pub site_name: Option<String>,
    pub keywords: Option<String>,
    pub author: Option<String>,
    pub canonical_url: Option<String>,
}

impl PageMetadata {
    pub fn is_empty(&self) -> bool {
        *self == PageMetadata::default()
    }
}

/// Where the markdown in a [`MarkdownResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkdownProvenance {
    /// Structured status API (social-status URLs only).
    StatusApi,
    /// oEmbed-style status endpoint (social-status URLs only).
    StatusOembed,
    /// Generic page-render service.
    PageRender,
    /// Every source failed; markdown is empty.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownResult {
    pub markdown: String,
    pub provenance: MarkdownProvenance,
}

impl MarkdownResult {
    pub fn new(markdown: impl Into<String>, provenance: MarkdownProvenance) -> Self {
        Self {
            markdown: markdown.into(),
            provenance,
        }
    }

    pub fn empty() -> Self {
        Self::new(String::new(), MarkdownProvenance::None)
    }
}

/// Merged fetch-stage output consumed by the generation stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBundle {
    pub url: String,
    pub existing_tags: Vec<String>,
    pub markdown: String,
    pub metadata: PageMetadata,
    pub web_context: Option<String>,
    pub user_context: Option<String>,
}

// --- Generation Stage ---

/// Atomic judge decision. `reason` is fed back verbatim to the next round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct JudgeVerdict {
    /// True only when every rule passes.
    pub passed: bool,
    /// Why the candidate failed, or a short confirmation when it passed.
    pub reason: String,
}

impl JudgeVerdict {
    pub fn pass(reason: impl Into<String>) -> Self {
        Self {
            passed: true,
            reason: reason.into(),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: reason.into(),
        }
    }
}

/// SummaryGenerator output. `web_context` and `canonical_url` pass through
/// from the content bundle unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryOutput {
    pub summary: String,
    pub web_context: Option<String>,
    pub canonical_url: Option<String>,
}

/// The final annotation for a bookmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub summary: String,
    /// Sentinel tag first, then the machine tags.
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
}
