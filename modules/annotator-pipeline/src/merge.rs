// Pure combination steps on either side of the generation stage. No I/O.

use annotator_common::{ContentBundle, MarkdownResult, PageMetadata, PipelineInput, Suggestion, SummaryOutput};

/// Fetch-stage outputs plus the caller's input, as one bundle.
pub fn merge_content(
    input: &PipelineInput,
    markdown: MarkdownResult,
    metadata: PageMetadata,
    web_context: Option<String>,
) -> ContentBundle {
    ContentBundle {
        url: input.url.trim().to_string(),
        existing_tags: input.existing_tags.clone(),
        markdown: markdown.markdown,
        metadata,
        web_context: web_context.filter(|c| !c.trim().is_empty()),
        user_context: input
            .user_context
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
    }
}

/// Generator outputs as the final suggestion. `tags` already carries the sentinel.
pub fn merge_suggestion(summary: SummaryOutput, tags: Vec<String>) -> Suggestion {
    Suggestion {
        summary: summary.summary,
        tags,
        web_context: summary.web_context,
        canonical_url: summary.canonical_url,
    }
}
