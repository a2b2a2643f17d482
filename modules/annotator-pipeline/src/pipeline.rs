use std::sync::Arc;
use std::time::Duration;

use annotator_common::{
    parse_http_url, PipelineInput, Suggestion, DEFAULT_CANDIDATES_PER_ROUND,
    DEFAULT_GENERATION_TIMEOUT_SECS, DEFAULT_MAX_ROUNDS, DEFAULT_SENTINEL_TAG,
};
use tracing::info;
use typed_builder::TypedBuilder;

use crate::error::AnnotateError;
use crate::judge::Judge;
use crate::llm::Llm;
use crate::merge::{merge_content, merge_suggestion};
use crate::moderation::ContextModerator;
use crate::summary::SummaryGenerator;
use crate::tags::TagsGenerator;
use crate::traits::{ContentSource, Generator, SafetyClassifier};

/// Knobs shared by both generators.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub max_rounds: usize,
    pub candidates_per_round: usize,
    pub sentinel_tag: String,
}

/// Everything the pipeline talks to, injected.
#[derive(Clone, TypedBuilder)]
pub struct PipelineDeps {
    pub content: Arc<dyn ContentSource>,
    pub classifier: Arc<dyn SafetyClassifier>,
    pub writer: Arc<dyn Generator>,
    pub judge: Arc<dyn Generator>,
    #[builder(default = DEFAULT_SENTINEL_TAG.to_string(), setter(into))]
    pub sentinel_tag: String,
    #[builder(default = DEFAULT_MAX_ROUNDS)]
    pub max_rounds: usize,
    #[builder(default = DEFAULT_CANDIDATES_PER_ROUND)]
    pub candidates_per_round: usize,
    #[builder(default = Duration::from_secs(DEFAULT_GENERATION_TIMEOUT_SECS))]
    pub generation_timeout: Duration,
}

/// `PipelineInput -> [fetch x4] -> merge -> [summary || tags] -> merge -> Suggestion`.
pub struct AnnotationPipeline {
    content: Arc<dyn ContentSource>,
    moderator: ContextModerator,
    summary: SummaryGenerator,
    tags: TagsGenerator,
}

impl AnnotationPipeline {
    pub fn new(deps: PipelineDeps) -> Self {
        let settings = GenerationSettings {
            max_rounds: deps.max_rounds.max(1),
            candidates_per_round: deps.candidates_per_round.max(1),
            sentinel_tag: deps.sentinel_tag,
        };
        let writer = Llm::new(deps.writer, deps.generation_timeout);
        let judge = Judge::new(Llm::new(deps.judge, deps.generation_timeout));

        Self {
            content: deps.content,
            moderator: ContextModerator::new(deps.classifier),
            summary: SummaryGenerator::new(writer.clone(), judge.clone(), settings.clone()),
            tags: TagsGenerator::new(writer, judge, settings),
        }
    }

    pub async fn run(&self, input: PipelineInput) -> Result<Suggestion, AnnotateError> {
        if parse_http_url(&input.url).is_none() {
            return Err(AnnotateError::InvalidInput(format!(
                "not an absolute http(s) URL: {:?}",
                input.url
            )));
        }
        let url = input.url.trim();
        info!(url, existing_tags = input.existing_tags.len(), "pipeline: fetch stage");

        // Moderation shares the fetch stage; its failure drops the in-flight fetches.
        let fetches = async {
            Ok::<_, AnnotateError>(tokio::join!(
                self.content.markdown(url),
                self.content.metadata(url),
                self.content.web_context(url),
            ))
        };
        let ((), (markdown, metadata, web_context)) = tokio::try_join!(
            self.moderator.check(input.user_context.as_deref()),
            fetches,
        )?;

        info!(
            url,
            provenance = ?markdown.provenance,
            markdown_chars = markdown.markdown.chars().count(),
            has_metadata = !metadata.is_empty(),
            has_web_context = web_context.is_some(),
            "pipeline: generation stage"
        );
        let bundle = merge_content(&input, markdown, metadata, web_context);

        let (summary, tags) = tokio::try_join!(
            self.summary.generate(&bundle),
            self.tags.generate(&bundle),
        )
        .map_err(AnnotateError::Upstream)?;

        let suggestion = merge_suggestion(summary, tags);
        info!(
            url,
            summary_chars = suggestion.summary.chars().count(),
            tags = suggestion.tags.len(),
            "pipeline: done"
        );
        Ok(suggestion)
    }
}
