use std::sync::Arc;

use ai_client::OpenAi;
use annotator_common::{Config, PipelineInput, Suggestion};
use annotator_fetch::Fetchers;
use bookmark_client::{BearerSigner, BookmarkClient};
use tracing::info;

use crate::error::AnnotateError;
use crate::pipeline::{AnnotationPipeline, PipelineDeps};
use crate::traits::TagVocabulary;

/// Entry point for annotating one bookmark: existing-tag retrieval, then the
/// pipeline. A retrieval failure aborts before any fetch.
pub struct AnnotationService {
    vocabulary: Option<Arc<dyn TagVocabulary>>,
    pipeline: AnnotationPipeline,
}

impl AnnotationService {
    /// Without a vocabulary the pipeline runs with no existing tags.
    pub fn new(vocabulary: Option<Arc<dyn TagVocabulary>>, pipeline: AnnotationPipeline) -> Self {
        Self {
            vocabulary,
            pipeline,
        }
    }

    /// Production wiring from config. The bookmark client is only built when
    /// both its base URL and token are configured.
    pub fn from_config(config: &Config) -> Self {
        let vocabulary = match (&config.bookmark_api_base, &config.bookmark_token) {
            (Some(base), Some(token)) => {
                let signer = Arc::new(BearerSigner::new(token.clone()));
                Some(Arc::new(BookmarkClient::new(base, signer)) as Arc<dyn TagVocabulary>)
            }
            _ => None,
        };
        Self::new(vocabulary, AnnotationPipeline::new(deps_from_config(config)))
    }

    pub async fn annotate(
        &self,
        url: &str,
        user_context: Option<String>,
    ) -> Result<Suggestion, AnnotateError> {
        let existing_tags = match &self.vocabulary {
            Some(vocabulary) => vocabulary.existing_tags().await?,
            None => Vec::new(),
        };
        info!(url, existing_tags = existing_tags.len(), "service: existing tags loaded");

        let mut input = PipelineInput::new(url).with_existing_tags(existing_tags);
        input.user_context = user_context;
        self.pipeline.run(input).await
    }
}

/// Production collaborators: OpenAI for writing, judging and moderation, and
/// the HTTP fetchers for content.
pub fn deps_from_config(config: &Config) -> PipelineDeps {
    let mut writer = OpenAi::new(config.openai_api_key.clone(), config.generation_model.clone());
    if let Some(base) = &config.openai_base_url {
        writer = writer.with_base_url(base.clone());
    }
    let judge = writer.clone().with_model(config.judge_model.clone());
    let writer = Arc::new(writer);

    PipelineDeps::builder()
        .content(Arc::new(Fetchers::from_config(config)))
        .classifier(writer.clone())
        .writer(writer)
        .judge(Arc::new(judge))
        .sentinel_tag(config.sentinel_tag.clone())
        .max_rounds(config.max_rounds)
        .candidates_per_round(config.candidates_per_round)
        .generation_timeout(config.generation_timeout)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookmark_client::BookmarkError;

    use crate::testing::{
        article_content, pipeline_with, MockClassifier, MockContent, MockGenerator, MockVocabulary,
    };

    const SUMMARY: &str = "Tokio tutorial on racing futures with FuturesUnordered and cancel-on-drop";

    #[tokio::test]
    async fn existing_tags_reach_the_tags_prompt() {
        let writer = Arc::new(MockGenerator::drafts(SUMMARY, &["rust", "tokio", "futures"]));
        let vocabulary = Arc::new(MockVocabulary::tags(&["rust", "homelab"]));
        let service = AnnotationService::new(
            Some(vocabulary.clone()),
            pipeline_with(
                Arc::new(article_content()),
                Arc::new(MockClassifier::safe()),
                writer.clone(),
                Arc::new(MockGenerator::judge_passing()),
            ),
        );

        let suggestion = service.annotate("https://blog.example.com/post", None).await.unwrap();

        assert_eq!(suggestion.tags[0], "ai-tagged");
        assert_eq!(vocabulary.calls(), 1);
        let tag_calls = writer.calls_for("TagsDraft");
        assert!(tag_calls[0].prompt.contains("User's existing tags: rust homelab"));
    }

    #[tokio::test]
    async fn retrieval_failure_aborts_before_fetching() {
        let content = Arc::new(MockContent::new());
        let writer = Arc::new(MockGenerator::drafts(SUMMARY, &["rust", "tokio", "futures"]));
        let service = AnnotationService::new(
            Some(Arc::new(MockVocabulary::failing(|| BookmarkError::Unauthorized {
                problem: "token_rejected".into(),
            }))),
            pipeline_with(
                content.clone(),
                Arc::new(MockClassifier::safe()),
                writer.clone(),
                Arc::new(MockGenerator::judge_passing()),
            ),
        );

        let err = service.annotate("https://blog.example.com/post", None).await.unwrap_err();

        assert!(matches!(err, AnnotateError::TagRetrieval(BookmarkError::Unauthorized { .. })));
        assert_eq!(content.calls(), 0);
        assert_eq!(writer.calls(), 0);
    }
}
