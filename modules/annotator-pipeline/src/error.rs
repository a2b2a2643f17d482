use bookmark_client::BookmarkError;
use thiserror::Error;

/// The only failure shape callers of the pipeline ever see. Degraded content
/// and judge rejections are absorbed internally and never surface here.
#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// User context failed the safety classifier. Nothing after moderation ran.
    #[error("User context rejected by moderation ({})", .categories.join(", "))]
    Moderation { categories: Vec<String> },

    /// Classifier, generation or judge service failed past its retry bound.
    #[error("Upstream failure: {0:#}")]
    Upstream(anyhow::Error),

    #[error("Existing tag retrieval failed: {0}")]
    TagRetrieval(#[from] BookmarkError),
}

impl AnnotateError {
    pub fn is_moderation(&self) -> bool {
        matches!(self, AnnotateError::Moderation { .. })
    }

    /// Upstream-service failures, including tag retrieval.
    pub fn is_fatal_upstream(&self) -> bool {
        matches!(
            self,
            AnnotateError::Upstream(_) | AnnotateError::TagRetrieval(_)
        )
    }
}
