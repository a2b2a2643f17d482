use std::sync::Arc;

use annotator_common::{truncate_chars, MODERATION_CHAR_CAP};
use tracing::{debug, info, warn};

use crate::error::AnnotateError;
use crate::traits::SafetyClassifier;

/// Gate on user-supplied context. Runs before any generation call.
pub struct ContextModerator {
    classifier: Arc<dyn SafetyClassifier>,
}

impl ContextModerator {
    pub fn new(classifier: Arc<dyn SafetyClassifier>) -> Self {
        Self { classifier }
    }

    /// Absent or blank context passes without a classifier call. A flagged
    /// verdict and a classifier failure are both fatal.
    pub async fn check(&self, user_context: Option<&str>) -> Result<(), AnnotateError> {
        let Some(text) = user_context.map(str::trim).filter(|t| !t.is_empty()) else {
            debug!("moderation: no user context");
            return Ok(());
        };

        let sample = truncate_chars(text, MODERATION_CHAR_CAP);
        let result = self
            .classifier
            .classify(&sample)
            .await
            .map_err(|e| AnnotateError::Upstream(e.context("safety classification failed")))?;

        if result.flagged {
            warn!(categories = ?result.categories, "moderation: user context flagged");
            return Err(AnnotateError::Moderation {
                categories: result.categories,
            });
        }

        info!(chars = sample.chars().count(), "moderation: user context passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockClassifier;

    #[tokio::test]
    async fn missing_or_blank_context_skips_classifier() {
        let classifier = Arc::new(MockClassifier::flagged(&["violence"]));
        let moderator = ContextModerator::new(classifier.clone());

        moderator.check(None).await.unwrap();
        moderator.check(Some("  \n ")).await.unwrap();
        assert_eq!(classifier.calls(), 0);
    }

    #[tokio::test]
    async fn only_the_first_chunk_is_classified() {
        let classifier = Arc::new(MockClassifier::safe());
        let moderator = ContextModerator::new(classifier.clone());

        moderator.check(Some(&"ü".repeat(MODERATION_CHAR_CAP + 100))).await.unwrap();
        assert_eq!(classifier.inputs()[0].chars().count(), MODERATION_CHAR_CAP);
    }

    #[tokio::test]
    async fn flagged_context_is_fatal() {
        let moderator = ContextModerator::new(Arc::new(MockClassifier::flagged(&["harassment"])));

        let err = moderator.check(Some("nasty")).await.unwrap_err();
        match err {
            AnnotateError::Moderation { categories } => assert_eq!(categories, vec!["harassment"]),
            other => panic!("expected Moderation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn classifier_failure_is_upstream() {
        let moderator = ContextModerator::new(Arc::new(MockClassifier::failing()));
        let err = moderator.check(Some("hello")).await.unwrap_err();
        assert!(err.is_fatal_upstream());
    }
}
