pub mod error;
pub mod judge;
pub mod llm;
pub mod merge;
pub mod moderation;
pub mod pipeline;
pub mod prompts;
pub mod race;
pub mod service;
pub mod summary;
pub mod tags;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use error::AnnotateError;
pub use pipeline::{AnnotationPipeline, GenerationSettings, PipelineDeps};
pub use service::{deps_from_config, AnnotationService};
pub use traits::{ContentSource, Generator, SafetyClassifier, TagVocabulary};
