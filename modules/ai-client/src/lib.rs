pub mod error;
pub mod openai;
pub mod util;

pub use error::AiError;
pub use openai::{ModerationResult, OpenAi, StructuredOutput};
pub use util::strip_code_blocks;
