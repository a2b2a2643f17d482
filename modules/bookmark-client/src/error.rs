use thiserror::Error;

pub type Result<T> = std::result::Result<T, BookmarkError>;

#[derive(Debug, Error)]
pub enum BookmarkError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Refusing redirect (status {status}) to {}", .location.as_deref().unwrap_or("<no location>"))]
    Redirect {
        status: u16,
        location: Option<String>,
    },

    #[error("Unauthorized: {problem}")]
    Unauthorized { problem: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Still unauthorized after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for BookmarkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BookmarkError::Parse(err.to_string())
        } else {
            BookmarkError::Network(err.to_string())
        }
    }
}
