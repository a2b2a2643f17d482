use thiserror::Error;

pub type Result<T> = std::result::Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Render failed: {0}")]
    Unsuccessful(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for RenderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RenderError::Parse(err.to_string())
        } else {
            RenderError::Network(err.to_string())
        }
    }
}
