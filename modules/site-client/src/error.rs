use thiserror::Error;

pub type Result<T> = std::result::Result<T, FetchError>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Invalid client configuration: {0}")]
    Client(String),
}

impl FetchError {
    /// Whether another attempt could succeed. Configuration errors never do.
    pub fn is_transient(&self) -> bool {
        !matches!(self, FetchError::Client(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_body() || err.is_decode() {
            FetchError::Body(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}
