use thiserror::Error;

/// Errors surfaced by the HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("could not build the HTTP client: {0}")]
    Client(String),

    #[error("network error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn invalid_base_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidBaseUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// HTTP status code of the failed response, if there was one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status_code(), Some(401 | 403))
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status_code() == Some(429)
    }
}
