use std::path::PathBuf;
use std::time::Duration;

use nftdonate_api::ApiError;
use nftdonate_types::RequestError;
use thiserror::Error;

/// Failure talking to the compute marketplace.
#[derive(Debug, Error)]
pub enum MarketplaceError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("deal {deal_id} contains no tasks")]
    EmptyDeal { deal_id: String },

    #[error("unexpected marketplace reply: {0}")]
    Protocol(String),

    #[error("marketplace unavailable: {0}")]
    Unavailable(String),
}

impl MarketplaceError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

/// Failure resolving [`crate::EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

/// Caller-visible failure of an orchestration call.
///
/// Every component failure is mapped into one of these, keeping the message
/// that tells them apart.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error("wallet session error: {0}")]
    WalletSession(String),

    #[error("task submission failed: {0}")]
    Submission(#[source] MarketplaceError),

    #[error("task {task_id} failed: {message}")]
    TaskFailed { task_id: String, message: String },

    #[error("task {task_id} did not complete within {}s", elapsed.as_secs())]
    Timeout { task_id: String, elapsed: Duration },

    #[error("invalid task result: {0}")]
    ResultFormat(String),
}

impl OrchestrationError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn wallet_session(message: impl Into<String>) -> Self {
        Self::WalletSession(message.into())
    }

    pub fn task_failed(task_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TaskFailed {
            task_id: task_id.into(),
            message: message.into(),
        }
    }

    pub fn result_format(message: impl Into<String>) -> Self {
        Self::ResultFormat(message.into())
    }

    /// Whether the caller should show a failure and offer a manual retry.
    ///
    /// The other variants need the caller to fix something first.
    pub fn is_retryable_by_user(&self) -> bool {
        matches!(self, Self::TaskFailed { .. } | Self::Timeout { .. } | Self::ResultFormat(_))
    }
}

impl From<ConfigError> for OrchestrationError {
    fn from(error: ConfigError) -> Self {
        Self::Configuration(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_retry_classification() {
        assert!(OrchestrationError::task_failed("0x1", "boom").is_retryable_by_user());
        assert!(
            OrchestrationError::Timeout {
                task_id: "0x1".into(),
                elapsed: Duration::from_secs(300)
            }
            .is_retryable_by_user()
        );
        assert!(OrchestrationError::result_format("bad json").is_retryable_by_user());

        assert!(!OrchestrationError::configuration("no app").is_retryable_by_user());
        assert!(!OrchestrationError::wallet_session("connect").is_retryable_by_user());
        assert!(!OrchestrationError::Submission(MarketplaceError::unavailable("down")).is_retryable_by_user());
        assert!(!OrchestrationError::InvalidRequest(RequestError::EmptyCatalog).is_retryable_by_user());
    }

    #[test]
    fn messages_keep_their_cause() {
        let error = OrchestrationError::Submission(MarketplaceError::EmptyDeal { deal_id: "0xd".into() });
        assert_eq!(error.to_string(), "task submission failed: deal 0xd contains no tasks");

        let error = OrchestrationError::Timeout {
            task_id: "0x1".into(),
            elapsed: Duration::from_secs(300),
        };
        assert_eq!(error.to_string(), "task 0x1 did not complete within 300s");
    }
}
