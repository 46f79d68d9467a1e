use async_trait::async_trait;
use nftdonate_api::{ApiError, ModelClient, ModelSettings};

use crate::{ApiKey, WorkerError};

/// A reasoning model that answers a prompt with a JSON object as text.
#[async_trait]
pub trait ReasoningModel: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, WorkerError>;
}

/// Chat-completions backed model used in production runs.
#[derive(Debug, Clone)]
pub struct OpenAiModel {
    client: ModelClient,
}

impl OpenAiModel {
    /// Build a model for `api_key` with the default generation settings.
    pub fn connect(api_key: ApiKey) -> Result<Self, WorkerError> {
        let client = ModelClient::new(api_key.expose(), ModelSettings::default()).map_err(model_error)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ReasoningModel for OpenAiModel {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, WorkerError> {
        self.client.complete_json(system, prompt).await.map_err(model_error)
    }
}

fn model_error(error: ApiError) -> WorkerError {
    if error.is_unauthorized() {
        WorkerError::model(format!("authentication rejected by model API ({error})"))
    } else if error.is_rate_limited() {
        WorkerError::model(format!("model API rate limit reached ({error})"))
    } else {
        WorkerError::model(error.to_string())
    }
}
