use std::env;
use std::fmt;

use crate::WorkerError;

/// Secret injected by the confidential environment.
pub const API_KEY_ENV: &str = "IEXEC_SCRT_OPENAI_API_KEY";

/// Model API credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

/// Read the model credential from the execution environment.
///
/// A missing or blank value is fatal for the run.
pub fn resolve_credential() -> Result<ApiKey, WorkerError> {
    match env::var(API_KEY_ENV) {
        Ok(value) if !value.trim().is_empty() => Ok(ApiKey::new(value.trim())),
        _ => Err(WorkerError::Credential(format!("{API_KEY_ENV} not found in the execution secrets"))),
    }
}
