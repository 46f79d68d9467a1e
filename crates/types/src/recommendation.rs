use serde::{Deserialize, Serialize};

/// Upper bound on the number of recommendations in any result.
pub const MAX_RECOMMENDATIONS: usize = 3;

/// A single suggested donation target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "nftId")]
    pub item_id: String,
    pub reason: String,
    /// Always within `0..=100`.
    pub confidence: u8,
}

/// The document produced by the worker and consumed by the orchestrator.
///
/// Success documents serialize as `{"recommendations": [...]}`. Failure
/// documents carry `"error": true` and a message alongside an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub recommendations: Vec<Recommendation>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RecommendationResult {
    pub fn success(recommendations: Vec<Recommendation>) -> Self {
        Self {
            recommendations,
            error: false,
            message: None,
        }
    }

    /// Build the failure document written when a worker run fails.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            recommendations: Vec::new(),
            error: true,
            message: Some(message.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error
    }
}
