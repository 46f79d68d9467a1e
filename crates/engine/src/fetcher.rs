use nftdonate_types::{RecommendationResult, validate_result_document};
use nftdonate_util::parse_json_strict;
use tracing::{debug, warn};

use crate::OrchestrationError;
use crate::marketplace::{Marketplace, TaskId};

/// Download and re-validate the result document of a completed task.
///
/// A failure document written by the worker is returned as a value; the caller
/// decides what it means. Anything that is not a well-formed result document is
/// a [`OrchestrationError::ResultFormat`].
pub async fn fetch<M: Marketplace + ?Sized>(marketplace: &M, task_id: &TaskId) -> Result<RecommendationResult, OrchestrationError> {
    let payload = marketplace.fetch_result(task_id).await.map_err(|error| {
        warn!(task_id = %task_id, error = %error, "result download failed");
        OrchestrationError::result_format(format!("result of task {task_id} is unavailable: {error}"))
    })?;
    debug!(task_id = %task_id, len = payload.len(), "result downloaded");

    decode_result(&payload).inspect_err(|error| warn!(task_id = %task_id, error = %error, "result rejected"))
}

/// Parse and validate a raw result payload.
pub fn decode_result(payload: &[u8]) -> Result<RecommendationResult, OrchestrationError> {
    let text = std::str::from_utf8(payload)
        .map_err(|error| OrchestrationError::result_format(format!("result is not UTF-8 text: {error}")))?;
    let value = parse_json_strict(text, "task result").map_err(|error| OrchestrationError::result_format(error.to_string()))?;
    validate_result_document(&value).map_err(|error| OrchestrationError::result_format(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_success_and_failure_documents() {
        let result = decode_result(br#"{"recommendations":[{"nftId":"1","reason":"fits","confidence":120}]}"#).unwrap();
        assert_eq!(result.recommendations[0].confidence, 100);

        let result = decode_result(br#"{"error":true,"recommendations":[]}"#).unwrap();
        assert!(result.is_failure());
        assert_eq!(result.message.as_deref(), Some("Failed to generate recommendations"));
    }

    #[test]
    fn rejects_non_documents() {
        let payloads: [&[u8]; 4] = [b"\xff\xfe", b"{\"recommendations\": [", b"[]", b"{\"recommendations\":{}}"];
        for payload in payloads {
            let error = decode_result(payload).unwrap_err();
            assert!(matches!(error, OrchestrationError::ResultFormat(_)), "{payload:?}");
        }
    }
}
