use std::io::Read;
use std::time::Instant;

use nftdonate_types::{RecommendationResult, TaskRequest, retain_catalog_items, validate_model_response};
use nftdonate_util::parse_json_strict;
use tracing::{error, info, warn};

use crate::{ApiKey, ReasoningModel, SYSTEM_PROMPT, WorkerEnv, WorkerError, build_prompt, read_input, resolve_credential, write_output};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

/// Ask `model` for recommendations and normalize its answer.
///
/// Recommendations naming items outside the catalog, and repeated ids, are
/// dropped after validation.
pub async fn recommend<M: ReasoningModel + ?Sized>(model: &M, request: &TaskRequest) -> Result<RecommendationResult, WorkerError> {
    let prompt = build_prompt(request);
    let answer = model.complete(SYSTEM_PROMPT, &prompt).await?;

    let value = parse_json_strict(&answer, "model response").map_err(|error| WorkerError::model(error.to_string()))?;
    let recommendations = validate_model_response(&value)?;
    let (kept, dropped) = retain_catalog_items(recommendations, &request.catalog);
    if !dropped.is_empty() {
        warn!(dropped = ?dropped, "model recommended items outside the catalog");
    }

    Ok(RecommendationResult::success(kept))
}

/// Perform one run up to, but not including, writing the output.
pub async fn run<M, F>(env: &WorkerEnv, stdin: impl Read, connect: F) -> Result<RecommendationResult, WorkerError>
where
    M: ReasoningModel,
    F: FnOnce(ApiKey) -> Result<M, WorkerError>,
{
    let request = read_input(&env.input_file(), stdin)?;
    info!(
        requester = %request.requester_address,
        history = request.donation_history.len(),
        catalog = request.catalog.len(),
        "input loaded"
    );

    let api_key = resolve_credential()?;
    let model = connect(api_key)?;
    recommend(&model, &request).await
}

/// Run the worker and always leave an output document behind.
///
/// Returns the process exit code.
pub async fn execute<M, F>(env: &WorkerEnv, stdin: impl Read, connect: F) -> i32
where
    M: ReasoningModel,
    F: FnOnce(ApiKey) -> Result<M, WorkerError>,
{
    let start = Instant::now();
    let outcome = run(env, stdin, connect).await;

    let (document, code) = match outcome {
        Ok(result) => {
            info!(
                recommendations = result.recommendations.len(),
                duration_ms = start.elapsed().as_millis(),
                "recommendations generated"
            );
            (result, EXIT_SUCCESS)
        }
        Err(failure) => {
            error!(error = %failure, duration_ms = start.elapsed().as_millis(), "worker run failed");
            (RecommendationResult::failure(failure.to_string()), EXIT_FAILURE)
        }
    };

    deliver(document, code, |document| write_output(env, document))
}

/// Write `document`, falling back once to an error document when a
/// successful result cannot be written.
fn deliver<W>(document: RecommendationResult, code: i32, mut write: W) -> i32
where
    W: FnMut(&RecommendationResult) -> Result<(), WorkerError>,
{
    let failure = match write(&document) {
        Ok(()) => return code,
        Err(failure) => failure,
    };
    error!(error = %failure, "could not write output document");
    if document.error {
        return EXIT_FAILURE;
    }

    if let Err(fallback) = write(&RecommendationResult::failure(failure.to_string())) {
        error!(error = %fallback, "could not write error document");
    }
    EXIT_FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;
    use nftdonate_types::Recommendation;

    fn success() -> RecommendationResult {
        RecommendationResult::success(vec![Recommendation {
            item_id: "1".into(),
            reason: "Fits the history.".into(),
            confidence: 70,
        }])
    }

    #[test]
    fn unwritable_result_falls_back_to_error_document() {
        let mut written = Vec::new();
        let code = deliver(success(), EXIT_SUCCESS, |document| {
            if !document.error {
                return Err(WorkerError::output("disk full"));
            }
            written.push(document.clone());
            Ok(())
        });

        assert_eq!(code, EXIT_FAILURE);
        assert_eq!(written.len(), 1);
        assert!(written[0].recommendations.is_empty());
        assert_eq!(written[0].message.as_deref(), Some("Failed to write output: disk full"));
    }

    #[test]
    fn unwritable_error_document_is_tried_once() {
        let mut attempts = 0;
        let code = deliver(RecommendationResult::failure("boom"), EXIT_FAILURE, |_| {
            attempts += 1;
            Err(WorkerError::output("read-only"))
        });

        assert_eq!(code, EXIT_FAILURE);
        assert_eq!(attempts, 1);
    }

    #[test]
    fn written_document_keeps_exit_code() {
        assert_eq!(deliver(success(), EXIT_SUCCESS, |_| Ok(())), EXIT_SUCCESS);
    }
}
