use nftdonate_types::{RecommendationResult, TaskRequest, retain_catalog_items};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::fetcher;
use crate::marketplace::{Marketplace, TaskHandle, WalletSession};
use crate::poller::{PollOutcome, Poller};
use crate::submitter::Submitter;
use crate::{EngineConfig, OrchestrationError};

/// One-call recommendation flow: submit, wait for completion, fetch.
///
/// Each call places at most one order. Nothing is retried here; a new call is
/// a new submission.
pub struct Orchestrator<M> {
    marketplace: M,
    config: EngineConfig,
}

impl<M: Marketplace> Orchestrator<M> {
    pub fn new(marketplace: M, config: EngineConfig) -> Self {
        Self { marketplace, config }
    }

    pub fn marketplace(&self) -> &M {
        &self.marketplace
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn submitter(&self) -> Submitter<'_, M> {
        Submitter::new(&self.marketplace, &self.config)
    }

    pub fn poller(&self) -> Poller<'_, M> {
        Poller::new(&self.marketplace, self.config.poll_interval())
    }

    /// Get recommendations for `request` on behalf of `session`.
    ///
    /// Returns `Ok(None)` when `cancel` fires before the task completes. A
    /// failure document written by the worker becomes
    /// [`OrchestrationError::TaskFailed`].
    pub async fn get_recommendations(
        &self,
        session: Option<&WalletSession>,
        request: &TaskRequest,
        cancel: &CancellationToken,
    ) -> Result<Option<RecommendationResult>, OrchestrationError> {
        let session = self.check_session(session)?;
        let handle = self.submitter().submit(session, request).await?;

        match self.poller().await_completion(&handle, self.config.deadline(), cancel).await? {
            PollOutcome::Cancelled => return Ok(None),
            PollOutcome::Completed { .. } => {}
        }

        let result = fetcher::fetch(&self.marketplace, &handle.task_id).await?;
        self.accept(&handle, request, result).map(Some)
    }

    /// Require a signed-in wallet on the configured network.
    pub fn check_session<'s>(&self, session: Option<&'s WalletSession>) -> Result<&'s WalletSession, OrchestrationError> {
        let session = session.ok_or_else(|| OrchestrationError::wallet_session("connect your wallet first"))?;
        if session.token.trim().is_empty() {
            return Err(OrchestrationError::wallet_session("wallet session is not signed; connect your wallet first"));
        }
        let network = self.config.network;
        if session.chain_id != network.chain_id() {
            return Err(OrchestrationError::wallet_session(format!(
                "wallet is on chain {}; switch to {network} (chain {})",
                session.chain_id,
                network.chain_id()
            )));
        }
        Ok(session)
    }

    fn accept(
        &self,
        handle: &TaskHandle,
        request: &TaskRequest,
        result: RecommendationResult,
    ) -> Result<RecommendationResult, OrchestrationError> {
        if result.is_failure() {
            let message = result.message.unwrap_or_else(|| "Failed to generate recommendations".to_string());
            return Err(OrchestrationError::task_failed(handle.task_id.as_str(), message));
        }

        let (kept, dropped) = retain_catalog_items(result.recommendations, &request.catalog);
        if !dropped.is_empty() {
            warn!(task_id = %handle.task_id, dropped = ?dropped, "result named items outside the catalog");
        }
        info!(task_id = %handle.task_id, recommendations = kept.len(), "recommendations received");
        Ok(RecommendationResult::success(kept))
    }
}
