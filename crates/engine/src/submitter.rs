use nftdonate_types::TaskRequest;
use tracing::{debug, info};

use crate::marketplace::{ComputeOrderSpec, Marketplace, OrderParams, TaskHandle, WalletSession};
use crate::{EngineConfig, MarketplaceError, OrchestrationError};

/// Compute category of the worker application.
pub const COMPUTE_CATEGORY: u32 = 0;

/// Tag requiring a trusted-execution-environment worker.
pub const TRUSTED_EXECUTION_TAG: [&str; 2] = ["tee", "scone"];

/// Dataset address meaning "no dataset".
pub const NO_DATASET: &str = "0x0000000000000000000000000000000000000000";

/// Places one recommendation task on the marketplace.
pub struct Submitter<'a, M: ?Sized> {
    marketplace: &'a M,
    config: &'a EngineConfig,
}

impl<'a, M: Marketplace + ?Sized> Submitter<'a, M> {
    pub fn new(marketplace: &'a M, config: &'a EngineConfig) -> Self {
        Self { marketplace, config }
    }

    /// Build the request order for `request`.
    ///
    /// Fails before anything is sent when the request is incomplete or no
    /// worker application is configured.
    pub fn build_order(&self, request: &TaskRequest) -> Result<ComputeOrderSpec, OrchestrationError> {
        request.validate()?;
        let app = configured_app(self.config)?;
        let iexec_args = request
            .to_args()
            .map_err(|error| OrchestrationError::configuration(format!("could not serialize task arguments: {error}")))?;

        Ok(ComputeOrderSpec {
            app: app.to_string(),
            category: COMPUTE_CATEGORY,
            tag: TRUSTED_EXECUTION_TAG.iter().map(|tag| tag.to_string()).collect(),
            dataset: NO_DATASET.to_string(),
            workerpool: self.config.workerpool.clone(),
            params: OrderParams {
                iexec_args,
                iexec_result_storage_provider: self.config.result_storage.provider.clone(),
                iexec_result_storage_proxy: self.config.result_storage.proxy.clone(),
            },
        })
    }

    /// Match an order for `request` and resolve the deal to its first task.
    pub async fn submit(&self, session: &WalletSession, request: &TaskRequest) -> Result<TaskHandle, OrchestrationError> {
        let order = self.build_order(request)?;
        debug!(app = %order.app, workerpool = %order.workerpool, args_len = order.params.iexec_args.len(), "matching orders");

        let deal_id = self
            .marketplace
            .match_orders(session, &order)
            .await
            .map_err(OrchestrationError::Submission)?;
        let task_id = self
            .marketplace
            .deal_tasks(&deal_id)
            .await
            .map_err(OrchestrationError::Submission)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                OrchestrationError::Submission(MarketplaceError::EmptyDeal {
                    deal_id: deal_id.to_string(),
                })
            })?;

        info!(deal_id = %deal_id, task_id = %task_id, requester = %request.requester_address, "task submitted");
        Ok(TaskHandle { deal_id, task_id })
    }
}

/// The configured application, if it names a real deployment.
pub fn configured_app(config: &EngineConfig) -> Result<&str, OrchestrationError> {
    let app = config
        .app_address
        .as_deref()
        .map(str::trim)
        .filter(|app| !app.is_empty())
        .ok_or_else(|| OrchestrationError::configuration("worker application address is not configured"))?;
    if is_zero_address(app) {
        return Err(OrchestrationError::configuration("worker application address is the zero address"));
    }
    Ok(app)
}

fn is_zero_address(address: &str) -> bool {
    let digits = address.strip_prefix("0x").or_else(|| address.strip_prefix("0X")).unwrap_or(address);
    !digits.is_empty() && digits.chars().all(|ch| ch == '0')
}
