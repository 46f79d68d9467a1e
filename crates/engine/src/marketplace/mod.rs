//! Compute marketplace abstraction.
//!
//! The orchestrator only needs five calls from the marketplace: order
//! matching, deal lookup, task status, result download and the application
//! order book. [`GatewayMarketplace`] reaches a real marketplace over HTTP;
//! [`InMemoryMarketplace`] scripts one for tests and offline runs.

mod gateway;
mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::MarketplaceError;

pub use gateway::GatewayMarketplace;
pub use memory::InMemoryMarketplace;

/// Identifier of a matched deal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DealId(pub String);

/// Identifier of one task inside a deal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl DealId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DealId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A submitted task, as tracked for the rest of one orchestration call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub deal_id: DealId,
    pub task_id: TaskId,
}

/// Lifecycle of a marketplace task.
///
/// ```text
/// Submitted -> Running -> Completed | Failed
///     \____________\_____-> TimedOut
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Submitted,
    Running,
    Completed,
    Failed,
    TimedOut,
}

impl TaskState {
    /// Map a marketplace status string onto the lifecycle.
    pub fn from_remote(status: &str) -> Option<Self> {
        match status.trim().to_ascii_uppercase().as_str() {
            "UNSET" => Some(Self::Submitted),
            "ACTIVE" | "REVEALING" => Some(Self::Running),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            "TIMEOUT" => Some(Self::TimedOut),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }

    /// Whether `next` is a single step forward from this state.
    ///
    /// Staying in a non-terminal state is allowed; terminal states accept nothing.
    pub fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Submitted => matches!(next, Self::Submitted | Self::Running | Self::TimedOut),
            Self::Running => matches!(next, Self::Running | Self::Completed | Self::Failed | Self::TimedOut),
            Self::Completed | Self::Failed | Self::TimedOut => false,
        }
    }

    /// Whether `next` can be observed after this state when polling, which
    /// may skip intermediate states.
    pub fn can_reach(self, next: Self) -> bool {
        self.can_transition_to(next) || (self == Self::Submitted && Self::Running.can_transition_to(next))
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Submitted => "SUBMITTED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::TimedOut => "TIMED_OUT",
        };
        f.write_str(label)
    }
}

/// One answer to a status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatusReport {
    pub state: TaskState,
    pub message: Option<String>,
}

impl TaskStatusReport {
    pub fn new(state: TaskState) -> Self {
        Self { state, message: None }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Parameters forwarded to the worker alongside the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderParams {
    pub iexec_args: String,
    pub iexec_result_storage_provider: String,
    pub iexec_result_storage_proxy: String,
}

/// Request order matched against the marketplace's order book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeOrderSpec {
    pub app: String,
    pub category: u32,
    pub tag: Vec<String>,
    pub dataset: String,
    pub workerpool: String,
    pub params: OrderParams,
}

/// Signed-in wallet on whose behalf orders are placed.
#[derive(Clone, PartialEq, Eq)]
pub struct WalletSession {
    pub address: String,
    pub chain_id: u64,
    pub token: String,
}

impl fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSession")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Published sell order for an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppOrder {
    /// Price per run in nRLC.
    pub app_price: u64,
}

/// Operations the orchestrator needs from a compute marketplace.
#[async_trait]
pub trait Marketplace: Send + Sync {
    /// Match a request order with the order book and return the resulting deal.
    async fn match_orders(&self, session: &WalletSession, spec: &ComputeOrderSpec) -> Result<DealId, MarketplaceError>;

    /// Tasks contained in a deal, in index order.
    async fn deal_tasks(&self, deal_id: &DealId) -> Result<Vec<TaskId>, MarketplaceError>;

    async fn task_status(&self, task_id: &TaskId) -> Result<TaskStatusReport, MarketplaceError>;

    /// Raw result payload of a completed task.
    async fn fetch_result(&self, task_id: &TaskId) -> Result<Vec<u8>, MarketplaceError>;

    /// Sell orders for `app`, cheapest first.
    async fn app_orderbook(&self, app: &str) -> Result<Vec<AppOrder>, MarketplaceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_statuses_map_onto_lifecycle() {
        assert_eq!(TaskState::from_remote("UNSET"), Some(TaskState::Submitted));
        assert_eq!(TaskState::from_remote("active"), Some(TaskState::Running));
        assert_eq!(TaskState::from_remote("REVEALING"), Some(TaskState::Running));
        assert_eq!(TaskState::from_remote("TIMEOUT"), Some(TaskState::TimedOut));
        assert_eq!(TaskState::from_remote("PAUSED"), None);
    }

    #[test]
    fn transitions_follow_lifecycle() {
        assert!(TaskState::Submitted.can_transition_to(TaskState::Running));
        assert!(TaskState::Running.can_transition_to(TaskState::Running));
        assert!(TaskState::Running.can_transition_to(TaskState::Failed));
        assert!(TaskState::Submitted.can_transition_to(TaskState::TimedOut));
        assert!(!TaskState::Submitted.can_transition_to(TaskState::Completed));
        assert!(!TaskState::Running.can_transition_to(TaskState::Submitted));
        assert!(!TaskState::Completed.can_transition_to(TaskState::Running));

        assert!(TaskState::Submitted.can_reach(TaskState::Completed));
        assert!(!TaskState::Running.can_reach(TaskState::Submitted));
    }

    #[test]
    fn only_final_states_are_terminal() {
        let terminal: Vec<_> = [
            TaskState::Submitted,
            TaskState::Running,
            TaskState::Completed,
            TaskState::Failed,
            TaskState::TimedOut,
        ]
        .into_iter()
        .filter(|state| state.is_terminal())
        .collect();
        assert_eq!(terminal, [TaskState::Completed, TaskState::Failed, TaskState::TimedOut]);
    }

    #[test]
    fn order_spec_wire_form() {
        let spec = ComputeOrderSpec {
            app: "0xapp".into(),
            category: 0,
            tag: vec!["tee".into(), "scone".into()],
            dataset: "0x0000000000000000000000000000000000000000".into(),
            workerpool: "pool.eth".into(),
            params: OrderParams {
                iexec_args: "{}".into(),
                iexec_result_storage_provider: "ipfs".into(),
                iexec_result_storage_proxy: "https://result-proxy.iex.ec".into(),
            },
        };
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["tag"], serde_json::json!(["tee", "scone"]));
        assert_eq!(value["params"]["iexec_result_storage_provider"], "ipfs");
    }

    #[test]
    fn session_debug_hides_token() {
        let session = WalletSession {
            address: "0xabc".into(),
            chain_id: 134,
            token: "secret".into(),
        };
        assert!(!format!("{session:?}").contains("secret"));
    }
}
