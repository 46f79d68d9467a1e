use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{AppOrder, ComputeOrderSpec, DealId, Marketplace, TaskId, TaskState, TaskStatusReport, WalletSession};
use crate::MarketplaceError;

/// Marketplace simulated in memory.
///
/// Every task shares one scripted status sequence: queued steps are replayed
/// in order, then the settled status is reported forever. Calls are counted
/// so callers can assert on how the marketplace was used.
#[derive(Debug)]
pub struct InMemoryMarketplace {
    state: Mutex<MemoryState>,
}

#[derive(Debug)]
struct MemoryState {
    script: VecDeque<Result<TaskStatusReport, String>>,
    settled: TaskStatusReport,
    result: Option<Vec<u8>>,
    app_orders: Vec<AppOrder>,
    match_failure: Option<String>,
    tasks_per_deal: usize,
    orders: Vec<ComputeOrderSpec>,
    deals: u64,
    status_queries: usize,
    result_fetches: usize,
}

impl Default for InMemoryMarketplace {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMarketplace {
    /// A marketplace whose tasks complete on the first status query.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                script: VecDeque::new(),
                settled: TaskStatusReport::new(TaskState::Completed),
                result: None,
                app_orders: Vec::new(),
                match_failure: None,
                tasks_per_deal: 1,
                orders: Vec::new(),
                deals: 0,
                status_queries: 0,
                result_fetches: 0,
            }),
        }
    }

    /// Queue status reports to replay before the settled status.
    pub fn with_statuses(mut self, states: impl IntoIterator<Item = TaskState>) -> Self {
        let state = self.state_mut();
        state.script.extend(states.into_iter().map(|s| Ok(TaskStatusReport::new(s))));
        self
    }

    /// Queue a failing status query.
    pub fn with_status_error(mut self, message: impl Into<String>) -> Self {
        self.state_mut().script.push_back(Err(message.into()));
        self
    }

    /// Status reported once the script is exhausted.
    pub fn settle(mut self, report: TaskStatusReport) -> Self {
        self.state_mut().settled = report;
        self
    }

    pub fn with_result(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.state_mut().result = Some(payload.into());
        self
    }

    pub fn with_app_orders(mut self, orders: Vec<AppOrder>) -> Self {
        self.state_mut().app_orders = orders;
        self
    }

    pub fn with_tasks_per_deal(mut self, count: usize) -> Self {
        self.state_mut().tasks_per_deal = count;
        self
    }

    /// Make every order-matching call fail with `message`.
    pub fn reject_orders(mut self, message: impl Into<String>) -> Self {
        self.state_mut().match_failure = Some(message.into());
        self
    }

    pub fn status_queries(&self) -> usize {
        self.lock().status_queries
    }

    pub fn result_fetches(&self) -> usize {
        self.lock().result_fetches
    }

    /// Orders accepted so far, in submission order.
    pub fn submitted_orders(&self) -> Vec<ComputeOrderSpec> {
        self.lock().orders.clone()
    }

    fn state_mut(&mut self) -> &mut MemoryState {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Marketplace for InMemoryMarketplace {
    async fn match_orders(&self, _session: &WalletSession, spec: &ComputeOrderSpec) -> Result<DealId, MarketplaceError> {
        let mut state = self.lock();
        if let Some(message) = &state.match_failure {
            return Err(MarketplaceError::unavailable(message.clone()));
        }
        state.orders.push(spec.clone());
        state.deals += 1;
        Ok(DealId(format!("0xdeal{:04}", state.deals)))
    }

    async fn deal_tasks(&self, deal_id: &DealId) -> Result<Vec<TaskId>, MarketplaceError> {
        let state = self.lock();
        let suffix = deal_id.as_str().trim_start_matches("0xdeal");
        Ok((0..state.tasks_per_deal).map(|index| TaskId(format!("0xtask{suffix}-{index}"))).collect())
    }

    async fn task_status(&self, _task_id: &TaskId) -> Result<TaskStatusReport, MarketplaceError> {
        let mut state = self.lock();
        state.status_queries += 1;
        match state.script.pop_front() {
            Some(step) => step.map_err(MarketplaceError::unavailable),
            None => Ok(state.settled.clone()),
        }
    }

    async fn fetch_result(&self, task_id: &TaskId) -> Result<Vec<u8>, MarketplaceError> {
        let mut state = self.lock();
        state.result_fetches += 1;
        state
            .result
            .clone()
            .ok_or_else(|| MarketplaceError::unavailable(format!("no result stored for task {task_id}")))
    }

    async fn app_orderbook(&self, _app: &str) -> Result<Vec<AppOrder>, MarketplaceError> {
        Ok(self.lock().app_orders.clone())
    }
}
