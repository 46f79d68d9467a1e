use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use nftdonate_engine::{
    AppOrder, ComputeOrderSpec, DealId, EngineConfig, InMemoryMarketplace, Marketplace, MarketplaceError, Network, OrchestrationError,
    Orchestrator, PollOutcome, Poller, TaskHandle, TaskId, TaskState, TaskStatusReport, WalletSession,
};
use nftdonate_types::{CatalogItem, DonationEntry, TaskRequest};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const INTERVAL: Duration = Duration::from_secs(10);
const DEADLINE: Duration = Duration::from_secs(300);

const RESULT: &str = r#"{"recommendations":[
    {"nftId":"2","reason":"Matches the education focus.","confidence":88},
    {"nftId":"404","reason":"Not in the catalog.","confidence":70},
    {"nftId":"1","reason":"Repeat donor favourite.","confidence":61}
]}"#;

fn config() -> EngineConfig {
    EngineConfig {
        app_address: Some("0x3a7b9c0d1e2f3a4b5c6d7e8f9a0b1c2d3e4f5a6b".into()),
        ..EngineConfig::default()
    }
}

fn session() -> WalletSession {
    WalletSession {
        address: "0x1111111111111111111111111111111111111111".into(),
        chain_id: Network::Bellecour.chain_id(),
        token: "signed-session".into(),
    }
}

fn request() -> TaskRequest {
    TaskRequest::new(
        "0x1111111111111111111111111111111111111111",
        vec![DonationEntry {
            item_id: "1".into(),
            item_name: "Clean Water".into(),
            amount: "0.2".into(),
            category: Some("Environment".into()),
        }],
        vec![
            CatalogItem::new("1", "Clean Water", "1.0").with_category("Environment"),
            CatalogItem::new("2", "School Books", "0.3").with_category("Education"),
        ],
    )
}

fn handle() -> TaskHandle {
    TaskHandle {
        deal_id: DealId("0xdeal".into()),
        task_id: TaskId("0xtask".into()),
    }
}

#[tokio::test(start_paused = true)]
async fn completed_on_first_query_returns_without_sleeping() {
    let marketplace = InMemoryMarketplace::new();
    let started = Instant::now();

    let outcome = Poller::new(&marketplace, INTERVAL)
        .await_completion(&handle(), DEADLINE, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        PollOutcome::Completed {
            polls: 1,
            elapsed: Duration::ZERO
        }
    );
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(marketplace.status_queries(), 1);
}

#[tokio::test(start_paused = true)]
async fn running_polls_wait_one_interval_each_and_fetch_once() {
    const RUNNING_POLLS: usize = 4;
    let marketplace = InMemoryMarketplace::new()
        .with_statuses([TaskState::Submitted])
        .with_statuses([TaskState::Running; RUNNING_POLLS - 1])
        .with_result(RESULT);
    let orchestrator = Orchestrator::new(marketplace, config());
    let started = Instant::now();

    let result = orchestrator
        .get_recommendations(Some(&session()), &request(), &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert!(started.elapsed() >= INTERVAL * RUNNING_POLLS as u32);
    assert_eq!(orchestrator.marketplace().status_queries(), RUNNING_POLLS + 1);
    assert_eq!(orchestrator.marketplace().result_fetches(), 1);

    let ids: Vec<_> = result.recommendations.iter().map(|r| r.item_id.as_str()).collect();
    assert_eq!(ids, ["2", "1"]);
}

#[tokio::test(start_paused = true)]
async fn running_forever_times_out_and_stops_querying() {
    let marketplace = InMemoryMarketplace::new().settle(TaskStatusReport::new(TaskState::Running));
    let started = Instant::now();

    let error = Poller::new(&marketplace, INTERVAL)
        .await_completion(&handle(), DEADLINE, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(error, OrchestrationError::Timeout { .. }));
    assert!(error.is_retryable_by_user());
    let elapsed = started.elapsed();
    assert!(elapsed >= DEADLINE && elapsed < DEADLINE + INTERVAL, "{elapsed:?}");
    let queries = marketplace.status_queries();
    assert_eq!(queries, 30);

    tokio::time::sleep(INTERVAL * 3).await;
    assert_eq!(marketplace.status_queries(), queries);
}

/// Marketplace whose status queries never answer.
#[derive(Default)]
struct StalledMarketplace {
    status_queries: AtomicUsize,
}

#[async_trait]
impl Marketplace for StalledMarketplace {
    async fn match_orders(&self, _session: &WalletSession, _order: &ComputeOrderSpec) -> Result<DealId, MarketplaceError> {
        Err(MarketplaceError::unavailable("stalled"))
    }

    async fn deal_tasks(&self, _deal_id: &DealId) -> Result<Vec<TaskId>, MarketplaceError> {
        Err(MarketplaceError::unavailable("stalled"))
    }

    async fn task_status(&self, _task_id: &TaskId) -> Result<TaskStatusReport, MarketplaceError> {
        self.status_queries.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    async fn fetch_result(&self, _task_id: &TaskId) -> Result<Vec<u8>, MarketplaceError> {
        Err(MarketplaceError::unavailable("stalled"))
    }

    async fn app_orderbook(&self, _app: &str) -> Result<Vec<AppOrder>, MarketplaceError> {
        Err(MarketplaceError::unavailable("stalled"))
    }
}

#[tokio::test(start_paused = true)]
async fn status_query_in_flight_at_deadline_is_abandoned() {
    let marketplace = StalledMarketplace::default();
    let started = Instant::now();

    let error = Poller::new(&marketplace, INTERVAL)
        .await_completion(&handle(), DEADLINE, &CancellationToken::new())
        .await
        .unwrap_err();

    match error {
        OrchestrationError::Timeout { task_id, elapsed } => {
            assert_eq!(task_id, "0xtask");
            assert!(elapsed >= DEADLINE && elapsed < DEADLINE + INTERVAL, "{elapsed:?}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(started.elapsed() < DEADLINE + INTERVAL);
    assert_eq!(marketplace.status_queries.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn transient_query_errors_keep_polling() {
    let marketplace = InMemoryMarketplace::new()
        .with_status_error("connection reset")
        .with_statuses([TaskState::Running])
        .with_status_error("gateway timeout");

    let outcome = Poller::new(&marketplace, INTERVAL)
        .await_completion(&handle(), DEADLINE, &CancellationToken::new())
        .await
        .unwrap();

    assert!(matches!(outcome, PollOutcome::Completed { polls: 4, .. }));
}

#[tokio::test(start_paused = true)]
async fn marketplace_failure_is_fatal_and_keeps_its_message() {
    let marketplace = InMemoryMarketplace::new()
        .with_statuses([TaskState::Running])
        .settle(TaskStatusReport::new(TaskState::Failed).with_message("enclave attestation failed"));

    let error = Poller::new(&marketplace, INTERVAL)
        .await_completion(&handle(), DEADLINE, &CancellationToken::new())
        .await
        .unwrap_err();

    match error {
        OrchestrationError::TaskFailed { task_id, message } => {
            assert_eq!(task_id, "0xtask");
            assert_eq!(message, "enclave attestation failed");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(marketplace.status_queries(), 2);
}

#[tokio::test(start_paused = true)]
async fn remote_timeout_counts_as_task_failure() {
    let marketplace = InMemoryMarketplace::new().settle(TaskStatusReport::new(TaskState::TimedOut));

    let error = Poller::new(&marketplace, INTERVAL)
        .await_completion(&handle(), DEADLINE, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(error, OrchestrationError::TaskFailed { .. }));
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_polling_without_error() {
    let marketplace = Arc::new(InMemoryMarketplace::new().settle(TaskStatusReport::new(TaskState::Running)));
    let cancel = CancellationToken::new();

    let poll = {
        let marketplace = Arc::clone(&marketplace);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            Poller::new(marketplace.as_ref(), INTERVAL)
                .await_completion(&handle(), DEADLINE, &cancel)
                .await
        })
    };

    tokio::time::sleep(Duration::from_secs(25)).await;
    cancel.cancel();
    let outcome = poll.await.unwrap().unwrap();

    assert_eq!(outcome, PollOutcome::Cancelled);
    assert_eq!(marketplace.status_queries(), 3);
}

#[tokio::test(start_paused = true)]
async fn cancelled_orchestration_returns_none_and_never_fetches() {
    let orchestrator = Orchestrator::new(InMemoryMarketplace::new().with_result(RESULT), config());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = orchestrator
        .get_recommendations(Some(&session()), &request(), &cancel)
        .await
        .unwrap();

    assert!(result.is_none());
    assert_eq!(orchestrator.marketplace().result_fetches(), 0);
}

#[tokio::test]
async fn malformed_result_is_a_format_error() {
    let orchestrator = Orchestrator::new(InMemoryMarketplace::new().with_result("{\"recommendations\": [oops"), config());

    let error = orchestrator
        .get_recommendations(Some(&session()), &request(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(error, OrchestrationError::ResultFormat(_)));
    assert!(error.is_retryable_by_user());
}

#[tokio::test]
async fn worker_error_document_becomes_task_failure() {
    let orchestrator = Orchestrator::new(
        InMemoryMarketplace::new().with_result(r#"{"error":true,"message":"Model error: quota exceeded","recommendations":[]}"#),
        config(),
    );

    let error = orchestrator
        .get_recommendations(Some(&session()), &request(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(error.to_string(), "task 0xtask0001-0 failed: Model error: quota exceeded");
}

#[tokio::test]
async fn wallet_session_is_required_before_submitting() {
    let orchestrator = Orchestrator::new(InMemoryMarketplace::new().with_result(RESULT), config());
    let cancel = CancellationToken::new();

    let error = orchestrator.get_recommendations(None, &request(), &cancel).await.unwrap_err();
    assert!(matches!(error, OrchestrationError::WalletSession(_)));

    let unsigned = WalletSession {
        token: " ".into(),
        ..session()
    };
    let error = orchestrator.get_recommendations(Some(&unsigned), &request(), &cancel).await.unwrap_err();
    assert!(matches!(error, OrchestrationError::WalletSession(_)));

    let wrong_chain = WalletSession {
        chain_id: Network::Sepolia.chain_id(),
        ..session()
    };
    let error = orchestrator.get_recommendations(Some(&wrong_chain), &request(), &cancel).await.unwrap_err();
    assert!(error.to_string().contains("bellecour"));

    assert!(orchestrator.marketplace().submitted_orders().is_empty());
}

#[tokio::test]
async fn submission_failures_are_not_retried() {
    let orchestrator = Orchestrator::new(InMemoryMarketplace::new().reject_orders("signature rejected"), config());

    let error = orchestrator
        .get_recommendations(Some(&session()), &request(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(error, OrchestrationError::Submission(_)));
    assert!(error.to_string().contains("signature rejected"));
    assert!(!error.is_retryable_by_user());
    assert_eq!(orchestrator.marketplace().status_queries(), 0);
}

#[tokio::test]
async fn submission_uses_first_task_of_deal() {
    let orchestrator = Orchestrator::new(InMemoryMarketplace::new().with_tasks_per_deal(3), config());

    let handle = orchestrator.submitter().submit(&session(), &request()).await.unwrap();

    assert_eq!(handle.deal_id, DealId("0xdeal0001".into()));
    assert_eq!(handle.task_id, TaskId("0xtask0001-0".into()));
    let orders = orchestrator.marketplace().submitted_orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].params.iexec_args, request().to_args().unwrap());
}

#[tokio::test]
async fn empty_deal_is_a_submission_error() {
    let orchestrator = Orchestrator::new(InMemoryMarketplace::new().with_tasks_per_deal(0), config());

    let error = orchestrator.submitter().submit(&session(), &request()).await.unwrap_err();

    assert!(matches!(error, OrchestrationError::Submission(_)));
}
