//! # NFT Donate Engine
//!
//! Orchestrates recommendation tasks on a confidential compute marketplace.
//! A call to [`Orchestrator::get_recommendations`] walks one task through its
//! whole life:
//!
//! 1. [`Submitter`] turns the [`TaskRequest`](nftdonate_types::TaskRequest)
//!    into a request order, matches it and resolves the deal to its task.
//! 2. [`Poller`] follows the task status until it completes, fails, runs past
//!    the deadline, or the caller cancels.
//! 3. [`fetcher::fetch`] downloads the worker's result document and validates
//!    it again before it reaches the caller.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use nftdonate_engine::{EngineConfig, GatewayMarketplace, Orchestrator, WalletSession};
//! use nftdonate_types::{CatalogItem, TaskRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::load()?;
//! let marketplace = GatewayMarketplace::from_config(&config)?;
//! let orchestrator = Orchestrator::new(marketplace, config);
//!
//! let session = WalletSession {
//!     address: "0x1111111111111111111111111111111111111111".into(),
//!     chain_id: 134,
//!     token: "signed-session".into(),
//! };
//! let request = TaskRequest::new(&session.address, Vec::new(), vec![CatalogItem::new("1", "Clean Water", "0.5")]);
//!
//! if let Some(result) = orchestrator
//!     .get_recommendations(Some(&session), &request, &CancellationToken::new())
//!     .await?
//! {
//!     for recommendation in result.recommendations {
//!         println!("{} ({}%): {}", recommendation.item_id, recommendation.confidence, recommendation.reason);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **`config`**: layered [`EngineConfig`] (defaults, JSON file, environment)
//! - **`marketplace`**: the [`Marketplace`] trait with HTTP and in-memory implementations
//! - **`cost`**: per-run price estimate from the app order book

pub mod config;
pub mod cost;
mod error;
mod facade;
pub mod fetcher;
pub mod marketplace;
pub mod poller;
pub mod submitter;

pub use config::{EngineConfig, Network, ResultStorage};
pub use cost::{UNKNOWN_COST, estimate_task_cost};
pub use error::{ConfigError, MarketplaceError, OrchestrationError};
pub use facade::Orchestrator;
pub use marketplace::{
    AppOrder, ComputeOrderSpec, DealId, GatewayMarketplace, InMemoryMarketplace, Marketplace, TaskHandle, TaskId, TaskState,
    TaskStatusReport, WalletSession,
};
pub use poller::{PollOutcome, Poller};
pub use submitter::Submitter;
