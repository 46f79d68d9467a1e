//! Shared data model for the donation recommendation pipeline.
//!
//! The types in this crate are the contract between the three parties that
//! touch a recommendation task:
//!
//! - the requester, which builds a [`TaskRequest`] and hands it to the marketplace
//! - the worker, which reads the same document as its input and writes a
//!   [`RecommendationResult`] document
//! - the orchestrator, which fetches that document back and re-validates it
//!
//! Serialization follows the worker's on-disk document format exactly, so a
//! `TaskRequest` serialized with `serde_json` is a valid worker input.

mod recommendation;
mod request;
pub mod validate;

pub use recommendation::{MAX_RECOMMENDATIONS, Recommendation, RecommendationResult};
pub use request::{CatalogItem, DonationEntry, RequestError, TaskRequest};
pub use validate::{ShapeError, retain_catalog_items, validate_model_response, validate_result_document};
