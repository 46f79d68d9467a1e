//! Shape validation for recommendation payloads.
//!
//! The same rules run twice: once inside the worker on the raw model answer,
//! and once in the orchestrator on the fetched result document. Neither side
//! trusts the other.

use std::collections::HashSet;

use indexmap::IndexSet;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{CatalogItem, MAX_RECOMMENDATIONS, Recommendation, RecommendationResult};

/// A payload that does not have the recommendation document shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("expected a JSON object")]
    NotAnObject,

    #[error("missing recommendations field")]
    MissingRecommendations,

    #[error("recommendations must be an array")]
    RecommendationsNotArray,

    #[error("invalid recommendation structure at index {index}: {reason}")]
    InvalidRecommendation { index: usize, reason: &'static str },

    #[error("error flag must be a boolean")]
    InvalidErrorFlag,
}

impl ShapeError {
    fn invalid(index: usize, reason: &'static str) -> Self {
        Self::InvalidRecommendation { index, reason }
    }
}

/// Validate and normalize a model answer.
///
/// Keeps the first [`MAX_RECOMMENDATIONS`] entries in the order given, coerces
/// `nftId` to a string and clamps `confidence` into `0..=100`. Entries past the
/// limit are not inspected.
pub fn validate_model_response(value: &Value) -> Result<Vec<Recommendation>, ShapeError> {
    let object = value.as_object().ok_or(ShapeError::NotAnObject)?;
    recommendations_from(object)
}

/// Validate a result document fetched from the marketplace.
///
/// Failure documents (`"error": true`) are accepted as-is with their message;
/// everything else goes through the same rules as [`validate_model_response`].
pub fn validate_result_document(value: &Value) -> Result<RecommendationResult, ShapeError> {
    let object = value.as_object().ok_or(ShapeError::NotAnObject)?;

    let is_failure = match object.get("error") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => return Err(ShapeError::InvalidErrorFlag),
    };

    if is_failure {
        let message = object
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| "Failed to generate recommendations".to_string());
        return Ok(RecommendationResult::failure(message));
    }

    recommendations_from(object).map(RecommendationResult::success)
}

/// Drop recommendations that do not name a catalog item, plus repeats.
///
/// Returns the kept recommendations (order preserved) and the ids that were
/// dropped.
pub fn retain_catalog_items(recommendations: Vec<Recommendation>, catalog: &[CatalogItem]) -> (Vec<Recommendation>, Vec<String>) {
    let known: HashSet<&str> = catalog.iter().map(|item| item.item_id.as_str()).collect();
    let mut seen = HashSet::new();
    let mut dropped = IndexSet::new();
    let mut kept = Vec::with_capacity(recommendations.len());

    for recommendation in recommendations {
        if !known.contains(recommendation.item_id.as_str()) || !seen.insert(recommendation.item_id.clone()) {
            dropped.insert(recommendation.item_id);
            continue;
        }
        kept.push(recommendation);
    }

    (kept, dropped.into_iter().collect())
}

fn recommendations_from(object: &Map<String, Value>) -> Result<Vec<Recommendation>, ShapeError> {
    let entries = object
        .get("recommendations")
        .ok_or(ShapeError::MissingRecommendations)?
        .as_array()
        .ok_or(ShapeError::RecommendationsNotArray)?;

    entries
        .iter()
        .take(MAX_RECOMMENDATIONS)
        .enumerate()
        .map(|(index, entry)| parse_recommendation(index, entry))
        .collect()
}

fn parse_recommendation(index: usize, entry: &Value) -> Result<Recommendation, ShapeError> {
    let entry = entry.as_object().ok_or(ShapeError::invalid(index, "not an object"))?;

    let item_id = match entry.get("nftId") {
        Some(Value::String(text)) if !text.is_empty() => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => return Err(ShapeError::invalid(index, "missing nftId")),
    };

    let reason = match entry.get("reason") {
        Some(Value::String(text)) if !text.trim().is_empty() => text.clone(),
        _ => return Err(ShapeError::invalid(index, "missing reason")),
    };

    let confidence = entry
        .get("confidence")
        .and_then(Value::as_f64)
        .ok_or(ShapeError::invalid(index, "confidence must be a number"))?;

    Ok(Recommendation {
        item_id,
        reason,
        confidence: clamp_confidence(confidence),
    })
}

fn clamp_confidence(raw: f64) -> u8 {
    raw.clamp(0.0, 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog(ids: &[&str]) -> Vec<CatalogItem> {
        ids.iter().map(|id| CatalogItem::new(*id, format!("item {id}"), "0")).collect()
    }

    #[test]
    fn truncates_to_three_in_model_order() {
        let value = json!({
            "recommendations": [
                {"nftId": "4", "reason": "d", "confidence": 10},
                {"nftId": "2", "reason": "b", "confidence": 90},
                {"nftId": "9", "reason": "c", "confidence": 50},
                {"nftId": "1", "reason": "a", "confidence": 99},
                {"broken": true}
            ]
        });
        let recommendations = validate_model_response(&value).unwrap();
        let ids: Vec<_> = recommendations.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(ids, ["4", "2", "9"]);
    }

    #[test]
    fn clamps_confidence_and_coerces_ids() {
        let value = json!({
            "recommendations": [
                {"nftId": 12, "reason": "high", "confidence": 250},
                {"nftId": "3", "reason": "low", "confidence": -4.5},
                {"nftId": "5", "reason": "mid", "confidence": 66.6}
            ]
        });
        let recommendations = validate_model_response(&value).unwrap();
        assert_eq!(recommendations[0].item_id, "12");
        assert_eq!(recommendations[0].confidence, 100);
        assert_eq!(recommendations[1].confidence, 0);
        assert_eq!(recommendations[2].confidence, 67);
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert_eq!(validate_model_response(&json!([])), Err(ShapeError::NotAnObject));
        assert_eq!(validate_model_response(&json!({})), Err(ShapeError::MissingRecommendations));
        assert_eq!(
            validate_model_response(&json!({"recommendations": "none"})),
            Err(ShapeError::RecommendationsNotArray)
        );
        assert!(matches!(
            validate_model_response(&json!({"recommendations": [{"nftId": "1", "reason": "x", "confidence": "90"}]})),
            Err(ShapeError::InvalidRecommendation { index: 0, .. })
        ));
        assert!(matches!(
            validate_model_response(&json!({"recommendations": [{"nftId": "1", "confidence": 9}]})),
            Err(ShapeError::InvalidRecommendation { index: 0, .. })
        ));
    }

    #[test]
    fn failure_documents_are_accepted() {
        let document = json!({"error": true, "message": "no key", "recommendations": []});
        let result = validate_result_document(&document).unwrap();
        assert!(result.is_failure());
        assert_eq!(result.message.as_deref(), Some("no key"));

        let document = json!({"error": "yes", "recommendations": []});
        assert_eq!(validate_result_document(&document), Err(ShapeError::InvalidErrorFlag));
    }

    #[test]
    fn catalog_filter_drops_unknown_and_repeated_ids() {
        let recommendations = vec![
            Recommendation { item_id: "1".into(), reason: "a".into(), confidence: 80 },
            Recommendation { item_id: "77".into(), reason: "b".into(), confidence: 70 },
            Recommendation { item_id: "1".into(), reason: "c".into(), confidence: 60 },
        ];
        let (kept, dropped) = retain_catalog_items(recommendations, &catalog(&["1", "2"]));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].reason, "a");
        assert_eq!(dropped, vec!["77".to_string(), "1".to_string()]);
    }
}
