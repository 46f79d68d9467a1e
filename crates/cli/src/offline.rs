//! Simulated marketplace for `--offline` runs.

use nftdonate_engine::{AppOrder, EngineConfig, InMemoryMarketplace, TaskState, WalletSession};
use nftdonate_types::{MAX_RECOMMENDATIONS, Recommendation, RecommendationResult, TaskRequest};

const OFFLINE_APP: &str = "0x00000000000000000000000000000000000000a1";
const OFFLINE_APP_PRICE: u64 = 100_000_000;

/// A marketplace that runs the task through SUBMITTED and RUNNING, then
/// completes with recommendations drawn from the request's catalog.
pub fn marketplace(request: Option<&TaskRequest>) -> InMemoryMarketplace {
    let result = request.map(canned_result).unwrap_or_default();
    let payload = serde_json::to_vec(&result).unwrap_or_default();

    InMemoryMarketplace::new()
        .with_statuses([TaskState::Submitted, TaskState::Running])
        .with_result(payload)
        .with_app_orders(vec![AppOrder {
            app_price: OFFLINE_APP_PRICE,
        }])
}

/// Poll quickly and fall back to a placeholder app when none is configured.
pub fn config(mut config: EngineConfig) -> EngineConfig {
    config.poll_interval_secs = 1;
    config.app_address.get_or_insert_with(|| OFFLINE_APP.to_string());
    config
}

pub fn session(config: &EngineConfig) -> WalletSession {
    WalletSession {
        address: "0x0000000000000000000000000000000000000001".to_string(),
        chain_id: config.network.chain_id(),
        token: "offline".to_string(),
    }
}

fn canned_result(request: &TaskRequest) -> RecommendationResult {
    let recommendations = request
        .catalog
        .iter()
        .take(MAX_RECOMMENDATIONS)
        .enumerate()
        .map(|(rank, item)| Recommendation {
            item_id: item.item_id.clone(),
            reason: format!("Offline sample: \"{}\" is open for donations.", item.name),
            confidence: 80u8.saturating_sub(rank as u8 * 10),
        })
        .collect();
    RecommendationResult::success(recommendations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nftdonate_types::CatalogItem;

    #[test]
    fn canned_result_stays_within_catalog() {
        let catalog = (1..=5).map(|id| CatalogItem::new(id.to_string(), format!("Item {id}"), "0")).collect();
        let request = TaskRequest::new("0xabc", Vec::new(), catalog);

        let result = canned_result(&request);
        let ids: Vec<_> = result.recommendations.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
        assert_eq!(result.recommendations[2].confidence, 60);
    }

    #[test]
    fn offline_config_keeps_configured_app() {
        let configured = EngineConfig {
            app_address: Some("0xabc".into()),
            ..EngineConfig::default()
        };
        assert_eq!(config(configured).app_address.as_deref(), Some("0xabc"));
        assert_eq!(config(EngineConfig::default()).app_address.as_deref(), Some(OFFLINE_APP));
    }
}
