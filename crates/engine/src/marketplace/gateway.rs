use std::collections::HashMap;

use async_trait::async_trait;
use nftdonate_api::GatewayClient;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{AppOrder, ComputeOrderSpec, DealId, Marketplace, TaskId, TaskState, TaskStatusReport, WalletSession};
use crate::{EngineConfig, MarketplaceError};

/// Marketplace reached through its HTTP gateway.
#[derive(Debug, Clone)]
pub struct GatewayMarketplace {
    client: GatewayClient,
}

#[derive(Debug, Deserialize)]
struct MatchReply {
    dealid: String,
}

#[derive(Debug, Deserialize)]
struct DealReply {
    #[serde(default)]
    tasks: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct StatusReply {
    status: String,
    #[serde(rename = "statusMessage", default)]
    status_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrderbookReply {
    #[serde(default)]
    orders: Vec<OrderbookEntry>,
}

#[derive(Debug, Deserialize)]
struct OrderbookEntry {
    order: PublishedAppOrder,
}

#[derive(Debug, Deserialize)]
struct PublishedAppOrder {
    appprice: Value,
}

impl GatewayMarketplace {
    pub fn new(client: GatewayClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, MarketplaceError> {
        Ok(Self::new(GatewayClient::new(&config.gateway_url)?))
    }
}

#[async_trait]
impl Marketplace for GatewayMarketplace {
    async fn match_orders(&self, session: &WalletSession, spec: &ComputeOrderSpec) -> Result<DealId, MarketplaceError> {
        let reply: MatchReply = self.client.post_json("/orders/match", spec, Some(&session.token)).await?;
        if reply.dealid.trim().is_empty() {
            return Err(MarketplaceError::protocol("order matching returned an empty deal id"));
        }
        Ok(DealId(reply.dealid))
    }

    async fn deal_tasks(&self, deal_id: &DealId) -> Result<Vec<TaskId>, MarketplaceError> {
        let path = format!("/deals/{}", path_segment(deal_id.as_str())?);
        let reply: DealReply = self.client.get_json(&path).await?;
        ordered_tasks(reply.tasks)
    }

    async fn task_status(&self, task_id: &TaskId) -> Result<TaskStatusReport, MarketplaceError> {
        let path = format!("/tasks/{}", path_segment(task_id.as_str())?);
        let reply: StatusReply = self.client.get_json(&path).await?;
        let state = TaskState::from_remote(&reply.status)
            .ok_or_else(|| MarketplaceError::protocol(format!("unknown task status '{}'", reply.status)))?;
        debug!(task_id = %task_id, status = %reply.status, %state, "task status received");
        Ok(TaskStatusReport {
            state,
            message: reply.status_message.filter(|message| !message.trim().is_empty()),
        })
    }

    async fn fetch_result(&self, task_id: &TaskId) -> Result<Vec<u8>, MarketplaceError> {
        let path = format!("/tasks/{}/result", path_segment(task_id.as_str())?);
        Ok(self.client.get_bytes(&path).await?)
    }

    async fn app_orderbook(&self, app: &str) -> Result<Vec<AppOrder>, MarketplaceError> {
        let path = format!("/orderbook/app/{}", path_segment(app)?);
        let reply: OrderbookReply = self.client.get_json(&path).await?;
        reply
            .orders
            .into_iter()
            .map(|entry| parse_price(&entry.order.appprice).map(|app_price| AppOrder { app_price }))
            .collect()
    }
}

/// Identifiers are addresses, hashes or ENS names; anything else would change the route.
fn path_segment(id: &str) -> Result<&str, MarketplaceError> {
    let valid = !id.is_empty() && id.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_'));
    if valid {
        Ok(id)
    } else {
        Err(MarketplaceError::protocol(format!("invalid identifier '{id}'")))
    }
}

fn ordered_tasks(tasks: HashMap<String, String>) -> Result<Vec<TaskId>, MarketplaceError> {
    let mut indexed = tasks
        .into_iter()
        .map(|(index, task)| {
            index
                .parse::<u32>()
                .map(|index| (index, TaskId(task)))
                .map_err(|_| MarketplaceError::protocol(format!("non-numeric task index '{index}'")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, task)| task).collect())
}

fn parse_price(value: &Value) -> Result<u64, MarketplaceError> {
    let parsed = match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| MarketplaceError::protocol(format!("invalid appprice {value}")))
}
