use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A request for donation recommendations.
///
/// This is both the argument string submitted to the marketplace and the
/// input document read by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    /// Wallet address of the user asking for recommendations.
    #[serde(rename = "userAddress", default)]
    pub requester_address: String,

    /// Donations the user already made, oldest first.
    #[serde(default)]
    pub donation_history: Vec<DonationEntry>,

    /// Every NFT currently open for donations.
    #[serde(rename = "allNFTs", default)]
    pub catalog: Vec<CatalogItem>,
}

/// One past donation made by the requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationEntry {
    #[serde(rename = "nftId", deserialize_with = "deserialize_text")]
    pub item_id: String,
    #[serde(rename = "nftName")]
    pub item_name: String,
    /// Donated amount in ETH, kept as decimal text.
    #[serde(deserialize_with = "deserialize_text")]
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// An NFT that can receive donations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    #[serde(rename = "tokenId", deserialize_with = "deserialize_text")]
    pub item_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Total ETH received so far, kept as decimal text.
    #[serde(rename = "totalDonations", deserialize_with = "deserialize_text")]
    pub total_received: String,
}

/// Reasons a [`TaskRequest`] cannot be submitted or processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("userAddress is required in input")]
    MissingRequester,

    #[error("allNFTs array is required and must not be empty")]
    EmptyCatalog,
}

impl TaskRequest {
    pub fn new(requester_address: impl Into<String>, donation_history: Vec<DonationEntry>, catalog: Vec<CatalogItem>) -> Self {
        Self {
            requester_address: requester_address.into(),
            donation_history,
            catalog,
        }
    }

    /// Check the invariants every consumer relies on.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.requester_address.trim().is_empty() {
            return Err(RequestError::MissingRequester);
        }
        if self.catalog.is_empty() {
            return Err(RequestError::EmptyCatalog);
        }
        Ok(())
    }

    /// Returns `true` when the requester has never donated.
    pub fn is_new_user(&self) -> bool {
        self.donation_history.is_empty()
    }

    /// Serialize into the argument string carried by the compute order.
    pub fn to_args(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl CatalogItem {
    pub fn new(item_id: impl Into<String>, name: impl Into<String>, total_received: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            name: name.into(),
            category: None,
            description: None,
            total_received: total_received.into(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Accept either a JSON string or a JSON number and keep it as text.
///
/// Front ends emit token ids and ETH amounts in both forms.
fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!("expected string or number, got {other}"))),
    }
}
