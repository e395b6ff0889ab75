//! Thin client for the node REST API
//!
//! Pure request/response plumbing: network failures surface as
//! `WalletError::Network` and are never retried here - retry and backoff
//! policy belongs to the caller.

use crate::error::WalletError;
use crate::node::types::{AddressHistory, BroadcastResponse, HistoryResponse, ParentsResponse, VersionInfo};

pub struct NodeClient {
    client: reqwest::Client,
    base_url: String,
}

impl NodeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Fetch the history of a set of addresses.
    pub async fn get_address_history(
        &self,
        addresses: &[String],
    ) -> Result<Vec<AddressHistory>, WalletError> {
        let query: Vec<(&str, &str)> = addresses
            .iter()
            .map(|a| ("addresses[]", a.as_str()))
            .collect();

        let response: HistoryResponse = self
            .client
            .get(self.url("address_history"))
            .query(&query)
            .send()
            .await
            .map_err(|e| WalletError::Network(e.to_string()))?
            .json()
            .await
            .map_err(|e| WalletError::Network(e.to_string()))?;

        if !response.success {
            return Err(WalletError::Network("address history fetch failed".to_string()));
        }
        Ok(response.history)
    }

    /// Resolve the two parent hashes for a transaction about to be mined.
    /// Takes the hex layout without parents and nonce resolved.
    pub async fn fetch_parents(&self, tx_hex: &str) -> Result<[String; 2], WalletError> {
        let response: ParentsResponse = self
            .client
            .get(self.url("tx_parents"))
            .query(&[("hex_tx", tx_hex)])
            .send()
            .await
            .map_err(|e| WalletError::Network(e.to_string()))?
            .json()
            .await
            .map_err(|e| WalletError::Network(e.to_string()))?;

        if !response.success {
            return Err(WalletError::Network("parent fetch failed".to_string()));
        }
        response
            .parents
            .try_into()
            .map_err(|parents: Vec<String>| {
                WalletError::Network(format!("expected 2 parents, got {}", parents.len()))
            })
    }

    /// Broadcast the fully mined transaction bytes.
    pub async fn push_tx(&self, tx_hex: &str) -> Result<BroadcastResponse, WalletError> {
        self.client
            .post(self.url("push_tx"))
            .json(&serde_json::json!({ "hex_tx": tx_hex }))
            .send()
            .await
            .map_err(|e| WalletError::Network(e.to_string()))?
            .json()
            .await
            .map_err(|e| WalletError::Network(e.to_string()))
    }

    /// Node version info, carrying the current weight constants.
    pub async fn version(&self) -> Result<VersionInfo, WalletError> {
        self.client
            .get(self.url("version"))
            .send()
            .await
            .map_err(|e| WalletError::Network(e.to_string()))?
            .json()
            .await
            .map_err(|e| WalletError::Network(e.to_string()))
    }
}
