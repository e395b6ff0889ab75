//! Wire contracts of the network collaborators
//!
//! Shapes mirror the node REST/push payloads; the engine consumes and
//! produces these, the transport itself stays outside the core.

use serde::{Deserialize, Serialize};

use crate::tx::types::TokenUid;

/// One element of an address history, and also the payload of conflict
/// notifications. `is_output` selects between an output event (an amount
/// received at `tx_id:index`) and an input event (`tx_id` spending
/// `from_tx_id:index`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryItem {
    pub tx_id: String,
    pub index: u8,
    pub is_output: bool,
    pub token_uid: TokenUid,
    pub value: u64,
    pub timestamp: u32,
    #[serde(default)]
    pub timelock: Option<u32>,
    #[serde(default)]
    pub voided: bool,
    #[serde(default)]
    pub from_tx_id: Option<String>,
}

/// Per-address slice of a history response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddressHistory {
    pub address: String,
    pub history: Vec<HistoryItem>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    Voided,
    Winner,
}

/// Conflict-resolution notification from the push channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConflictEvent {
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    pub address: String,
    pub element: HistoryItem,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BroadcastTx {
    pub hash: String,
    #[serde(default)]
    pub tokens: Vec<TokenUid>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BroadcastResponse {
    pub success: bool,
    #[serde(default)]
    pub tx: Option<BroadcastTx>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Envelope of the address-history fetch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub history: Vec<AddressHistory>,
}

/// Response of the parent-hash fetch performed right before mining.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParentsResponse {
    pub success: bool,
    pub parents: Vec<String>,
}

/// Node version info; carries the weight constants the wallet must match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub network: String,
    pub min_tx_weight: f64,
    pub min_tx_weight_coefficient: f64,
    pub min_tx_weight_k: f64,
}
