//! Data models for wallet storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tx::types::TokenUid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub network: String,
}

/// A token the user registered in the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub uid: TokenUid,
    pub name: String,
    pub symbol: String,
}
