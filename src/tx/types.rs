use std::fmt;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::NATIVE_TOKEN_UID;

/// Token identifier: hex of the 32-byte hash of the creation transaction's
/// first input, or the reserved native-token UID.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenUid(String);

impl TokenUid {
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    pub fn native() -> Self {
        Self(NATIVE_TOKEN_UID.to_string())
    }

    pub fn is_native(&self) -> bool {
        self.0 == NATIVE_TOKEN_UID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to one output of a transaction. Serialized as the
/// "txid,index" key used throughout storage and the ledger buckets.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutPoint {
    pub tx_id: String,
    pub index: u8,
}

impl OutPoint {
    pub fn new(tx_id: impl Into<String>, index: u8) -> Self {
        Self {
            tx_id: tx_id.into(),
            index,
        }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.tx_id, self.index)
    }
}

impl Serialize for OutPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OutPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let (tx_id, index) = raw
            .rsplit_once(',')
            .ok_or_else(|| D::Error::custom("expected \"txid,index\""))?;
        Ok(OutPoint {
            tx_id: tx_id.to_string(),
            index: index.parse().map_err(D::Error::custom)?,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxInput {
    pub tx_id: String,
    pub index: u8,
    /// Address owning the spent output, used to locate the signing key
    pub address: String,
    /// Signature script: push(DER signature) ++ push(public key)
    #[serde(default)]
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: String,
    pub value: u64,
    pub timelock: Option<u32>,
    /// Index into the transaction token list; 0 for the native token
    pub token_data: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u16,
    pub tokens: Vec<TokenUid>,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub weight: f64,
    pub nonce: u32,
    pub timestamp: u32,
    /// Parent hashes are resolved by the network right before mining
    pub parents: Vec<String>,
}

impl Transaction {
    pub fn new(tokens: Vec<TokenUid>, inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        Self {
            version: 0,
            tokens,
            inputs,
            outputs,
            weight: 0.0,
            nonce: 0,
            timestamp: 0,
            parents: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outpoint_key_roundtrip() {
        let point = OutPoint::new("00034a15", 3);
        let json = serde_json::to_string(&point).unwrap();
        assert_eq!(json, "\"00034a15,3\"");
        let back: OutPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, point);
    }

    #[test]
    fn test_native_token_uid() {
        assert!(TokenUid::native().is_native());
        assert!(!TokenUid::new("00abc0").is_native());
    }
}
