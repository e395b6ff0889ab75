use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::models::{Metadata, TokenInfo};
use crate::addresses::AddressBook;
use crate::error::StorageError;
use crate::keys::AccessData;
use crate::ledger::UtxoLedger;

#[derive(Clone)]
pub struct Storage {
    base_path: PathBuf,
}

impl Storage {
    /// Storage under the default base directory ("./wallets")
    pub fn new() -> Self {
        Self {
            base_path: PathBuf::from("./wallets"),
        }
    }

    /// Storage with a custom base directory (for testing)
    pub fn new_with_base_dir(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_path
    }

    fn wallet_dir(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }

    pub fn create_wallet(&self, name: &str) -> Result<(), StorageError> {
        fs::create_dir_all(self.wallet_dir(name))?;
        Ok(())
    }

    pub fn wallet_exists(&self, name: &str) -> bool {
        self.wallet_dir(name).exists()
    }

    /// Remove every trace of a wallet: keys, addresses and ledger go
    /// together.
    pub fn delete_wallet(&self, name: &str) -> Result<(), StorageError> {
        let dir = self.wallet_dir(name);
        if !dir.exists() {
            return Err(StorageError::DirectoryNotFound(dir.display().to_string()));
        }
        fs::remove_dir_all(dir)?;
        Ok(())
    }

    fn save_json<T: Serialize>(&self, name: &str, file: &str, value: &T) -> Result<(), StorageError> {
        let path = self.wallet_dir(name).join(file);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(path, json)?;
        Ok(())
    }

    fn load_json<T: DeserializeOwned>(&self, name: &str, file: &str) -> Result<T, StorageError> {
        let path = self.wallet_dir(name).join(file);
        if !path.exists() {
            return Err(StorageError::FileNotFound(path.display().to_string()));
        }
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save_metadata(&self, name: &str, meta: &Metadata) -> Result<(), StorageError> {
        self.save_json(name, "metadata.json", meta)
    }

    pub fn load_metadata(&self, name: &str) -> Result<Metadata, StorageError> {
        self.load_json(name, "metadata.json")
    }

    /// Encrypted master key, PIN hash, encrypted words and password hash.
    pub fn save_access(&self, name: &str, access: &AccessData) -> Result<(), StorageError> {
        self.save_json(name, "access.json", access)
    }

    pub fn load_access(&self, name: &str) -> Result<AccessData, StorageError> {
        self.load_json(name, "access.json")
    }

    /// Address entries plus the shared/generated/used indices.
    pub fn save_addresses(&self, name: &str, book: &AddressBook) -> Result<(), StorageError> {
        self.save_json(name, "addresses.json", book)
    }

    pub fn load_addresses(&self, name: &str) -> Result<AddressBook, StorageError> {
        self.load_json(name, "addresses.json")
    }

    /// Serialized unspent/spent/voided buckets.
    pub fn save_ledger(&self, name: &str, ledger: &UtxoLedger) -> Result<(), StorageError> {
        self.save_json(name, "ledger.json", ledger)
    }

    pub fn load_ledger(&self, name: &str) -> Result<UtxoLedger, StorageError> {
        self.load_json(name, "ledger.json")
    }

    /// Registered token list.
    pub fn save_tokens(&self, name: &str, tokens: &[TokenInfo]) -> Result<(), StorageError> {
        self.save_json(name, "tokens.json", &tokens)
    }

    pub fn load_tokens(&self, name: &str) -> Result<Vec<TokenInfo>, StorageError> {
        self.load_json(name, "tokens.json")
    }

    pub fn list_wallets(&self) -> Result<Vec<String>, StorageError> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::UtxoLedger;
    use crate::node::types::{AddressHistory, HistoryItem};
    use crate::tx::types::TokenUid;
    use tempfile::TempDir;

    #[test]
    fn test_wallet_lifecycle() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new_with_base_dir(dir.path().to_path_buf());

        assert!(!storage.wallet_exists("main"));
        storage.create_wallet("main").unwrap();
        assert!(storage.wallet_exists("main"));
        assert_eq!(storage.list_wallets().unwrap(), vec!["main".to_string()]);

        storage.delete_wallet("main").unwrap();
        assert!(!storage.wallet_exists("main"));
        assert!(storage.delete_wallet("main").is_err());
    }

    #[test]
    fn test_ledger_snapshot_roundtrip() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new_with_base_dir(dir.path().to_path_buf());
        storage.create_wallet("main").unwrap();

        let mut ledger = UtxoLedger::default();
        ledger.history_update(&[AddressHistory {
            address: "13NREDS4kVKTvkDxcXS5JACRnD8DBHJb3A".to_string(),
            history: vec![HistoryItem {
                tx_id: "00".repeat(32),
                index: 1,
                is_output: true,
                token_uid: TokenUid::native(),
                value: 2000,
                timestamp: 1549023313,
                timelock: None,
                voided: false,
                from_tx_id: None,
            }],
        }]);

        storage.save_ledger("main", &ledger).unwrap();
        let loaded = storage.load_ledger("main").unwrap();
        assert_eq!(loaded, ledger);

        assert!(matches!(
            storage.load_ledger("missing"),
            Err(StorageError::FileNotFound(_))
        ));
    }
}
