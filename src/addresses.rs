//! Address manager
//!
//! Keeps the gap-limited sequence of derived addresses. Index assignment
//! is strictly monotonic and the shared address handed out for receiving
//! always has zero history at assignment time.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::keys::{self, KeyVault};
use crate::node::events::AddressSubscriber;
use crate::tx::script;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddressEntry {
    pub index: u32,
    /// Child extended private key, ciphertext under the wallet PIN
    pub encrypted_key: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AddressBook {
    entries: BTreeMap<String, AddressEntry>,
    by_index: BTreeMap<u32, String>,
    last_generated_index: Option<u32>,
    last_shared_index: Option<u32>,
    last_shared_address: Option<String>,
    last_used_index: Option<u32>,
    last_used_address: Option<String>,
}

impl AddressBook {
    pub fn index_of(&self, address: &str) -> Option<u32> {
        self.entries.get(address).map(|e| e.index)
    }

    pub fn address_at(&self, index: u32) -> Option<&str> {
        self.by_index.get(&index).map(|s| s.as_str())
    }

    pub fn encrypted_key_of(&self, address: &str) -> Option<&str> {
        self.entries.get(address).map(|e| e.encrypted_key.as_str())
    }

    pub fn contains(&self, address: &str) -> bool {
        self.entries.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.by_index.values().map(|s| s.as_str())
    }

    pub fn last_generated_index(&self) -> Option<u32> {
        self.last_generated_index
    }

    pub fn last_used_index(&self) -> Option<u32> {
        self.last_used_index
    }

    pub fn last_used_address(&self) -> Option<&str> {
        self.last_used_address.as_deref()
    }

    pub fn shared_address(&self) -> Option<(u32, &str)> {
        match (self.last_shared_index, self.last_shared_address.as_deref()) {
            (Some(index), Some(address)) => Some((index, address)),
            _ => None,
        }
    }

    /// Derive and register `count` sequential child keys starting at
    /// `start`, each encrypted under the PIN and subscribed on the push
    /// channel. Returns the generated addresses in index order.
    pub fn generate_batch(
        &mut self,
        vault: &KeyVault,
        pin: &str,
        start: u32,
        count: u32,
        subscriber: &dyn AddressSubscriber,
        config: &WalletConfig,
    ) -> Result<Vec<String>, WalletError> {
        if !vault.is_pin_correct(pin) {
            return Err(WalletError::InvalidPin);
        }
        let account = vault.account_key(pin)?;

        let mut generated = Vec::with_capacity(count as usize);
        for index in start..start + count {
            let child = keys::derive_child(&account, index)?;
            let address =
                script::address_from_public_key(&keys::child_public_key(&child), &config.network);

            self.entries.insert(
                address.clone(),
                AddressEntry {
                    index,
                    encrypted_key: keys::encrypt_data(&child.to_string(), pin),
                },
            );
            self.by_index.insert(index, address.clone());
            subscriber.subscribe(&address);
            generated.push(address);

            if self.last_generated_index.map_or(true, |last| index > last) {
                self.last_generated_index = Some(index);
            }
        }
        log::debug!("generated {} addresses from index {}", count, start);
        Ok(generated)
    }

    /// Point the shared ("next to use") address at an already-generated
    /// index.
    pub fn set_shared(&mut self, index: u32) -> Result<String, WalletError> {
        let address = self
            .by_index
            .get(&index)
            .ok_or_else(|| WalletError::Internal(format!("address index {} not generated", index)))?
            .clone();
        self.last_shared_index = Some(index);
        self.last_shared_address = Some(address.clone());
        Ok(address)
    }

    /// True when an address past the shared one is already generated.
    pub fn has_pregenerated(&self) -> bool {
        match (self.last_generated_index, self.last_shared_index) {
            (Some(generated), Some(shared)) => generated > shared,
            (Some(_), None) => true,
            _ => false,
        }
    }

    /// Advance the shared address to the next already-generated index.
    /// Outside that case the caller must go through the PIN-gated
    /// `generate_new_address`.
    pub fn next_shared_address(&mut self) -> Result<(u32, String), WalletError> {
        if !self.has_pregenerated() {
            return Err(WalletError::Internal(
                "no pregenerated address left; a new one must be generated".to_string(),
            ));
        }
        let next = match self.last_shared_index {
            Some(shared) => shared + 1,
            None => 0,
        };
        let address = self.set_shared(next)?;
        Ok((next, address))
    }

    /// Under gap-limit enforcement a new address may only be generated
    /// while the gap between last used and last generated stays below the
    /// limit.
    pub fn can_generate_new_address(&self, config: &WalletConfig) -> bool {
        if !config.gap_limit_enforced {
            return true;
        }
        let last_used = self.last_used_index.map(i64::from).unwrap_or(-1);
        let last_generated = self.last_generated_index.map(i64::from).unwrap_or(-1);
        last_used + i64::from(config.gap_limit) > last_generated
    }

    /// Derive the address after the shared one, register it and advance
    /// both indices. Fails with `GapLimitExceeded` when generation is
    /// blocked.
    pub fn generate_new_address(
        &mut self,
        vault: &KeyVault,
        pin: &str,
        subscriber: &dyn AddressSubscriber,
        config: &WalletConfig,
    ) -> Result<(u32, String), WalletError> {
        if !self.can_generate_new_address(config) {
            return Err(WalletError::GapLimitExceeded(format!(
                "last used index {:?}, last generated {:?}, gap limit {}",
                self.last_used_index, self.last_generated_index, config.gap_limit
            )));
        }

        let index = self.last_shared_index.map_or(0, |shared| shared + 1);
        if self.address_at(index).is_none() {
            self.generate_batch(vault, pin, index, 1, subscriber, config)?;
        }
        let address = self.set_shared(index)?;
        Ok((index, address))
    }

    /// Record that `address` has history, keeping the last-used index
    /// monotonic.
    pub fn mark_used(&mut self, address: &str) {
        if let Some(index) = self.index_of(address) {
            if self.last_used_index.map_or(true, |last| index > last) {
                self.last_used_index = Some(index);
                self.last_used_address = Some(address.to_string());
            }
        }
    }

    /// One discovery pass over a generated batch: the candidate shared
    /// index is the first unused address after the last used one seen in
    /// the scan. Returns `None` when the batch has no trailing unused
    /// address, in which case the caller generates the next batch and
    /// scans again.
    pub fn scan_for_shared<F>(&mut self, range: RangeInclusive<u32>, has_history: F) -> Option<u32>
    where
        F: Fn(&str) -> bool,
    {
        let mut candidate = None;
        for index in range {
            let address = match self.by_index.get(&index) {
                Some(address) => address.clone(),
                None => continue,
            };
            if has_history(&address) {
                self.mark_used(&address);
                candidate = None;
            } else if candidate.is_none() {
                candidate = Some(index);
            }
        }
        candidate
    }

    /// Drop every entry and index, used on wallet reset/logout.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WalletConfig;
    use crate::node::events::NullSubscriber;

    const WORDS: &str = "purse orchard camera cloud piece joke hospital mechanic timber horror \
                         shoulder rebuild you decrease garlic derive rebuild random naive elbow \
                         depart okay parrot cliff";
    const PIN: &str = "123456";

    fn setup() -> (KeyVault, AddressBook, WalletConfig) {
        let config = WalletConfig::default();
        let vault = KeyVault::create(WORDS, "", PIN, "password", &config.network).unwrap();
        (vault, AddressBook::default(), config)
    }

    #[test]
    fn test_generate_batch_registers_gap_limit_addresses() {
        let (vault, mut book, config) = setup();
        let generated = book
            .generate_batch(&vault, PIN, 0, config.gap_limit, &NullSubscriber, &config)
            .unwrap();

        assert_eq!(generated.len() as u32, config.gap_limit);
        assert_eq!(book.len() as u32, config.gap_limit);
        assert_eq!(book.last_generated_index(), Some(config.gap_limit - 1));

        // Deterministic: regenerating the same indices yields the same addresses
        let mut other = AddressBook::default();
        let again = other
            .generate_batch(&vault, PIN, 0, config.gap_limit, &NullSubscriber, &config)
            .unwrap();
        assert_eq!(generated, again);

        book.set_shared(0).unwrap();
        assert_eq!(book.shared_address().unwrap().0, 0);
        assert_eq!(book.shared_address().unwrap().1, generated[0]);
    }

    #[test]
    fn test_generate_batch_requires_pin() {
        let (vault, mut book, config) = setup();
        assert!(matches!(
            book.generate_batch(&vault, "000000", 0, 1, &NullSubscriber, &config),
            Err(WalletError::InvalidPin)
        ));
    }

    #[test]
    fn test_next_shared_address() {
        let (vault, mut book, config) = setup();
        book.generate_batch(&vault, PIN, 0, 11, &NullSubscriber, &config)
            .unwrap();
        book.set_shared(9).unwrap();

        assert!(book.has_pregenerated());
        let (index, address) = book.next_shared_address().unwrap();
        assert_eq!(index, 10);
        assert_eq!(address, book.address_at(10).unwrap());

        // Index 10 is the last generated one, nothing pregenerated left
        assert!(!book.has_pregenerated());
        assert!(book.next_shared_address().is_err());
    }

    #[test]
    fn test_can_generate_new_address() {
        let (vault, mut book, mut config) = setup();
        config.gap_limit = 20;
        book.generate_batch(&vault, PIN, 0, 31, &NullSubscriber, &config)
            .unwrap();

        for (used_index, can_generate) in [(2, false), (10, false), (11, true), (17, true)] {
            let address = book.address_at(used_index).unwrap().to_string();
            book.mark_used(&address);
            assert_eq!(book.can_generate_new_address(&config), can_generate);
        }

        config.gap_limit_enforced = false;
        assert!(book.can_generate_new_address(&config));
    }

    #[test]
    fn test_generate_new_address_advances_indices() {
        let (vault, mut book, config) = setup();
        book.generate_batch(&vault, PIN, 0, config.gap_limit, &NullSubscriber, &config)
            .unwrap();
        book.set_shared(config.gap_limit - 1).unwrap();
        let last = book.address_at(config.gap_limit - 1).unwrap().to_string();
        book.mark_used(&last);

        let (index, address) = book
            .generate_new_address(&vault, PIN, &NullSubscriber, &config)
            .unwrap();
        assert_eq!(index, config.gap_limit);
        assert_eq!(book.len() as u32, config.gap_limit + 1);
        assert_eq!(book.shared_address().unwrap(), (index, address.as_str()));
        assert_eq!(book.last_generated_index(), Some(index));
    }

    #[test]
    fn test_generate_new_address_blocked_by_gap_limit() {
        let (vault, mut book, config) = setup();
        book.generate_batch(&vault, PIN, 0, config.gap_limit, &NullSubscriber, &config)
            .unwrap();
        book.set_shared(config.gap_limit - 1).unwrap();

        // Nothing used yet: the whole batch is the gap
        assert!(matches!(
            book.generate_new_address(&vault, PIN, &NullSubscriber, &config),
            Err(WalletError::GapLimitExceeded(_))
        ));
    }

    #[test]
    fn test_mark_used_is_monotonic() {
        let (vault, mut book, config) = setup();
        book.generate_batch(&vault, PIN, 0, 15, &NullSubscriber, &config)
            .unwrap();

        let high = book.address_at(12).unwrap().to_string();
        let low = book.address_at(4).unwrap().to_string();
        book.mark_used(&high);
        assert_eq!(book.last_used_index(), Some(12));
        book.mark_used(&low);
        assert_eq!(book.last_used_index(), Some(12));
        assert_eq!(book.last_used_address(), Some(high.as_str()));
    }

    #[test]
    fn test_scan_for_shared_resets_candidate_after_used() {
        let (vault, mut book, config) = setup();
        book.generate_batch(&vault, PIN, 0, 10, &NullSubscriber, &config)
            .unwrap();

        // History on indices 0, 1 and 5: candidate must be 6, not 2
        let used: Vec<String> = [0u32, 1, 5]
            .iter()
            .map(|i| book.address_at(*i).unwrap().to_string())
            .collect();
        let candidate = book.scan_for_shared(0..=9, |a| used.iter().any(|u| u == a));
        assert_eq!(candidate, Some(6));
        assert_eq!(book.last_used_index(), Some(5));

        // Every address used: no trailing unused address in this batch
        let candidate = book.scan_for_shared(0..=9, |_| true);
        assert_eq!(candidate, None);
    }
}
