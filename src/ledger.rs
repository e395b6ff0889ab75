//! UTXO ledger
//!
//! Tracks the wallet's outputs across four buckets: unspent, spent,
//! voided-unspent and voided-spent. History sync feeds outputs in;
//! network conflict resolution moves them between buckets. Re-applying
//! the same voided/winner event is a no-op. Every bucket is an ordered
//! map so iteration, input selection and the persisted snapshot are
//! deterministic.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::node::types::{AddressHistory, HistoryItem};
use crate::tx::types::{OutPoint, TokenUid, TxInput};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnspentOutput {
    pub address: String,
    pub value: u64,
    pub timelock: Option<u32>,
    pub timestamp: u32,
}

/// A spend of one output. Kept in a list per outpoint because multiple
/// conflicting spends can coexist until the network resolves them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpentOutput {
    /// The spending transaction
    pub tx_id: String,
    pub address: String,
    pub value: u64,
    pub timelock: Option<u32>,
    pub timestamp: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub available: u64,
    pub locked: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UtxoLedger {
    unspent: BTreeMap<TokenUid, BTreeMap<OutPoint, UnspentOutput>>,
    spent: BTreeMap<OutPoint, Vec<SpentOutput>>,
    voided_unspent: BTreeMap<OutPoint, UnspentOutput>,
    voided_spent: BTreeMap<OutPoint, Vec<SpentOutput>>,
}

fn unspent_from(element: &HistoryItem, address: &str) -> UnspentOutput {
    UnspentOutput {
        address: address.to_string(),
        value: element.value,
        timelock: element.timelock,
        timestamp: element.timestamp,
    }
}

fn spent_from(element: &HistoryItem, address: &str) -> SpentOutput {
    SpentOutput {
        tx_id: element.tx_id.clone(),
        address: address.to_string(),
        value: element.value,
        timelock: element.timelock,
        timestamp: element.timestamp,
    }
}

impl UtxoLedger {
    /// Ingest history batches. Output events land in the unspent bucket
    /// unless something already spent them; input events move the
    /// referenced output into the spent list. Returns the spending
    /// addresses so the caller can advance last-used tracking.
    pub fn history_update(&mut self, batches: &[AddressHistory]) -> BTreeSet<String> {
        let mut spending_addresses = BTreeSet::new();

        for batch in batches {
            for element in &batch.history {
                if element.is_output {
                    let key = OutPoint::new(element.tx_id.clone(), element.index);
                    if self.spent.contains_key(&key) {
                        continue;
                    }
                    self.unspent
                        .entry(element.token_uid.clone())
                        .or_default()
                        .insert(key, unspent_from(element, &batch.address));
                } else {
                    let Some(from_tx_id) = element.from_tx_id.clone() else {
                        log::warn!("input event without from_tx_id: {}", element.tx_id);
                        continue;
                    };
                    let key = OutPoint::new(from_tx_id, element.index);
                    if let Some(bucket) = self.unspent.get_mut(&element.token_uid) {
                        bucket.remove(&key);
                    }
                    let spends = self.spent.entry(key).or_default();
                    if !spends.iter().any(|s| s.tx_id == element.tx_id) {
                        spends.push(spent_from(element, &batch.address));
                    }
                    spending_addresses.insert(batch.address.clone());
                }
            }
        }
        spending_addresses
    }

    /// Apply a "voided" conflict notification.
    pub fn on_voided(&mut self, element: &HistoryItem, address: &str) {
        if element.is_output {
            let key = OutPoint::new(element.tx_id.clone(), element.index);
            if let Some(bucket) = self.unspent.get_mut(&element.token_uid) {
                bucket.remove(&key);
            }
            self.spent.remove(&key);
            self.voided_unspent
                .entry(key)
                .or_insert_with(|| unspent_from(element, address));
        } else {
            let Some(from_tx_id) = element.from_tx_id.clone() else {
                log::warn!("voided input without from_tx_id: {}", element.tx_id);
                return;
            };
            let key = OutPoint::new(from_tx_id, element.index);

            if let Some(spends) = self.spent.get_mut(&key) {
                spends.retain(|s| s.tx_id != element.tx_id);
                if spends.is_empty() {
                    // The only spend was voided: the output is unspent again
                    self.spent.remove(&key);
                    self.unspent
                        .entry(element.token_uid.clone())
                        .or_default()
                        .insert(key.clone(), unspent_from(element, address));
                }
            }

            let voided = self.voided_spent.entry(key).or_default();
            if !voided.iter().any(|s| s.tx_id == element.tx_id) {
                voided.push(spent_from(element, address));
            }
        }
    }

    /// Apply a "winner" conflict notification, undoing a prior voiding.
    pub fn on_winner(&mut self, element: &HistoryItem, address: &str) {
        if element.is_output {
            let key = OutPoint::new(element.tx_id.clone(), element.index);
            let in_unspent = self
                .unspent
                .get(&element.token_uid)
                .map_or(false, |bucket| bucket.contains_key(&key));
            let in_spent = self.spent.get(&key).map_or(false, |spends| !spends.is_empty());

            if !in_unspent && !in_spent {
                self.unspent
                    .entry(element.token_uid.clone())
                    .or_default()
                    .insert(key.clone(), unspent_from(element, address));
            }
            self.voided_unspent.remove(&key);
        } else {
            let Some(from_tx_id) = element.from_tx_id.clone() else {
                log::warn!("winner input without from_tx_id: {}", element.tx_id);
                return;
            };
            let key = OutPoint::new(from_tx_id, element.index);

            if let Some(voided) = self.voided_spent.get_mut(&key) {
                voided.retain(|s| s.tx_id != element.tx_id);
            }

            let still_unspent = self
                .unspent
                .get_mut(&element.token_uid)
                .map_or(false, |bucket| bucket.remove(&key).is_some());
            let spends = self.spent.entry(key).or_default();
            if still_unspent {
                spends.push(spent_from(element, address));
            } else if !spends.iter().any(|s| s.tx_id == element.tx_id) {
                spends.push(spent_from(element, address));
            }
        }
    }

    /// An output is usable when its timelock is unset or in the past.
    pub fn can_use(output: &UnspentOutput, now: u32) -> bool {
        output.timelock.map_or(true, |timelock| now > timelock)
    }

    /// Greedy input selection: walk the token's unspent outputs in
    /// storage order, skip locked ones, accumulate until `amount` is
    /// covered. The collected total may fall short of `amount` when the
    /// funds are insufficient.
    pub fn select_inputs(&self, amount: u64, token: &TokenUid, now: u32) -> (Vec<TxInput>, u64) {
        let mut inputs = Vec::new();
        let mut total: u64 = 0;

        let Some(bucket) = self.unspent.get(token) else {
            return (inputs, total);
        };
        for (key, output) in bucket {
            if !Self::can_use(output, now) {
                continue;
            }
            inputs.push(TxInput {
                tx_id: key.tx_id.clone(),
                index: key.index,
                address: output.address.clone(),
                data: Vec::new(),
            });
            total += output.value;
            if total >= amount {
                break;
            }
        }
        (inputs, total)
    }

    /// Sum a token's unspent outputs into usable-now vs timelocked.
    pub fn balance(&self, token: &TokenUid, now: u32) -> Balance {
        let mut balance = Balance::default();
        if let Some(bucket) = self.unspent.get(token) {
            for output in bucket.values() {
                if Self::can_use(output, now) {
                    balance.available += output.value;
                } else {
                    balance.locked += output.value;
                }
            }
        }
        balance
    }

    /// Tokens with at least one tracked unspent output.
    pub fn tokens(&self) -> impl Iterator<Item = &TokenUid> {
        self.unspent.keys()
    }

    /// Drop every bucket, used on wallet reset/logout.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
