//! Wallet manager
//!
//! Orchestrates the engine: wallet lifecycle, address discovery after
//! history sync, conflict notifications and the send flow (select,
//! build, sign, mine, broadcast). All state mutation happens on the
//! caller's single event path; only the PoW search leaves it.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;

use crate::addresses::AddressBook;
use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::keys::KeyVault;
use crate::ledger::{Balance, UtxoLedger};
use crate::node::events::AddressSubscriber;
use crate::node::types::{AddressHistory, BroadcastResponse, ConflictEvent, ConflictKind};
use crate::node::NodeClient;
use crate::pow::{self, MinedTransaction};
use crate::storage::{Metadata, Storage, TokenInfo};
use crate::tx::builder::{self, unix_now};
use crate::tx::codec;
use crate::tx::types::{TokenUid, Transaction, TxOutput};

#[derive(Clone, Debug)]
pub struct SendOutput {
    pub address: String,
    pub value: u64,
    pub timelock: Option<u32>,
}

#[derive(Debug)]
pub struct SendResult {
    pub tx: Transaction,
    pub mined: MinedTransaction,
    pub response: BroadcastResponse,
}

pub struct WalletManager {
    config: WalletConfig,
    storage: Storage,
    subscriber: Arc<dyn AddressSubscriber>,
    name: Option<String>,
    vault: Option<KeyVault>,
    book: AddressBook,
    ledger: UtxoLedger,
    tokens: Vec<TokenInfo>,
}

impl WalletManager {
    pub fn new(
        config: WalletConfig,
        storage: Storage,
        subscriber: Arc<dyn AddressSubscriber>,
    ) -> Self {
        Self {
            config,
            storage,
            subscriber,
            name: None,
            vault: None,
            book: AddressBook::default(),
            ledger: UtxoLedger::default(),
            tokens: Vec::new(),
        }
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn book(&self) -> &AddressBook {
        &self.book
    }

    pub fn ledger(&self) -> &UtxoLedger {
        &self.ledger
    }

    pub fn tokens(&self) -> &[TokenInfo] {
        &self.tokens
    }

    fn wallet_name(&self) -> Result<&str, WalletError> {
        self.name
            .as_deref()
            .ok_or_else(|| WalletError::Internal("no wallet loaded".to_string()))
    }

    fn persist_addresses(&self) -> Result<(), WalletError> {
        self.storage.save_addresses(self.wallet_name()?, &self.book)?;
        Ok(())
    }

    fn persist_ledger(&self) -> Result<(), WalletError> {
        self.storage.save_ledger(self.wallet_name()?, &self.ledger)?;
        Ok(())
    }

    /// Create and start a new wallet: derive the master key, encrypt the
    /// access data and generate the first gap-limit batch of addresses.
    pub fn create_wallet(
        &mut self,
        name: &str,
        words: &str,
        passphrase: &str,
        pin: &str,
        password: &str,
    ) -> Result<(), WalletError> {
        if self.storage.wallet_exists(name) {
            return Err(WalletError::WalletExists(name.to_string()));
        }

        let vault = KeyVault::create(words, passphrase, pin, password, &self.config.network)?;

        self.storage.create_wallet(name)?;
        self.storage.save_access(name, vault.access())?;
        self.storage.save_metadata(
            name,
            &Metadata {
                name: name.to_string(),
                created_at: Utc::now(),
                network: self.config.network.name.clone(),
            },
        )?;

        let mut book = AddressBook::default();
        book.generate_batch(
            &vault,
            pin,
            0,
            self.config.gap_limit,
            self.subscriber.as_ref(),
            &self.config,
        )?;
        book.set_shared(0)?;
        self.storage.save_addresses(name, &book)?;

        let ledger = UtxoLedger::default();
        self.storage.save_ledger(name, &ledger)?;
        self.storage.save_tokens(name, &[])?;

        log::info!("created wallet '{}' on {}", name, self.config.network.name);
        self.name = Some(name.to_string());
        self.vault = Some(vault);
        self.book = book;
        self.ledger = ledger;
        self.tokens = Vec::new();
        Ok(())
    }

    /// Load a previously created wallet from storage and re-subscribe
    /// its addresses.
    pub fn load_wallet(&mut self, name: &str) -> Result<(), WalletError> {
        if !self.storage.wallet_exists(name) {
            return Err(WalletError::WalletNotFound(name.to_string()));
        }

        let vault = KeyVault::from_access(self.storage.load_access(name)?);
        let book = self.storage.load_addresses(name)?;
        let ledger = self.storage.load_ledger(name)?;
        let tokens = self.storage.load_tokens(name)?;

        for address in book.addresses() {
            self.subscriber.subscribe(address);
        }

        self.name = Some(name.to_string());
        self.vault = Some(vault);
        self.book = book;
        self.ledger = ledger;
        self.tokens = tokens;
        Ok(())
    }

    /// Destroy all wallet state atomically (logout/reset).
    pub fn reset_wallet(&mut self) -> Result<(), WalletError> {
        if let Some(name) = self.name.take() {
            self.storage.delete_wallet(&name)?;
        }
        self.vault = None;
        self.book.reset();
        self.ledger.reset();
        self.tokens.clear();
        Ok(())
    }

    pub fn is_pin_correct(&self, pin: &str) -> Result<bool, WalletError> {
        let vault = self
            .vault
            .as_ref()
            .ok_or_else(|| WalletError::Internal("no wallet loaded".to_string()))?;
        Ok(vault.is_pin_correct(pin))
    }

    /// The shared "next to use" receive address.
    pub fn current_address(&self) -> Result<(u32, String), WalletError> {
        self.book
            .shared_address()
            .map(|(index, address)| (index, address.to_string()))
            .ok_or_else(|| WalletError::Internal("no shared address assigned".to_string()))
    }

    /// Advance to an already-generated address when one exists.
    pub fn next_shared_address(&mut self) -> Result<(u32, String), WalletError> {
        let next = self.book.next_shared_address()?;
        self.persist_addresses()?;
        Ok(next)
    }

    /// PIN-gated generation of a brand new address past the shared one.
    pub fn generate_new_address(&mut self, pin: &str) -> Result<(u32, String), WalletError> {
        let vault = self
            .vault
            .as_ref()
            .ok_or_else(|| WalletError::Internal("no wallet loaded".to_string()))?;
        if !vault.is_pin_correct(pin) {
            return Err(WalletError::InvalidPin);
        }
        let generated =
            self.book
                .generate_new_address(vault, pin, self.subscriber.as_ref(), &self.config)?;
        self.persist_addresses()?;
        Ok(generated)
    }

    /// Feed history batches into the ledger and advance the last-used
    /// address tracking.
    pub fn ingest_history(&mut self, batches: &[AddressHistory]) -> Result<(), WalletError> {
        let spenders = self.ledger.history_update(batches);
        for address in &spenders {
            self.book.mark_used(address);
        }
        self.persist_ledger()?;
        self.persist_addresses()?;
        Ok(())
    }

    /// Apply a conflict-resolution notification from the push channel.
    /// Re-applying the same event is a no-op.
    pub fn handle_conflict(&mut self, event: &ConflictEvent) -> Result<(), WalletError> {
        match event.kind {
            ConflictKind::Voided => self.ledger.on_voided(&event.element, &event.address),
            ConflictKind::Winner => self.ledger.on_winner(&event.element, &event.address),
        }
        self.persist_ledger()
    }

    /// Full history sync with address discovery: fetch history for every
    /// generated address, ingest it, and walk forward by gap-limit
    /// batches until a batch ends in an unused address, which becomes
    /// the shared one.
    pub async fn sync_with_node(
        &mut self,
        node: &NodeClient,
        pin: &str,
    ) -> Result<(u32, String), WalletError> {
        let mut batch_start = 0u32;
        loop {
            let last = self
                .book
                .last_generated_index()
                .ok_or_else(|| WalletError::Internal("no addresses generated".to_string()))?;

            let addresses: Vec<String> = (batch_start..=last)
                .filter_map(|i| self.book.address_at(i).map(str::to_string))
                .collect();
            let batches = node.get_address_history(&addresses).await?;
            self.ingest_history(&batches)?;

            let with_history: BTreeSet<String> = batches
                .iter()
                .filter(|b| !b.history.is_empty())
                .map(|b| b.address.clone())
                .collect();

            if let Some(index) = self
                .book
                .scan_for_shared(batch_start..=last, |a| with_history.contains(a))
            {
                self.book.set_shared(index)?;
                self.persist_addresses()?;
                return self.current_address();
            }

            // Every trailing address had history: keep generating
            batch_start = last + 1;
            let vault = self
                .vault
                .as_ref()
                .ok_or_else(|| WalletError::Internal("no wallet loaded".to_string()))?;
            self.book.generate_batch(
                vault,
                pin,
                batch_start,
                self.config.gap_limit,
                self.subscriber.as_ref(),
                &self.config,
            )?;
        }
    }

    /// Refresh the weight constants from the node's version endpoint.
    pub async fn update_weight_constants(&mut self, node: &NodeClient) -> Result<(), WalletError> {
        let info = node.version().await?;
        self.config.weights.min_tx_weight = info.min_tx_weight;
        self.config.weights.weight_coefficient = info.min_tx_weight_coefficient;
        self.config.weights.min_weight_k = info.min_tx_weight_k;
        log::info!(
            "weight constants updated: min {} coefficient {} k {}",
            info.min_tx_weight,
            info.min_tx_weight_coefficient,
            info.min_tx_weight_k
        );
        Ok(())
    }

    pub fn balance(&self, token: &TokenUid) -> Balance {
        self.ledger.balance(token, unix_now())
    }

    pub fn register_token(&mut self, token: TokenInfo) -> Result<(), WalletError> {
        if !self.tokens.iter().any(|t| t.uid == token.uid) {
            self.tokens.push(token);
            self.storage.save_tokens(self.wallet_name()?, &self.tokens)?;
        }
        Ok(())
    }

    pub fn unregister_token(&mut self, uid: &TokenUid) -> Result<(), WalletError> {
        self.tokens.retain(|t| &t.uid != uid);
        self.storage.save_tokens(self.wallet_name()?, &self.tokens)?;
        Ok(())
    }

    /// Select inputs, build outputs (with change to the shared address),
    /// complete and sign. The result still needs parents and mining.
    pub fn build_send_transaction(
        &mut self,
        outputs: &[SendOutput],
        token: &TokenUid,
        pin: &str,
    ) -> Result<Transaction, WalletError> {
        let vault = self
            .vault
            .as_ref()
            .ok_or_else(|| WalletError::Internal("no wallet loaded".to_string()))?;
        if !vault.is_pin_correct(pin) {
            return Err(WalletError::InvalidPin);
        }

        let amount: u64 = outputs.iter().map(|o| o.value).sum();
        let now = unix_now();
        let (inputs, total) = self.ledger.select_inputs(amount, token, now);
        if total < amount {
            return Err(WalletError::InsufficientFunds(format!(
                "requested {} {}, collected {}",
                amount, token, total
            )));
        }

        let token_data = if token.is_native() { 0 } else { 1 };
        let mut tx_outputs: Vec<TxOutput> = outputs
            .iter()
            .map(|o| TxOutput {
                address: o.address.clone(),
                value: o.value,
                timelock: o.timelock,
                token_data,
            })
            .collect();

        if total > amount {
            let (_, change_address) = self.current_address()?;
            tx_outputs.push(TxOutput {
                address: change_address,
                value: total - amount,
                timelock: None,
                token_data,
            });
            // The change consumed the shared address; rotate when a
            // pregenerated one is available
            if self.book.has_pregenerated() {
                self.book.next_shared_address()?;
            }
        }

        let tokens = if token.is_native() {
            Vec::new()
        } else {
            vec![token.clone()]
        };

        let mut tx = Transaction::new(tokens, inputs, tx_outputs);
        builder::complete_tx(&mut tx, &self.config.weights, &self.config.network)?;
        builder::sign_inputs(&mut tx, vault, &self.book, pin, &self.config.network)?;
        self.persist_addresses()?;
        Ok(tx)
    }

    /// The full send flow: build, resolve parents, mine off-thread and
    /// broadcast the final bytes.
    pub async fn send_tokens(
        &mut self,
        node: &NodeClient,
        outputs: &[SendOutput],
        token: &TokenUid,
        pin: &str,
    ) -> Result<SendResult, WalletError> {
        let mut tx = self.build_send_transaction(outputs, token, pin)?;

        let unresolved_hex = hex::encode(codec::tx_bytes(&tx, &self.config.network)?);
        tx.parents = node.fetch_parents(&unresolved_hex).await?.to_vec();

        let mined = pow::spawn(tx.clone(), self.config.network.clone(), self.config.max_nonce)
            .wait()
            .await?;
        tx.nonce = mined.nonce;
        tx.timestamp = mined.timestamp;

        let final_hex = hex::encode(codec::tx_bytes(&tx, &self.config.network)?);
        log::info!("broadcasting mined transaction {}", hex::encode(mined.hash));
        let response = node.push_tx(&final_hex).await?;

        Ok(SendResult {
            tx,
            mined,
            response,
        })
    }
}
