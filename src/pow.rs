//! Proof-of-work solver
//!
//! Mining authorizes a transaction before broadcast: find a nonce whose
//! candidate hash, read as a big-endian integer, is below the target
//! derived from the transaction weight. The search is CPU-bound and runs
//! on a blocking task, reporting back over a oneshot channel; it never
//! shares ledger state. There is no mid-flight cancellation - callers
//! drop the handle and submit a new job.

use sha2::{Digest, Sha256};
use tokio::sync::oneshot;
use tokio::task;

use crate::config::NetworkParams;
use crate::error::WalletError;
use crate::tx::builder::unix_now;
use crate::tx::codec;
use crate::tx::types::Transaction;

/// Seconds a mined timestamp may age before it is refreshed and the
/// nonce search restarts.
const TIMESTAMP_REFRESH_SECS: u32 = 2;

#[derive(Clone, Debug)]
pub struct MinedTransaction {
    pub hash: [u8; 32],
    pub nonce: u32,
    pub timestamp: u32,
}

/// PoW difficulty target for a weight.
pub fn target(weight: f64) -> f64 {
    (256.0 - weight).exp2() - 1.0
}

/// Big-endian integer value of a digest, in the same number domain the
/// target is computed in.
fn digest_value(digest: &[u8; 32]) -> f64 {
    digest.iter().fold(0.0, |acc, byte| acc * 256.0 + f64::from(*byte))
}

/// Hasher pre-seeded with the header (funds hash followed by graph hash).
fn header_hasher(funds_hash: &[u8; 32], graph_hash: &[u8; 32]) -> Sha256 {
    let mut hasher = Sha256::new();
    hasher.update(funds_hash);
    hasher.update(graph_hash);
    hasher
}

/// Candidate for one nonce: double SHA256 over header plus nonce.
fn candidate(part1: &Sha256, nonce: u32) -> [u8; 32] {
    let mut hasher = part1.clone();
    hasher.update(nonce.to_be_bytes());
    let first = hasher.finalize();
    Sha256::digest(first).into()
}

/// Search the nonce space synchronously. The transaction's timestamp is
/// refreshed (and the search restarted) whenever it ages past two
/// seconds, so the mined proof never goes stale.
pub fn solve(
    tx: &mut Transaction,
    params: &NetworkParams,
    max_nonce: u32,
) -> Result<MinedTransaction, WalletError> {
    let funds_hash = codec::funds_hash(tx, params)?;
    let mut part1 = header_hasher(&funds_hash, &codec::graph_hash(tx)?);
    let target = target(tx.weight);
    let mut last_time = tx.timestamp;
    let mut nonce: u32 = 0;

    while nonce < max_nonce {
        let now = unix_now();
        if now.saturating_sub(last_time) > TIMESTAMP_REFRESH_SECS {
            log::debug!("refreshing timestamp at nonce {}", nonce);
            tx.timestamp = now;
            part1 = header_hasher(&funds_hash, &codec::graph_hash(tx)?);
            last_time = now;
            nonce = 0;
        }

        let digest = candidate(&part1, nonce);
        if digest_value(&digest) < target {
            tx.nonce = nonce;
            return Ok(MinedTransaction {
                hash: digest,
                nonce,
                timestamp: tx.timestamp,
            });
        }
        nonce += 1;
    }
    Err(WalletError::PowExhausted)
}

pub struct PowHandle {
    rx: oneshot::Receiver<Result<MinedTransaction, WalletError>>,
}

impl PowHandle {
    /// Wait for the solver task. Resolves with the mined result or the
    /// failure to surface to the caller.
    pub async fn wait(self) -> Result<MinedTransaction, WalletError> {
        self.rx
            .await
            .map_err(|_| WalletError::Internal("solver task dropped its result".to_string()))?
    }
}

/// Mine off the caller's execution context. Parents must already be
/// attached to the transaction.
pub fn spawn(mut tx: Transaction, params: NetworkParams, max_nonce: u32) -> PowHandle {
    let (result_tx, result_rx) = oneshot::channel();
    task::spawn_blocking(move || {
        let outcome = solve(&mut tx, &params, max_nonce);
        let _ = result_tx.send(outcome);
    });
    PowHandle { rx: result_rx }
}
