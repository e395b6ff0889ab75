//! Transaction completion and signing

use std::time::{SystemTime, UNIX_EPOCH};

use bitcoin::secp256k1::{Message, Secp256k1};

use crate::addresses::AddressBook;
use crate::config::{NetworkParams, WeightConstants, DECIMAL_PLACES, DEFAULT_TX_VERSION};
use crate::error::WalletError;
use crate::keys::{self, KeyVault};
use crate::tx::codec;
use crate::tx::script;
use crate::tx::types::Transaction;

pub(crate) fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before the unix epoch")
        .as_secs() as u32
}

/// Minimum weight of the transaction as currently serialized. The two
/// 32-byte parent slots are not attached yet but count towards the size,
/// and the trailing epsilon absorbs float rounding differences against
/// the node-computed minimum.
pub fn calculate_weight(
    tx: &Transaction,
    weights: &WeightConstants,
    params: &NetworkParams,
) -> Result<f64, WalletError> {
    let size = (codec::tx_bytes(tx, params)?.len() + 64) as f64;

    let sum_outputs: u64 = tx.outputs.iter().map(|o| o.value).sum();
    let amount = sum_outputs as f64 / 10f64.powi(DECIMAL_PLACES as i32);

    let weight = weights.weight_coefficient * size.log2()
        + 4.0 / (1.0 + weights.min_weight_k / amount)
        + 4.0;

    Ok(weight.max(weights.min_tx_weight) + 1e-6)
}

/// Fill in version, timestamp and weight of a transaction whose inputs
/// and outputs are final.
pub fn complete_tx(
    tx: &mut Transaction,
    weights: &WeightConstants,
    params: &NetworkParams,
) -> Result<(), WalletError> {
    tx.weight = 0.0;
    tx.nonce = 0;
    tx.version = DEFAULT_TX_VERSION;
    tx.timestamp = unix_now();
    tx.weight = calculate_weight(tx, weights, params)?;
    Ok(())
}

/// Sign every input: derive the child key owning the input's address,
/// ECDSA-sign the pre-image digest and attach the signature script.
/// Callers must have validated the PIN beforehand.
pub fn sign_inputs(
    tx: &mut Transaction,
    vault: &KeyVault,
    book: &AddressBook,
    pin: &str,
    params: &NetworkParams,
) -> Result<(), WalletError> {
    let digest = codec::data_to_sign_hash(&codec::data_to_sign(tx, params)?);
    let message = Message::from_digest(digest);

    let secp = Secp256k1::new();
    let account = vault.account_key(pin)?;

    for input in &mut tx.inputs {
        let index = book.index_of(&input.address).ok_or_else(|| {
            WalletError::Internal(format!("input address {} is not ours", input.address))
        })?;
        let child = keys::derive_child(&account, index)?;
        let signature = secp.sign_ecdsa(&message, &child.private_key);
        input.data = script::create_input_data(
            &signature.serialize_der(),
            &keys::child_public_key(&child),
        );
    }
    Ok(())
}
