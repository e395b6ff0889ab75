//! Output scripts and base58check addresses
//!
//! Addresses are 25-byte payloads: 1 version byte, the 20-byte public key
//! hash and a 4-byte checksum (first bytes of the double SHA256 of the
//! first 21 bytes).

use bitcoin::base58;
use bitcoin::hashes::{hash160, sha256d, Hash};

use crate::config::NetworkParams;
use crate::error::WalletError;

/// Checks that the top stack item is greater than the block timestamp
pub const OP_GREATERTHAN_TIMESTAMP: u8 = 0x6f;
/// Duplicates the top stack item
pub const OP_DUP: u8 = 0x76;
/// Hashes the top stack item with hash160
pub const OP_HASH160: u8 = 0xa9;
/// Fails unless the two top stack items are equal
pub const OP_EQUALVERIFY: u8 = 0x88;
/// Verifies the signature against the public key
pub const OP_CHECKSIG: u8 = 0xac;
/// Marks a push whose length needs an explicit size byte
pub const OP_PUSHDATA1: u8 = 0x4c;

const ADDRESS_LEN: usize = 25;
const MAX_DIRECT_PUSH: usize = 75;

/// Decode a base58 address to bytes. No structural validation here.
pub fn decode_address(address: &str) -> Result<Vec<u8>, WalletError> {
    base58::decode(address).map_err(|e| WalletError::Address(e.to_string()))
}

/// Checksum over an address prefix: first 4 bytes of the double SHA256.
pub fn checksum(bytes: &[u8]) -> [u8; 4] {
    let digest = sha256d::Hash::hash(bytes).to_byte_array();
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Validate a decoded address: 25 bytes, matching checksum and a version
/// byte the network recognizes.
pub fn validate_address(bytes: &[u8], params: &NetworkParams) -> Result<(), WalletError> {
    if bytes.len() != ADDRESS_LEN {
        return Err(WalletError::Address(format!(
            "address should have 25 bytes, got {}",
            bytes.len()
        )));
    }

    let expected = checksum(&bytes[..21]);
    if bytes[21..] != expected {
        return Err(WalletError::Address("invalid checksum".to_string()));
    }

    let version = bytes[0];
    if version != params.p2pkh_version && version != params.p2sh_version {
        return Err(WalletError::Address(format!(
            "unknown address version byte {:#04x}",
            version
        )));
    }
    Ok(())
}

/// Render the P2PKH address of a compressed public key.
pub fn address_from_public_key(public_key: &[u8], params: &NetworkParams) -> String {
    let hash = hash160::Hash::hash(public_key).to_byte_array();
    let mut payload = Vec::with_capacity(ADDRESS_LEN);
    payload.push(params.p2pkh_version);
    payload.extend_from_slice(&hash);
    let check = checksum(&payload);
    payload.extend_from_slice(&check);
    base58::encode(&payload)
}

/// Push `data` onto the script: optional OP_PUSHDATA1 for payloads over
/// 75 bytes, then the 1-byte length, then the bytes.
pub fn push_data(stack: &mut Vec<u8>, data: &[u8]) {
    if data.len() > MAX_DIRECT_PUSH {
        stack.push(OP_PUSHDATA1);
    }
    stack.push(data.len() as u8);
    stack.extend_from_slice(data);
}

/// Build the P2PKH output script for `address`, optionally prefixed by a
/// timelock check.
pub fn create_output_script(
    address: &str,
    timelock: Option<u32>,
    params: &NetworkParams,
) -> Result<Vec<u8>, WalletError> {
    let bytes = decode_address(address)?;
    validate_address(&bytes, params)?;
    let hash = &bytes[1..21];

    let mut script = Vec::new();
    if let Some(timelock) = timelock {
        push_data(&mut script, &timelock.to_be_bytes());
        script.push(OP_GREATERTHAN_TIMESTAMP);
    }
    script.push(OP_DUP);
    script.push(OP_HASH160);
    // The hash has a fixed size of 20 bytes, never needs OP_PUSHDATA1
    push_data(&mut script, hash);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    Ok(script)
}

/// Build the signature script of an input.
pub fn create_input_data(signature_der: &[u8], public_key: &[u8]) -> Vec<u8> {
    let mut data = Vec::new();
    push_data(&mut data, signature_der);
    push_data(&mut data, public_key);
    data
}
