//! Canonical wire encoding
//!
//! All integers are big-endian with no padding. The funds segment carries
//! tokens, inputs and outputs; the graph segment carries weight, timestamp
//! and parents; the nonce closes the buffer. The signing pre-image uses
//! the same field encodings but its own header order and empty input data
//! - both are fixed by the network protocol.

use sha2::{Digest, Sha256};

use bitcoin::hashes::{sha256d, Hash};

use crate::config::{NetworkParams, MAX_OUTPUT_VALUE, MAX_OUTPUT_VALUE_32};
use crate::error::WalletError;
use crate::tx::script;
use crate::tx::types::Transaction;

fn decode_hex_field(value: &str, what: &str) -> Result<Vec<u8>, WalletError> {
    hex::decode(value).map_err(|e| WalletError::Internal(format!("invalid {} hex: {}", what, e)))
}

/// Encode an output value: 4-byte signed big-endian while it fits, the
/// negated value as 8-byte signed big-endian above that (the sign is a
/// width discriminator on the wire).
pub fn output_value_bytes(value: u64) -> Result<Vec<u8>, WalletError> {
    if value == 0 || value > MAX_OUTPUT_VALUE {
        return Err(WalletError::OutputValue(format!(
            "value {} outside 1..={}",
            value, MAX_OUTPUT_VALUE
        )));
    }
    if value > MAX_OUTPUT_VALUE_32 {
        Ok((-(value as i64)).to_be_bytes().to_vec())
    } else {
        Ok((value as i32).to_be_bytes().to_vec())
    }
}

fn push_output(
    buf: &mut Vec<u8>,
    output: &crate::tx::types::TxOutput,
    params: &NetworkParams,
) -> Result<(), WalletError> {
    buf.extend_from_slice(&output_value_bytes(output.value)?);
    buf.push(output.token_data);
    let script = script::create_output_script(&output.address, output.timelock, params)?;
    buf.extend_from_slice(&(script.len() as u16).to_be_bytes());
    buf.extend_from_slice(&script);
    Ok(())
}

/// Funds segment: version, counts (tokens, inputs, outputs), token uids,
/// inputs with their signature scripts, outputs.
pub fn funds_bytes(tx: &Transaction, params: &NetworkParams) -> Result<Vec<u8>, WalletError> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&tx.version.to_be_bytes());
    buf.push(tx.tokens.len() as u8);
    buf.push(tx.inputs.len() as u8);
    buf.push(tx.outputs.len() as u8);

    for token in &tx.tokens {
        buf.extend_from_slice(&decode_hex_field(token.as_str(), "token uid")?);
    }

    for input in &tx.inputs {
        buf.extend_from_slice(&decode_hex_field(&input.tx_id, "input tx id")?);
        buf.push(input.index);
        buf.extend_from_slice(&(input.data.len() as u16).to_be_bytes());
        buf.extend_from_slice(&input.data);
    }

    for output in &tx.outputs {
        push_output(&mut buf, output, params)?;
    }
    Ok(buf)
}

/// Graph segment: weight, timestamp and parent hashes. Parents stay empty
/// until the network resolves them right before mining.
pub fn graph_bytes(tx: &Transaction) -> Result<Vec<u8>, WalletError> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&tx.weight.to_be_bytes());
    buf.extend_from_slice(&tx.timestamp.to_be_bytes());
    buf.push(tx.parents.len() as u8);
    for parent in &tx.parents {
        buf.extend_from_slice(&decode_hex_field(parent, "parent hash")?);
    }
    Ok(buf)
}

/// Full wire layout: funds, graph, nonce.
pub fn tx_bytes(tx: &Transaction, params: &NetworkParams) -> Result<Vec<u8>, WalletError> {
    let mut buf = funds_bytes(tx, params)?;
    buf.extend_from_slice(&graph_bytes(tx)?);
    buf.extend_from_slice(&tx.nonce.to_be_bytes());
    Ok(buf)
}

/// Signing pre-image. The count header is ordered inputs, outputs, tokens
/// and every input is serialized with an empty signature script.
pub fn data_to_sign(tx: &Transaction, params: &NetworkParams) -> Result<Vec<u8>, WalletError> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&tx.version.to_be_bytes());
    buf.push(tx.inputs.len() as u8);
    buf.push(tx.outputs.len() as u8);
    buf.push(tx.tokens.len() as u8);

    for token in &tx.tokens {
        buf.extend_from_slice(&decode_hex_field(token.as_str(), "token uid")?);
    }

    for input in &tx.inputs {
        buf.extend_from_slice(&decode_hex_field(&input.tx_id, "input tx id")?);
        buf.push(input.index);
        // Input data is fixed to length zero in the pre-image
        buf.extend_from_slice(&0u16.to_be_bytes());
    }

    for output in &tx.outputs {
        push_output(&mut buf, output, params)?;
    }
    Ok(buf)
}

/// Digest of the signing pre-image: double SHA256 with the byte order
/// reversed before it is handed to ECDSA.
pub fn data_to_sign_hash(data: &[u8]) -> [u8; 32] {
    let mut digest = sha256d::Hash::hash(data).to_byte_array();
    digest.reverse();
    digest
}

/// Single SHA256 over the funds segment, one of the two PoW header parts.
pub fn funds_hash(tx: &Transaction, params: &NetworkParams) -> Result<[u8; 32], WalletError> {
    Ok(Sha256::digest(funds_bytes(tx, params)?).into())
}

/// Single SHA256 over the graph segment, the other PoW header part.
pub fn graph_hash(tx: &Transaction) -> Result<[u8; 32], WalletError> {
    Ok(Sha256::digest(graph_bytes(tx)?).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::types::{TokenUid, TxInput, TxOutput};

    const TX_ID: &str = "00034a15973117852c45520af9e4296c68adb9d39dc99a0342e23cd6686b295e";

    fn reference_tx() -> Transaction {
        let mut tx = Transaction::new(
            vec![TokenUid::new("12")],
            vec![TxInput {
                tx_id: TX_ID.to_string(),
                index: 0,
                address: "H8rodtbo5TcfUkRBs6ujQTg2u1Re3xVZ11".to_string(),
                data: Vec::new(),
            }],
            vec![
                TxOutput {
                    address: "H8rodtbo5TcfUkRBs6ujQTg2u1Re3xVZ11".to_string(),
                    value: 1000,
                    timelock: None,
                    token_data: 0,
                },
                TxOutput {
                    address: "HQHv7d72jeby3hqAozUbh9Knhe8TCiTKnp".to_string(),
                    value: 1000,
                    timelock: Some(1550249803),
                    token_data: 0,
                },
            ],
        );
        tx.version = 1;
        tx
    }

    #[test]
    fn test_output_value_widths() {
        assert_eq!(output_value_bytes(100).unwrap(), vec![0, 0, 0, 100]);
        assert_eq!(
            output_value_bytes((1 << 31) - 1).unwrap(),
            vec![0x7f, 0xff, 0xff, 0xff]
        );
        // 2^31 no longer fits 4 bytes and is encoded negated on 8
        assert_eq!(
            output_value_bytes(1 << 31).unwrap(),
            (-(1i64 << 31)).to_be_bytes().to_vec()
        );
        assert_eq!(
            output_value_bytes(1 << 33).unwrap(),
            (-(1i64 << 33)).to_be_bytes().to_vec()
        );
    }

    #[test]
    fn test_output_value_domain() {
        assert!(matches!(
            output_value_bytes(0),
            Err(WalletError::OutputValue(_))
        ));
        assert!(output_value_bytes(MAX_OUTPUT_VALUE).is_ok());
        assert!(matches!(
            output_value_bytes(MAX_OUTPUT_VALUE + 1),
            Err(WalletError::OutputValue(_))
        ));
    }

    const SIGNED_INPUT_DATA: &str = "473045022100b314f00e18199a8b58acb7e379f6276e40118910319d86d7b0bc0d7cb00c1ea0022069a1450312d8c0fa2c7d0cf169655daa386d00333a72f529f85dea2b9510584c210346cddff43dffab8e13398633ab7a7caf0d634551e89ae6fd563e282f6744b983";

    #[test]
    fn test_data_to_sign_vector() {
        let params = NetworkParams::mainnet();
        let tx = reference_tx();
        let expected = "00010102011200034a15973117852c45520af9e4296c68adb9d39dc99a0342e23cd6686b295e000000000003e800001976a91419a8eb751eab5a13027e8cae215f6a5dafc1a8dd88ac000003e800001f045c66ef4b6f76a914c2f29cfdb73822200a07ab51d261b425af811fed88ac";
        assert_eq!(hex::encode(data_to_sign(&tx, &params).unwrap()), expected);
    }

    #[test]
    fn test_serialized_tx_vector() {
        let params = NetworkParams::mainnet();
        let mut tx = reference_tx();
        tx.inputs[0].data = hex::decode(SIGNED_INPUT_DATA).unwrap();
        tx.weight = f64::from_be_bytes(hex::decode("40308798722c78a0").unwrap().try_into().unwrap());
        tx.timestamp = 1550249810;
        tx.nonce = 0;

        let expected = "00010101021200034a15973117852c45520af9e4296c68adb9d39dc99a0342e23cd6686b295e00006a473045022100b314f00e18199a8b58acb7e379f6276e40118910319d86d7b0bc0d7cb00c1ea0022069a1450312d8c0fa2c7d0cf169655daa386d00333a72f529f85dea2b9510584c210346cddff43dffab8e13398633ab7a7caf0d634551e89ae6fd563e282f6744b983000003e800001976a91419a8eb751eab5a13027e8cae215f6a5dafc1a8dd88ac000003e800001f045c66ef4b6f76a914c2f29cfdb73822200a07ab51d261b425af811fed88ac40308798722c78a05c66ef520000000000";
        assert_eq!(hex::encode(tx_bytes(&tx, &params).unwrap()), expected);
    }

    #[test]
    fn test_data_to_sign_hash_is_reversed_sha256d() {
        let data = data_to_sign(&reference_tx(), &NetworkParams::mainnet()).unwrap();
        let digest = data_to_sign_hash(&data);

        let mut expected = sha256d::Hash::hash(&data).to_byte_array();
        expected.reverse();
        assert_eq!(digest, expected);
    }

    #[test]
    fn test_graph_bytes_with_parents() {
        let mut tx = reference_tx();
        tx.weight = 17.0;
        tx.timestamp = 1550249810;
        tx.parents = vec!["11".repeat(32), "22".repeat(32)];

        let graph = graph_bytes(&tx).unwrap();
        // weight(8) + timestamp(4) + count(1) + 2 * 32
        assert_eq!(graph.len(), 77);
        assert_eq!(graph[12], 2);
    }
}
