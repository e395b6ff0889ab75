//! Key vault
//!
//! Derives the hierarchical wallet keys from a 24-word mnemonic and keeps
//! every secret encrypted under the user's PIN (or password, for the seed
//! words). The stored PIN/password hashes are for verification only and
//! are never used as decryption keys.

use std::str::FromStr;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use bip39::Mnemonic;
use bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv};
use bitcoin::secp256k1::Secp256k1;
use bitcoin::NetworkKind;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::NetworkParams;
use crate::error::WalletError;

const NONCE_LEN: usize = 12;

/// Encrypted access data persisted for a wallet. `encrypted_main_key`
/// holds the account-chain extended private key (m/44'/coin'/0'/0) under
/// the PIN; `encrypted_words` holds the mnemonic under the password.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccessData {
    pub encrypted_main_key: String,
    pub pin_hash: String,
    pub encrypted_words: String,
    pub password_hash: String,
}

pub struct KeyVault {
    access: AccessData,
}

impl KeyVault {
    /// Derive the wallet master key from the mnemonic and encrypt all
    /// secrets. Same (words, passphrase) always yields the same keys.
    pub fn create(
        words: &str,
        passphrase: &str,
        pin: &str,
        password: &str,
        params: &NetworkParams,
    ) -> Result<Self, WalletError> {
        let mnemonic = validate_words(words)?;
        let account = derive_account(&mnemonic, passphrase, params)?;

        let access = AccessData {
            encrypted_main_key: encrypt_data(&account.to_string(), pin),
            pin_hash: hash_secret(pin),
            encrypted_words: encrypt_data(words, password),
            password_hash: hash_secret(password),
        };
        Ok(Self { access })
    }

    /// Rebuild the vault from persisted access data.
    pub fn from_access(access: AccessData) -> Self {
        Self { access }
    }

    pub fn access(&self) -> &AccessData {
        &self.access
    }

    pub fn is_pin_correct(&self, pin: &str) -> bool {
        hash_secret(pin) == self.access.pin_hash
    }

    pub fn is_password_correct(&self, password: &str) -> bool {
        hash_secret(password) == self.access.password_hash
    }

    /// Decrypt the account-chain extended private key. Callers must have
    /// validated the PIN through `is_pin_correct` first.
    pub fn account_key(&self, pin: &str) -> Result<Xpriv, WalletError> {
        let decrypted = decrypt_data(&self.access.encrypted_main_key, pin)?;
        Xpriv::from_str(&decrypted).map_err(|e| WalletError::Decrypt(e.to_string()))
    }

    /// Derive the child key owning address index `index`.
    pub fn child_key(&self, pin: &str, index: u32) -> Result<Xpriv, WalletError> {
        let account = self.account_key(pin)?;
        derive_child(&account, index)
    }

    /// Decrypt the seed words. Callers must have validated the password
    /// through `is_password_correct` first.
    pub fn words(&self, password: &str) -> Result<String, WalletError> {
        decrypt_data(&self.access.encrypted_words, password)
    }
}

/// Generate a fresh 24-word mnemonic for a new wallet.
pub fn generate_words() -> String {
    let mut entropy = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut entropy);
    Mnemonic::from_entropy(&entropy)
        .expect("32 bytes of entropy form a valid mnemonic")
        .to_string()
}

/// Validate that `words` is a checksummed 24-word mnemonic.
pub fn validate_words(words: &str) -> Result<Mnemonic, WalletError> {
    let mnemonic =
        Mnemonic::parse(words).map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;
    if mnemonic.word_count() != 24 {
        return Err(WalletError::InvalidMnemonic(format!(
            "expected 24 words, got {}",
            mnemonic.word_count()
        )));
    }
    Ok(mnemonic)
}

/// Derive the account-chain key at m/44'/<coin>'/0'/0.
pub fn derive_account(
    mnemonic: &Mnemonic,
    passphrase: &str,
    params: &NetworkParams,
) -> Result<Xpriv, WalletError> {
    let secp = Secp256k1::new();
    let seed = mnemonic.to_seed(passphrase);

    let master = Xpriv::new_master(NetworkKind::Main, &seed)
        .map_err(|e| WalletError::Internal(e.to_string()))?;
    let path = DerivationPath::from_str(&params.derivation_path())
        .map_err(|e| WalletError::Internal(e.to_string()))?;

    master
        .derive_priv(&secp, &path)
        .map_err(|e| WalletError::Internal(e.to_string()))
}

/// Derive a single non-hardened child of the account chain.
pub fn derive_child(account: &Xpriv, index: u32) -> Result<Xpriv, WalletError> {
    let secp = Secp256k1::new();
    let child = ChildNumber::from_normal_idx(index)
        .map_err(|e| WalletError::Internal(e.to_string()))?;
    account
        .derive_priv(&secp, &[child])
        .map_err(|e| WalletError::Internal(e.to_string()))
}

/// Compressed public key bytes of a child key.
pub fn child_public_key(child: &Xpriv) -> [u8; 33] {
    let secp = Secp256k1::new();
    child.private_key.public_key(&secp).serialize()
}

/// Verification hash for PINs and passwords: hex of a double SHA256.
pub fn hash_secret(secret: &str) -> String {
    let first = Sha256::digest(secret.as_bytes());
    hex::encode(Sha256::digest(first))
}

/// Encrypt `plain` under `secret` with AES-256-GCM. The random 96-bit
/// nonce is prepended and the whole buffer is hex encoded.
pub fn encrypt_data(plain: &str, secret: &str) -> String {
    let key = Sha256::digest(secret.as_bytes());
    let cipher = Aes256Gcm::new(&key);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plain.as_bytes())
        .expect("AES-GCM encryption of in-memory data cannot fail");

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    hex::encode(out)
}

/// Decrypt data produced by `encrypt_data`. A wrong secret fails the
/// authentication tag and surfaces as `WalletError::Decrypt`.
pub fn decrypt_data(encrypted: &str, secret: &str) -> Result<String, WalletError> {
    let raw = hex::decode(encrypted).map_err(|e| WalletError::Decrypt(e.to_string()))?;
    if raw.len() < NONCE_LEN {
        return Err(WalletError::Decrypt("ciphertext too short".to_string()));
    }

    let key = Sha256::digest(secret.as_bytes());
    let cipher = Aes256Gcm::new(&key);
    let nonce = Nonce::from_slice(&raw[..NONCE_LEN]);

    let plain = cipher
        .decrypt(nonce, &raw[NONCE_LEN..])
        .map_err(|_| WalletError::Decrypt("wrong key or corrupted data".to_string()))?;
    String::from_utf8(plain).map_err(|e| WalletError::Decrypt(e.to_string()))
}
