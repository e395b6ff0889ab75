use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Wallet already exists: {0}")]
    WalletExists(String),

    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Invalid output value: {0}")]
    OutputValue(String),

    #[error("Gap limit exceeded: {0}")]
    GapLimitExceeded(String),

    #[error("Invalid PIN")]
    InvalidPin,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Decryption failed: {0}")]
    Decrypt(String),

    #[error("Nonce space exhausted before finding a valid hash")]
    PowExhausted,

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Wallet directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}
