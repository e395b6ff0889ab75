//! Transaction model and canonical binary codec
//!
//! - `types.rs` - transaction, input/output and token identifiers
//! - `script.rs` - output scripts and base58check address handling
//! - `codec.rs` - wire serialization and signing pre-image
//! - `builder.rs` - weight calculation, completion and input signing

pub mod builder;
pub mod codec;
pub mod script;
pub mod types;

pub use types::{OutPoint, TokenUid, Transaction, TxInput, TxOutput};
