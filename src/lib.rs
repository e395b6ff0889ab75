//! HD wallet transaction engine
//!
//! The four invariant-heavy pieces of a single-address-space wallet,
//! bit-exact with the network protocol:
//!
//! - **KeyVault** (`keys`) - mnemonic-derived hierarchical keys, every
//!   secret encrypted under the user's PIN
//! - **AddressManager** (`addresses`) - gap-limited address sequence and
//!   shared-address discovery
//! - **TxCodec** (`tx`) - canonical binary encoding, output scripts,
//!   signing
//! - **ProofOfWorkSolver** (`pow`) - weight-targeted nonce search run off
//!   the critical path
//! - **UtxoLedger** (`ledger`) - unspent/spent/voided buckets under
//!   network conflict resolution
//!
//! `manager` wires them together over `storage` (persistence) and `node`
//! (network collaborators). Everything except the solver mutates state
//! synchronously and expects callers to serialize access.

pub mod addresses;
pub mod config;
pub mod error;
pub mod keys;
pub mod ledger;
pub mod manager;
pub mod node;
pub mod pow;
pub mod storage;
pub mod tx;

pub use addresses::AddressBook;
pub use config::{NetworkParams, WalletConfig, WeightConstants};
pub use error::{StorageError, WalletError};
pub use keys::KeyVault;
pub use ledger::{Balance, UtxoLedger};
pub use manager::{SendOutput, SendResult, WalletManager};
pub use pow::MinedTransaction;
pub use storage::Storage;
pub use tx::{TokenUid, Transaction};
