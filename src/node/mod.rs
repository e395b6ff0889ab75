//! Network collaborators
//!
//! - `types.rs` - request/response contracts
//! - `client.rs` - thin REST client for the node API
//! - `events.rs` - address subscription and conflict-event bus

pub mod client;
pub mod events;
pub mod types;

pub use client::NodeClient;
pub use events::{AddressSubscriber, EventBus, NullSubscriber};
