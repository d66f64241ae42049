//! Config store abstraction for Tollgate.
//!
//! The gateway only ever reads from the store; the control plane owns all
//! writes. Backends implement [`ConfigStore::get`] and inherit typed reads
//! for tokens, routes and secrets.

pub mod cache;
pub mod error;
pub mod key;
pub mod store;
pub mod testing;

pub use cache::CachedConfigStore;
pub use error::StoreError;
pub use key::StoreKey;
pub use store::{ConfigStore, decode_secret};
