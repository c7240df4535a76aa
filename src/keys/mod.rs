//! Per-image signing keys.
//!
//! # Data Flow
//! ```text
//! signed request (decoded image target)
//!     → store.rs (KeyStore trait, bounded lookup)
//!     → filesystem.rs | memory.rs (backing store)
//!     → Option<key> handed to the signature cascade
//! ```
//!
//! # Design Decisions
//! - At most one lookup per request
//! - Lookup errors and timeouts mean "no per-image key", never a failed request

pub mod filesystem;
pub mod memory;
pub mod store;

pub use filesystem::FileSystemKeyStore;
pub use memory::InMemoryKeyStore;
pub use store::{lookup_key, KeyStore, KeyStoreError};
