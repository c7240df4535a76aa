//! URL signature validation and repair.
//!
//! # Data Flow
//! ```text
//! SignedRequest
//!     → cascade.rs (per-image key lookup, then ordered repair stages)
//!     → validator.rs (strip signature segment, primary then per-image key)
//!     → signer.rs (HMAC-SHA1 over options/image)
//!     → CascadeOutcome; request rewritten on a repaired match
//! ```
//!
//! # Design Decisions
//! - First validated candidate wins; later stages never run
//! - A request nothing validates is passed through unchanged
//! - Signers are built per key by an explicit factory

pub mod cascade;
pub mod escape;
pub mod signer;
pub mod validator;

pub use cascade::{CascadeOutcome, SignatureRepair, Stage};
pub use signer::{HmacSha1Factory, HmacSha1Signer, Signer, SignerFactory};
pub use validator::{KeySource, SignatureValidator};
