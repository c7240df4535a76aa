//! Image request model.
//!
//! # Data Flow
//! ```text
//! raw request path (still percent-encoded)
//!     → request.rs (split into signature, options, target)
//!     → options.rs (typed options, canonical fragment)
//!     → SignedRequest handed to the signature cascade
//! ```

pub mod options;
pub mod request;

pub use options::ImageOptions;
pub use request::{ParseError, SignedRequest};
