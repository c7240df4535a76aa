//! Signature validation and repair in front of a thumbor image service.

pub mod config;
pub mod http;
pub mod imaging;
pub mod keys;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod signature;

pub use config::schema::GuardConfig;
pub use http::HttpServer;
pub use lifecycle::{GuardRuntime, Shutdown};
