//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, GET/HEAD only)
//!     → request.rs (request ID)
//!     → signature cascade (validate, repair path)
//!     → forward.rs (upstream URI, hop-by-hop headers)
//!     → upstream image service
//!     → response streamed back to client
//! ```

pub mod forward;
pub mod request;
pub mod server;

pub use request::{MakeRequestUuid, RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
