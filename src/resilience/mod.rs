//! Resilience subsystem.
//!
//! # Design Decisions
//! - Every external call on the request path has a deadline
//! - A missed deadline degrades the request, it never fails it

pub mod timeouts;
