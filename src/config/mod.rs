//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GuardConfig (validated, immutable)
//!     → turned into a GuardRuntime shared by all requests
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps in a runtime built from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - A config that fails to load or validate never replaces the running one

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_config_with, ConfigError, ConfigOverrides};
pub use schema::GuardConfig;
pub use schema::KeyStoreConfig;
pub use schema::ListenerConfig;
pub use schema::SecurityConfig;
pub use schema::UpstreamConfig;
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
