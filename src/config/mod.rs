//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → CLI overrides applied in main
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks and runs
//!   only after CLI overrides have been merged

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ensure_valid, load_config, ConfigError};
pub use schema::{ListenerConfig, ProxyConfig, VmConfig};
