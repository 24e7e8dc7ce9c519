//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ports, intervals) and required fields
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function over the config

use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

/// A single semantic validation failure.
#[derive(Debug)]
pub enum ValidationError {
    MissingMachineName,
    InvalidBindAddress(String),
    InvalidTargetPort,
    InvalidPollInterval,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MissingMachineName => {
                write!(f, "machine name is missing (set [vm].machine or pass it on the command line)")
            }
            ValidationError::InvalidBindAddress(addr) => {
                write!(f, "listen address {:?} is not a valid socket address", addr)
            }
            ValidationError::InvalidTargetPort => write!(f, "target port must be nonzero"),
            ValidationError::InvalidPollInterval => {
                write!(f, "poll interval must be at least one second")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a configuration, reporting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.vm.machine.trim().is_empty() {
        errors.push(ValidationError::MissingMachineName);
    }
    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.vm.target_port == 0 {
        errors.push(ValidationError::InvalidTargetPort);
    }
    if config.vm.poll_interval_secs == 0 {
        errors.push(ValidationError::InvalidPollInterval);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
