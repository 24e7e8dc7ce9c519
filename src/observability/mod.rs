//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured logging via the tracing crate throughout
//! - Filter defaults to info, `-v` raises it to debug, `RUST_LOG` wins

pub mod logging;
