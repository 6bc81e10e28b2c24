//! Core support for the oxidized-xenon recompilation toolkit
//!
//! Shared configuration, logging, and error/status types used by the
//! codegen and kernel crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod status;

pub use config::{CodegenConfig, RuntimeConfig};
pub use error::{ConfigError, Result};
pub use status::XStatus;
