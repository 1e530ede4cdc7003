//! GlobeTrotter Core Library
//!
//! This crate provides the configuration, configuration store and error types
//! shared by the GlobeTrotter image pipeline crates.

pub mod config;
pub mod config_store;
pub mod constants;
pub mod error;

// Re-export commonly used types
pub use config::{PresetConfig, ProcessingConfig};
pub use config_store::{ConfigStore, EnvFileStore};
pub use error::{AppError, ErrorMetadata, LogLevel};
