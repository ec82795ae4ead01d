//! Vaulty Core Library
//!
//! This crate provides the domain models, error types, configuration and ledger key
//! derivation shared by every Vaulty component.

pub mod config;
pub mod error;
pub mod hooks;
pub mod item_error;
pub mod keys;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::VaultyConfig;
pub use error::{LogLevel, SetupStep, WorkflowError};
pub use hooks::{NoOpProgressReporter, ProgressReporter, TracingProgressReporter};
pub use item_error::{ItemError, ItemErrorKind, ItemResultExt};
pub use keys::ledger_key;
pub use storage_types::StorageBackend;
