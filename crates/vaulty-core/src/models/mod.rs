//! Data models for the application
//!
//! Each sub-module covers one feature area: the archive job lifecycle, vault
//! inventories, source items, the ledger and per-item reports.

mod inventory;
mod job;
mod ledger;
mod platform;
mod report;
mod source;
mod vault;

// Re-export all models for convenient imports
pub use inventory::*;
pub use job::*;
pub use ledger::*;
pub use platform::*;
pub use report::*;
pub use source::*;
pub use vault::*;
