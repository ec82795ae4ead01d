//! Vaulty ledger storage
//!
//! The ledger is the resumable local record of work already completed. Each workflow run
//! owns one ledger file; presence of a key means the item was processed.

pub mod error;
pub mod ledger;
pub mod naming;

pub use error::LedgerError;
pub use ledger::{Ledger, LedgerWrite};
pub use naming::{catalog_file_name, ledger_file_name};
