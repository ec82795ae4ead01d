//! Ledger key derivation.
//!
//! Every workflow derives ledger keys through [`ledger_key`] so that the same logical item
//! maps to the same key across page fetches and across runs. The natural id is the provider
//! item URI for videos, the object key for bucket objects and the `ArchiveId` for archive
//! entries.

use sha2::{Digest, Sha256};

/// Derive the ledger key for an item's natural identifier (lowercase hex SHA-256).
pub fn ledger_key(natural_id: &str) -> String {
    hex::encode(Sha256::digest(natural_id.as_bytes()))
}
