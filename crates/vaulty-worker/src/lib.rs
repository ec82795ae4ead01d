//! Vaulty bulk workflows
//!
//! - [`source::PaginatedSource`] walks a content provider page by page and feeds each item
//!   to an [`processor::ItemProcessor`], skipping what the run ledger already holds.
//! - [`transfer::TransferExecutor`] is the processor that copies an item into a vault or a
//!   bucket.
//! - [`coordinator::NotificationCoordinator`] submits an archive job and waits for its
//!   completion notification, then hands the output to a [`coordinator::JobHandler`].
//! - [`processor::InventorySweep`] is the handler that runs a
//!   [`processor::BulkResultProcessor`] over every archive in an inventory.
//!
//! Everything runs sequentially; the ledger is passed in by reference and owned by the
//! caller.

pub mod coordinator;
pub mod processor;
pub mod runner;
pub mod source;
pub mod transfer;

pub use coordinator::{
    CoordinatedJob, CoordinatorConfig, JobHandler, NotificationChannel, NotificationCoordinator,
};
pub use processor::{
    BulkResultProcessor, CatalogEntry, DeleteArchive, InventorySweep, ItemProcessor, WorkItem,
};
pub use runner::ItemRunner;
pub use source::PaginatedSource;
pub use transfer::{
    archive_description, ensure_bucket, ensure_vault, object_key, ArchiveDestination,
    BucketDestination, TransferDestination, TransferExecutor,
};
pub use tokio_util::sync::CancellationToken;
