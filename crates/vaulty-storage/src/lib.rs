//! Vaulty Storage Library
//!
//! Object store abstraction used by the bucket workflows: private container creation,
//! container and content listing, and whole-object reads and writes. Backends are S3
//! (including S3-compatible endpoints) and the local filesystem.
//!
//! Keys are relative, `/`-separated paths. They must not contain `..` segments or a
//! leading `/`.

pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ContainerCreation, ObjectInfo, ObjectStream, Storage, StorageError, StorageResult};
pub use vaulty_core::StorageBackend;
