//! Storage module
//!
//! Key-addressed blob storage for document and attachment bytes.
//! `BlobStore` is the backend-agnostic contract; `LocalBlobStore` keeps blobs
//! on the local filesystem and `MemoryBlobStore` keeps them in process memory.

pub mod blob_store;
pub mod local;
pub mod memory;
pub mod unique_path;

pub use blob_store::{BlobReader, BlobStore};
pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
pub use unique_path::{unique_path, DirLister, FsDirLister};
