//! Storage abstractions for the NcAnimate timetable.
//!
//! Provides unified interfaces for:
//! - The metadata catalog of input files and generated products
//! - Object storage (S3 or local disk) holding generated files
//! - A per-job metadata session caching catalog lookups

pub mod cache;
pub mod catalog;
pub mod object_store;

pub use self::object_store::{InMemoryStorage, ObjectStorage, ObjectStorageConfig, StorageBackend};
pub use cache::{CacheStats, MetadataSession};
pub use catalog::{CatalogSnapshot, InMemoryCatalog, MetadataCatalog};
