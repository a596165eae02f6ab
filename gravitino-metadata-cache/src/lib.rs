//! Table metadata cache for Gravitino's Iceberg catalog.
//!
//! Loaded table metadata is cached per [`TableIdentifier`] and served only
//! while the metadata location it was read from is still the table's current
//! one, as reported by a [`MetadataLocationProbe`].
//!
//! - [`cache`] - [`TableMetadataCache`] and the in-memory implementation
//! - [`probe`] - location probes, including the Hive metastore probe
//! - [`metadata`] - [`LoadedTableMetadata`] and the parsed [`TableMetadata`] subset
//! - [`table_identifier`] - cache keys

pub mod cache;
pub mod error;
pub mod metadata;
pub mod probe;
pub mod table_identifier;

pub use cache::{MemoryMetadataCache, MetadataCacheConfig, TableMetadataCache};
pub use error::{MetadataCacheError, Result};
pub use metadata::{LoadedTableMetadata, MetadataSnapshot, Snapshot, TableMetadata};
pub use probe::{
    HiveMetadataLocationProbe, MetadataLocationProbe, MetastoreClient, MetastoreTable,
};
pub use table_identifier::TableIdentifier;
