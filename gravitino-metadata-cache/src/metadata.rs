//! Cached table metadata snapshots.
//!
//! The cache stores whatever implements [`MetadataSnapshot`]; the only thing
//! it needs to know about a snapshot is which metadata file it was read from.
//! [`LoadedTableMetadata`] is the concrete snapshot used for Iceberg tables.

use crate::error::{MetadataCacheError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An immutable metadata snapshot tagged with its location marker.
pub trait MetadataSnapshot: Send + Sync {
    /// Location of the metadata file this snapshot was read from.
    fn metadata_location(&self) -> &str;
}

/// Iceberg table metadata paired with the file it was loaded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoadedTableMetadata {
    pub metadata_location: String,
    pub metadata: TableMetadata,
}

impl LoadedTableMetadata {
    pub fn new(metadata_location: impl Into<String>, metadata: TableMetadata) -> Self {
        Self {
            metadata_location: metadata_location.into(),
            metadata,
        }
    }

    /// Parse the metadata JSON read from `metadata_location`.
    pub fn from_json_str(metadata_location: impl Into<String>, json: &str) -> Result<Self> {
        let metadata_location = metadata_location.into();
        if metadata_location.trim().is_empty() {
            return Err(MetadataCacheError::config(
                "metadata location should not be blank",
            ));
        }
        Ok(Self {
            metadata_location,
            metadata: TableMetadata::from_json_str(json)?,
        })
    }
}

impl MetadataSnapshot for LoadedTableMetadata {
    fn metadata_location(&self) -> &str {
        &self.metadata_location
    }
}

/// The subset of Iceberg v1/v2 table metadata that callers of the cache read.
///
/// Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TableMetadata {
    pub format_version: i32,
    #[serde(default)]
    pub table_uuid: Option<String>,
    /// Base path for data files.
    pub location: String,
    pub last_updated_ms: i64,
    #[serde(default)]
    pub current_schema_id: i32,
    /// Schemas kept as raw JSON; the cache does not interpret them.
    #[serde(default)]
    pub schemas: Vec<serde_json::Value>,
    #[serde(default)]
    pub current_snapshot_id: Option<i64>,
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl TableMetadata {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let metadata: Self = serde_json::from_str(json)?;
        if !(1..=2).contains(&metadata.format_version) {
            return Err(MetadataCacheError::metadata(format!(
                "unsupported format version {}",
                metadata.format_version
            )));
        }
        Ok(metadata)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// The current snapshot, if the table has one.
    ///
    /// A `current-snapshot-id` of `-1` (v1 "no snapshot") yields `None`.
    pub fn current_snapshot(&self) -> Option<&Snapshot> {
        let id = self.current_snapshot_id.filter(|id| *id >= 0)?;
        self.snapshots.iter().find(|s| s.snapshot_id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Snapshot {
    pub snapshot_id: i64,
    #[serde(default)]
    pub parent_snapshot_id: Option<i64>,
    pub timestamp_ms: i64,
    #[serde(default)]
    pub manifest_list: Option<String>,
    #[serde(default)]
    pub summary: HashMap<String, String>,
}

impl Snapshot {
    /// `total-records` from the snapshot summary.
    pub fn total_records(&self) -> Option<u64> {
        self.summary.get("total-records")?.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA_JSON: &str = r#"{
        "format-version": 2,
        "table-uuid": "9c12d441-03fe-4693-9a96-a0705ddf69c1",
        "location": "s3://warehouse/db/events",
        "last-sequence-number": 3,
        "last-updated-ms": 1700000000000,
        "last-column-id": 2,
        "current-schema-id": 0,
        "schemas": [{"schema-id": 0, "type": "struct", "fields": [
            {"id": 1, "name": "id", "required": true, "type": "long"}
        ]}],
        "current-snapshot-id": 2,
        "snapshots": [
            {"snapshot-id": 1, "timestamp-ms": 1699000000000, "summary": {"operation": "append"}},
            {"snapshot-id": 2, "parent-snapshot-id": 1, "timestamp-ms": 1700000000000,
             "manifest-list": "s3://warehouse/db/events/metadata/snap-2.avro",
             "summary": {"operation": "append", "total-records": "100"}}
        ],
        "properties": {"owner": "etl"}
    }"#;

    #[test]
    fn test_parse_metadata() {
        let metadata = TableMetadata::from_json_str(METADATA_JSON).unwrap();
        assert_eq!(metadata.format_version, 2);
        assert_eq!(metadata.location, "s3://warehouse/db/events");
        assert_eq!(metadata.schemas.len(), 1);
        assert_eq!(metadata.properties["owner"], "etl");

        let current = metadata.current_snapshot().unwrap();
        assert_eq!(current.snapshot_id, 2);
        assert_eq!(current.parent_snapshot_id, Some(1));
        assert_eq!(current.total_records(), Some(100));
    }

    #[test]
    fn test_no_current_snapshot() {
        let json = r#"{"format-version": 1, "location": "s3://w/t",
                       "last-updated-ms": 1, "current-snapshot-id": -1}"#;
        let metadata = TableMetadata::from_json_str(json).unwrap();
        assert!(metadata.current_snapshot().is_none());
    }

    #[test]
    fn test_rejects_unknown_format_version() {
        let json = r#"{"format-version": 7, "location": "s3://w/t", "last-updated-ms": 1}"#;
        let err = TableMetadata::from_json_str(json).unwrap_err();
        assert!(matches!(err, MetadataCacheError::Metadata(_)));
    }

    #[test]
    fn test_loaded_metadata_location() {
        let loaded = LoadedTableMetadata::from_json_str(
            "s3://warehouse/db/events/metadata/00002.metadata.json",
            METADATA_JSON,
        )
        .unwrap();
        assert_eq!(
            loaded.metadata_location(),
            "s3://warehouse/db/events/metadata/00002.metadata.json"
        );

        let reparsed = TableMetadata::from_json_str(&loaded.metadata.to_json_string().unwrap());
        assert_eq!(reparsed.unwrap(), loaded.metadata);

        assert!(LoadedTableMetadata::from_json_str("  ", METADATA_JSON).is_err());
    }
}
