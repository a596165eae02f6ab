//! Probes that report a table's authoritative metadata location.

use crate::error::{MetadataCacheError, Result};
use crate::table_identifier::TableIdentifier;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;

/// Table parameter holding the table format.
pub const TABLE_TYPE_PROP: &str = "table_type";
/// Value of [`TABLE_TYPE_PROP`] marking an Iceberg table.
pub const ICEBERG_TABLE_TYPE: &str = "ICEBERG";
/// Table parameter holding the current metadata file location.
pub const METADATA_LOCATION_PROP: &str = "metadata_location";

/// Reports where the current metadata of a table lives.
#[async_trait]
pub trait MetadataLocationProbe: Debug + Send + Sync {
    /// `Ok(None)` when the location cannot be determined (table missing, not
    /// an Iceberg table, parameter absent).
    async fn current_metadata_location(&self, id: &TableIdentifier) -> Result<Option<String>>;
}

/// A table as returned by a Hive-compatible metastore.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetastoreTable {
    pub database: String,
    pub name: String,
    pub parameters: HashMap<String, String>,
}

/// Minimal Hive metastore client surface.
#[async_trait]
pub trait MetastoreClient: Debug + Send + Sync {
    async fn get_table(&self, database: &str, table: &str) -> Result<MetastoreTable>;
}

/// Reads `metadata_location` from Hive table parameters.
#[derive(Debug, Clone)]
pub struct HiveMetadataLocationProbe {
    catalog_name: String,
    client: Arc<dyn MetastoreClient>,
}

impl HiveMetadataLocationProbe {
    pub fn new(catalog_name: impl Into<String>, client: Arc<dyn MetastoreClient>) -> Self {
        Self {
            catalog_name: catalog_name.into(),
            client,
        }
    }

    pub fn catalog_name(&self) -> &str {
        &self.catalog_name
    }

    async fn lookup(&self, id: &TableIdentifier) -> Result<String> {
        let table = self.client.get_table(id.database(), id.name()).await?;

        let table_type = table.parameters.get(TABLE_TYPE_PROP).ok_or_else(|| {
            MetadataCacheError::probe_unavailable(format!("{} has no {}", id, TABLE_TYPE_PROP))
        })?;
        if !table_type.eq_ignore_ascii_case(ICEBERG_TABLE_TYPE) {
            return Err(MetadataCacheError::probe_unavailable(format!(
                "{} is not an Iceberg table (type {})",
                id, table_type
            )));
        }

        match table.parameters.get(METADATA_LOCATION_PROP) {
            Some(location) if !location.trim().is_empty() => Ok(location.clone()),
            _ => Err(MetadataCacheError::probe_unavailable(format!(
                "{} has no {}",
                id, METADATA_LOCATION_PROP
            ))),
        }
    }
}

#[async_trait]
impl MetadataLocationProbe for HiveMetadataLocationProbe {
    async fn current_metadata_location(&self, id: &TableIdentifier) -> Result<Option<String>> {
        match self.lookup(id).await {
            Ok(location) => Ok(Some(location)),
            Err(e) => {
                debug!(
                    catalog = %self.catalog_name,
                    table = %id,
                    error = %e,
                    "metadata location unavailable"
                );
                Ok(None)
            }
        }
    }
}
