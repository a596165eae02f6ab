//! Table identifiers used as metadata cache keys.

use crate::error::{MetadataCacheError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A table name qualified by a (possibly multi-level) namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableIdentifier {
    namespace: Vec<String>,
    name: String,
}

impl TableIdentifier {
    /// Build an identifier from namespace levels and a table name.
    ///
    /// Every level and the name must be non-blank, and there must be at
    /// least one namespace level.
    pub fn new<I, S>(namespace: I, name: impl Into<String>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let namespace: Vec<String> = namespace.into_iter().map(Into::into).collect();
        let name = name.into();
        if namespace.is_empty() {
            return Err(MetadataCacheError::config(format!(
                "table '{}' has no namespace",
                name
            )));
        }
        if name.trim().is_empty() || namespace.iter().any(|level| level.trim().is_empty()) {
            return Err(MetadataCacheError::config(format!(
                "blank component in table identifier '{}.{}'",
                namespace.join("."),
                name
            )));
        }
        Ok(Self { namespace, name })
    }

    /// Parse `db.table`, `ns1.ns2.table`, `db/table` or `ns1/ns2/table`.
    ///
    /// Slash form takes precedence when both separators appear, so a dotted
    /// table name can be expressed as `db/my.table`.
    pub fn parse(raw: &str) -> Result<Self> {
        let separator = if raw.contains('/') { '/' } else { '.' };
        let mut parts: Vec<&str> = raw.split(separator).collect();
        if parts.len() < 2 {
            return Err(MetadataCacheError::config(format!(
                "invalid table identifier '{}': expected namespace and table",
                raw
            )));
        }
        let name = parts.pop().unwrap_or_default();
        Self::new(parts, name)
            .map_err(|_| MetadataCacheError::config(format!("invalid table identifier '{}'", raw)))
    }

    pub fn namespace(&self) -> &[String] {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The first namespace level, which a Hive metastore treats as the
    /// database. Hive namespaces have a single level.
    pub fn database(&self) -> &str {
        self.namespace.first().map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace.join("."), self.name)
    }
}

impl FromStr for TableIdentifier {
    type Err = MetadataCacheError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotted() {
        let id = TableIdentifier::parse("sales.orders").unwrap();
        assert_eq!(id.namespace(), ["sales".to_string()]);
        assert_eq!(id.name(), "orders");
        assert_eq!(id.database(), "sales");
        assert_eq!(id.to_string(), "sales.orders");
    }

    #[test]
    fn test_parse_multi_level() {
        let id: TableIdentifier = "lake/sales/orders".parse().unwrap();
        assert_eq!(id.namespace().len(), 2);
        assert_eq!(id.database(), "lake");
        assert_eq!(id.to_string(), "lake.sales.orders");
        assert_eq!(id, TableIdentifier::parse("lake.sales.orders").unwrap());
    }

    #[test]
    fn test_slash_form_allows_dotted_name() {
        let id = TableIdentifier::parse("sales/orders.v2").unwrap();
        assert_eq!(id.name(), "orders.v2");
    }

    #[test]
    fn test_parse_invalid() {
        for raw in ["orders", ".orders", "sales.", "a//b", " .orders", ""] {
            assert!(TableIdentifier::parse(raw).is_err(), "{raw:?} should fail");
        }
        assert!(TableIdentifier::new(Vec::<String>::new(), "t").is_err());
    }
}
