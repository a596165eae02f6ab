//! Context describing the resource a credential is requested for.

use std::collections::BTreeSet;

/// Access intent for a credential request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessIntent {
    /// Read-only access to the given locations.
    ReadOnly { read_locations: BTreeSet<String> },
    /// Access restricted to an allow-list of write and read locations.
    PathBased {
        write_locations: BTreeSet<String>,
        read_locations: BTreeSet<String>,
    },
}

/// Identifies the resource needing access and what the caller intends to do.
///
/// Passed to providers by reference; never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialContext {
    resource: String,
    user_name: Option<String>,
    intent: AccessIntent,
}

impl CredentialContext {
    /// Read-only access to `read_locations` of `resource`.
    pub fn read_only<I, S>(resource: impl Into<String>, read_locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resource: resource.into(),
            user_name: None,
            intent: AccessIntent::ReadOnly {
                read_locations: read_locations.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Allow-listed access: writes to `write_locations`, reads from
    /// `read_locations`. Write locations are implicitly readable.
    pub fn path_based<W, R, S>(
        resource: impl Into<String>,
        write_locations: W,
        read_locations: R,
    ) -> Self
    where
        W: IntoIterator<Item = S>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resource: resource.into(),
            user_name: None,
            intent: AccessIntent::PathBased {
                write_locations: write_locations.into_iter().map(Into::into).collect(),
                read_locations: read_locations.into_iter().map(Into::into).collect(),
            },
        }
    }

    pub fn with_user_name(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = Some(user_name.into());
        self
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    pub fn intent(&self) -> &AccessIntent {
        &self.intent
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self.intent, AccessIntent::ReadOnly { .. })
    }

    pub fn write_locations(&self) -> impl Iterator<Item = &str> {
        let locations = match &self.intent {
            AccessIntent::ReadOnly { .. } => None,
            AccessIntent::PathBased {
                write_locations, ..
            } => Some(write_locations),
        };
        locations.into_iter().flatten().map(String::as_str)
    }

    /// All readable locations, including write locations.
    pub fn read_locations(&self) -> BTreeSet<&str> {
        match &self.intent {
            AccessIntent::ReadOnly { read_locations } => {
                read_locations.iter().map(String::as_str).collect()
            }
            AccessIntent::PathBased {
                write_locations,
                read_locations,
            } => write_locations
                .iter()
                .chain(read_locations.iter())
                .map(String::as_str)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_context() {
        let ctx = CredentialContext::read_only("lake.cat.schema.fs", ["s3://b/fs"]);
        assert!(ctx.is_read_only());
        assert_eq!(ctx.write_locations().count(), 0);
        assert!(ctx.read_locations().contains("s3://b/fs"));
        assert_eq!(ctx.user_name(), None);
    }

    #[test]
    fn test_path_based_reads_include_writes() {
        let ctx = CredentialContext::path_based("tbl", ["s3://b/w"], ["s3://b/r"])
            .with_user_name("alice");
        assert!(!ctx.is_read_only());
        assert_eq!(ctx.write_locations().collect::<Vec<_>>(), vec!["s3://b/w"]);
        let reads = ctx.read_locations();
        assert!(reads.contains("s3://b/w"));
        assert!(reads.contains("s3://b/r"));
        assert_eq!(ctx.user_name(), Some("alice"));
    }
}
