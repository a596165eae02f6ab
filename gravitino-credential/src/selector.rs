//! Candidate selection: dynamic tokens before static keys.

use crate::credential::{Credential, CredentialKind, StorageBackend};

/// Picks the preferred credential for one storage backend.
///
/// Policy, in order:
/// 1. the first candidate of the backend's session-token kind;
/// 2. else the first candidate of the backend's static secret-key kind;
/// 3. else `None`, and the caller falls back to statically configured keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialSelector {
    backend: StorageBackend,
}

impl CredentialSelector {
    pub fn new(backend: StorageBackend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> StorageBackend {
        self.backend
    }

    pub fn select(&self, candidates: &[Credential]) -> Option<Credential> {
        self.first_of(candidates, self.backend.dynamic_kind())
            .or_else(|| {
                self.backend
                    .static_kind()
                    .and_then(|kind| self.first_of(candidates, kind))
            })
            .cloned()
    }

    fn first_of<'a>(
        &self,
        candidates: &'a [Credential],
        kind: CredentialKind,
    ) -> Option<&'a Credential> {
        candidates.iter().find(|c| c.kind() == kind)
    }
}
