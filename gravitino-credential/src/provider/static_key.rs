//! Providers backed by statically configured access keys.

use super::{required_property, CredentialProvider};
use crate::context::CredentialContext;
use crate::credential::{
    Credential, CredentialKind, OssSecretKeyCredential, S3SecretKeyCredential, StorageBackend,
};
use crate::error::{CredentialError, Result};
use crate::keys;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Hands out the configured S3 access key pair.
pub struct S3SecretKeyProvider {
    credential: S3SecretKeyCredential,
    closed: AtomicBool,
}

impl std::fmt::Debug for S3SecretKeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3SecretKeyProvider")
            .field("access_key_id", &self.credential.access_key_id())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl S3SecretKeyProvider {
    /// Reads `s3-access-key-id` and `s3-secret-access-key`.
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self> {
        let credential = S3SecretKeyCredential::new(
            required_property(properties, keys::S3_ACCESS_KEY_ID)?,
            required_property(properties, keys::S3_SECRET_ACCESS_KEY)?,
        )?;
        Ok(Self {
            credential,
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl CredentialProvider for S3SecretKeyProvider {
    fn credential_kind(&self) -> CredentialKind {
        CredentialKind::S3SecretKey
    }

    async fn get_credential(&self, context: &CredentialContext) -> Result<Credential> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CredentialError::unavailable(format!(
                "S3 secret key provider is closed (resource '{}')",
                context.resource()
            )));
        }
        Ok(self.credential.clone().into())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// Hands out the configured OSS access key pair.
pub struct OssSecretKeyProvider {
    credential: OssSecretKeyCredential,
    closed: AtomicBool,
}

impl std::fmt::Debug for OssSecretKeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OssSecretKeyProvider")
            .field("access_key_id", &self.credential.access_key_id())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl OssSecretKeyProvider {
    /// Reads `oss-access-key-id` and `oss-secret-access-key`.
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self> {
        let credential = OssSecretKeyCredential::new(
            required_property(properties, keys::OSS_ACCESS_KEY_ID)?,
            required_property(properties, keys::OSS_SECRET_ACCESS_KEY)?,
        )?;
        Ok(Self {
            credential,
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl CredentialProvider for OssSecretKeyProvider {
    fn credential_kind(&self) -> CredentialKind {
        CredentialKind::OssSecretKey
    }

    async fn get_credential(&self, context: &CredentialContext) -> Result<Credential> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CredentialError::unavailable(format!(
                "OSS secret key provider is closed (resource '{}')",
                context.resource()
            )));
        }
        Ok(self.credential.clone().into())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// Build the globally configured static credential for `backend`.
///
/// Returns `Ok(None)` when none of the backend's static keys are present.
/// Fails with [`CredentialError::Config`] when only some of them are, or any
/// is blank. GCS has no static key form and always yields `None`.
pub fn static_fallback_credential(
    backend: StorageBackend,
    properties: &HashMap<String, String>,
) -> Result<Option<Credential>> {
    let credential = match backend {
        StorageBackend::S3 => {
            match read_key_pair(properties, keys::S3_ACCESS_KEY_ID, keys::S3_SECRET_ACCESS_KEY)? {
                Some((id, secret)) => S3SecretKeyCredential::new(id, secret)?.into(),
                None => return Ok(None),
            }
        }
        StorageBackend::Oss => {
            match read_key_pair(properties, keys::OSS_ACCESS_KEY_ID, keys::OSS_SECRET_ACCESS_KEY)? {
                Some((id, secret)) => OssSecretKeyCredential::new(id, secret)?.into(),
                None => return Ok(None),
            }
        }
        StorageBackend::Gcs => return Ok(None),
    };
    Ok(Some(credential))
}

fn read_key_pair(
    properties: &HashMap<String, String>,
    id_key: &str,
    secret_key: &str,
) -> Result<Option<(String, String)>> {
    if !properties.contains_key(id_key) && !properties.contains_key(secret_key) {
        return Ok(None);
    }
    Ok(Some((
        required_property(properties, id_key)?,
        required_property(properties, secret_key)?,
    )))
}
