//! Credential value types.
//!
//! A [`Credential`] is an immutable, typed bundle of secret material for one
//! storage backend. Every variant validates its required fields when it is
//! constructed, so a half-populated credential can never exist.

use crate::error::{CredentialError, Result};
use crate::keys;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Storage backend a credential grants access to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Gcs,
    Oss,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::S3 => "s3",
            StorageBackend::Gcs => "gcs",
            StorageBackend::Oss => "oss",
        }
    }

    /// The short-lived token kind issued for this backend.
    pub fn dynamic_kind(&self) -> CredentialKind {
        match self {
            StorageBackend::S3 => CredentialKind::S3Token,
            StorageBackend::Gcs => CredentialKind::GcsToken,
            StorageBackend::Oss => CredentialKind::OssToken,
        }
    }

    /// The long-lived static key kind for this backend, if it has one.
    pub fn static_kind(&self) -> Option<CredentialKind> {
        match self {
            StorageBackend::S3 => Some(CredentialKind::S3SecretKey),
            StorageBackend::Gcs => None,
            StorageBackend::Oss => Some(CredentialKind::OssSecretKey),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(StorageBackend::S3),
            "gcs" => Ok(StorageBackend::Gcs),
            "oss" => Ok(StorageBackend::Oss),
            other => Err(CredentialError::config(format!(
                "Unknown storage backend '{}'",
                other
            ))),
        }
    }
}

/// Discriminant of a [`Credential`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialKind {
    S3SecretKey,
    S3Token,
    GcsToken,
    OssSecretKey,
    OssToken,
}

impl CredentialKind {
    pub const ALL: [CredentialKind; 5] = [
        CredentialKind::S3SecretKey,
        CredentialKind::S3Token,
        CredentialKind::GcsToken,
        CredentialKind::OssSecretKey,
        CredentialKind::OssToken,
    ];

    /// Type name used in serialized property maps.
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKind::S3SecretKey => "s3-secret-key",
            CredentialKind::S3Token => "s3-token",
            CredentialKind::GcsToken => "gcs-token",
            CredentialKind::OssSecretKey => "oss-secret-key",
            CredentialKind::OssToken => "oss-token",
        }
    }

    pub fn backend(&self) -> StorageBackend {
        match self {
            CredentialKind::S3SecretKey | CredentialKind::S3Token => StorageBackend::S3,
            CredentialKind::GcsToken => StorageBackend::Gcs,
            CredentialKind::OssSecretKey | CredentialKind::OssToken => StorageBackend::Oss,
        }
    }

    /// Whether this kind is a short-lived session token.
    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            CredentialKind::S3Token | CredentialKind::GcsToken | CredentialKind::OssToken
        )
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialKind {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self> {
        CredentialKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CredentialError::invalid(format!("Unknown credential type '{}'", s)))
    }
}

fn require_non_blank(value: String, what: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(CredentialError::invalid(format!("{} should not be empty", what)));
    }
    Ok(value)
}

fn require_positive_expiry(expire_time_ms: i64, kind: CredentialKind) -> Result<i64> {
    if expire_time_ms <= 0 {
        return Err(CredentialError::invalid(format!(
            "The expire time of {} should be greater than 0",
            kind
        )));
    }
    Ok(expire_time_ms)
}

const REDACTED: &str = "[REDACTED]";

/// Static S3 access key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct S3SecretKeyCredential {
    access_key_id: String,
    secret_access_key: String,
}

impl S3SecretKeyCredential {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            access_key_id: require_non_blank(access_key_id.into(), "S3 access key id")?,
            secret_access_key: require_non_blank(
                secret_access_key.into(),
                "S3 secret access key",
            )?,
        })
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }
}

impl fmt::Debug for S3SecretKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3SecretKeyCredential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &REDACTED)
            .finish()
    }
}

/// Temporary S3 credentials issued by STS.
#[derive(Clone, PartialEq, Eq)]
pub struct S3TokenCredential {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    expire_time_ms: i64,
}

impl S3TokenCredential {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
        expire_time_ms: i64,
    ) -> Result<Self> {
        Ok(Self {
            access_key_id: require_non_blank(access_key_id.into(), "S3 access key id")?,
            secret_access_key: require_non_blank(
                secret_access_key.into(),
                "S3 secret access key",
            )?,
            session_token: require_non_blank(session_token.into(), "S3 session token")?,
            expire_time_ms: require_positive_expiry(expire_time_ms, CredentialKind::S3Token)?,
        })
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    pub fn expire_time_ms(&self) -> i64 {
        self.expire_time_ms
    }
}

impl fmt::Debug for S3TokenCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3TokenCredential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &REDACTED)
            .field("session_token", &REDACTED)
            .field("expire_time_ms", &self.expire_time_ms)
            .finish()
    }
}

/// GCS OAuth2 access token.
#[derive(Clone, PartialEq, Eq)]
pub struct GcsTokenCredential {
    token: String,
    expire_time_ms: i64,
}

impl GcsTokenCredential {
    pub fn new(token: impl Into<String>, expire_time_ms: i64) -> Result<Self> {
        Ok(Self {
            token: require_non_blank(token.into(), "GCS session token")?,
            expire_time_ms: require_positive_expiry(expire_time_ms, CredentialKind::GcsToken)?,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expire_time_ms(&self) -> i64 {
        self.expire_time_ms
    }
}

impl fmt::Debug for GcsTokenCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcsTokenCredential")
            .field("token", &REDACTED)
            .field("expire_time_ms", &self.expire_time_ms)
            .finish()
    }
}

/// Static OSS access key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct OssSecretKeyCredential {
    access_key_id: String,
    secret_access_key: String,
}

impl OssSecretKeyCredential {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            access_key_id: require_non_blank(access_key_id.into(), "OSS access key id")?,
            secret_access_key: require_non_blank(
                secret_access_key.into(),
                "OSS secret access key",
            )?,
        })
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }
}

impl fmt::Debug for OssSecretKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OssSecretKeyCredential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &REDACTED)
            .finish()
    }
}

/// Temporary OSS credentials issued by Aliyun STS.
#[derive(Clone, PartialEq, Eq)]
pub struct OssTokenCredential {
    access_key_id: String,
    secret_access_key: String,
    security_token: String,
    expire_time_ms: i64,
}

impl OssTokenCredential {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        security_token: impl Into<String>,
        expire_time_ms: i64,
    ) -> Result<Self> {
        Ok(Self {
            access_key_id: require_non_blank(access_key_id.into(), "OSS access key id")?,
            secret_access_key: require_non_blank(
                secret_access_key.into(),
                "OSS secret access key",
            )?,
            security_token: require_non_blank(security_token.into(), "OSS security token")?,
            expire_time_ms: require_positive_expiry(expire_time_ms, CredentialKind::OssToken)?,
        })
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn security_token(&self) -> &str {
        &self.security_token
    }

    pub fn expire_time_ms(&self) -> i64 {
        self.expire_time_ms
    }
}

impl fmt::Debug for OssTokenCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OssTokenCredential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &REDACTED)
            .field("security_token", &REDACTED)
            .field("expire_time_ms", &self.expire_time_ms)
            .finish()
    }
}

/// A typed, possibly-expiring credential.
///
/// Serializes as the flat property map produced by [`Credential::to_properties`];
/// deserialization goes through [`Credential::from_properties`] and therefore
/// applies the same validation as the constructors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "HashMap<String, String>",
    into = "HashMap<String, String>"
)]
pub enum Credential {
    S3SecretKey(S3SecretKeyCredential),
    S3Token(S3TokenCredential),
    GcsToken(GcsTokenCredential),
    OssSecretKey(OssSecretKeyCredential),
    OssToken(OssTokenCredential),
}

impl Credential {
    pub fn kind(&self) -> CredentialKind {
        match self {
            Credential::S3SecretKey(_) => CredentialKind::S3SecretKey,
            Credential::S3Token(_) => CredentialKind::S3Token,
            Credential::GcsToken(_) => CredentialKind::GcsToken,
            Credential::OssSecretKey(_) => CredentialKind::OssSecretKey,
            Credential::OssToken(_) => CredentialKind::OssToken,
        }
    }

    /// Expiry instant in ms since epoch; `0` for static credentials.
    pub fn expire_time_ms(&self) -> i64 {
        match self {
            Credential::S3SecretKey(_) | Credential::OssSecretKey(_) => 0,
            Credential::S3Token(c) => c.expire_time_ms,
            Credential::GcsToken(c) => c.expire_time_ms,
            Credential::OssToken(c) => c.expire_time_ms,
        }
    }

    pub fn is_expiring(&self) -> bool {
        self.expire_time_ms() > 0
    }

    /// Kind-specific attributes, keyed by the canonical names in [`keys`].
    pub fn credential_info(&self) -> HashMap<String, String> {
        let pairs: Vec<(&str, &str)> = match self {
            Credential::S3SecretKey(c) => vec![
                (keys::S3_ACCESS_KEY_ID, c.access_key_id.as_str()),
                (keys::S3_SECRET_ACCESS_KEY, c.secret_access_key.as_str()),
            ],
            Credential::S3Token(c) => vec![
                (keys::S3_ACCESS_KEY_ID, c.access_key_id.as_str()),
                (keys::S3_SECRET_ACCESS_KEY, c.secret_access_key.as_str()),
                (keys::S3_SESSION_TOKEN, c.session_token.as_str()),
            ],
            Credential::GcsToken(c) => vec![(keys::GCS_TOKEN, c.token.as_str())],
            Credential::OssSecretKey(c) => vec![
                (keys::OSS_ACCESS_KEY_ID, c.access_key_id.as_str()),
                (keys::OSS_SECRET_ACCESS_KEY, c.secret_access_key.as_str()),
            ],
            Credential::OssToken(c) => vec![
                (keys::OSS_ACCESS_KEY_ID, c.access_key_id.as_str()),
                (keys::OSS_SECRET_ACCESS_KEY, c.secret_access_key.as_str()),
                (keys::OSS_SECURITY_TOKEN, c.security_token.as_str()),
            ],
        };
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Flatten into a property map including type and expiry.
    pub fn to_properties(&self) -> HashMap<String, String> {
        let mut props = self.credential_info();
        props.insert(keys::CREDENTIAL_TYPE.to_string(), self.kind().to_string());
        props.insert(
            keys::EXPIRE_TIME_IN_MS.to_string(),
            self.expire_time_ms().to_string(),
        );
        props
    }

    /// Rebuild a credential from a property map produced by [`to_properties`].
    ///
    /// [`to_properties`]: Credential::to_properties
    pub fn from_properties(props: &HashMap<String, String>) -> Result<Self> {
        let type_name = props.get(keys::CREDENTIAL_TYPE).ok_or_else(|| {
            CredentialError::invalid(format!("Missing '{}'", keys::CREDENTIAL_TYPE))
        })?;
        let kind: CredentialKind = type_name.parse()?;

        let field = |key: &str| props.get(key).cloned().unwrap_or_default();
        let expire_time_ms = || -> Result<i64> {
            let raw = props.get(keys::EXPIRE_TIME_IN_MS).ok_or_else(|| {
                CredentialError::invalid(format!(
                    "Missing '{}' for {}",
                    keys::EXPIRE_TIME_IN_MS,
                    kind
                ))
            })?;
            raw.trim().parse::<i64>().map_err(|e| {
                CredentialError::invalid(format!(
                    "Invalid '{}' value '{}': {}",
                    keys::EXPIRE_TIME_IN_MS,
                    raw,
                    e
                ))
            })
        };

        let credential = match kind {
            CredentialKind::S3SecretKey => S3SecretKeyCredential::new(
                field(keys::S3_ACCESS_KEY_ID),
                field(keys::S3_SECRET_ACCESS_KEY),
            )?
            .into(),
            CredentialKind::S3Token => S3TokenCredential::new(
                field(keys::S3_ACCESS_KEY_ID),
                field(keys::S3_SECRET_ACCESS_KEY),
                field(keys::S3_SESSION_TOKEN),
                expire_time_ms()?,
            )?
            .into(),
            CredentialKind::GcsToken => {
                GcsTokenCredential::new(field(keys::GCS_TOKEN), expire_time_ms()?)?.into()
            }
            CredentialKind::OssSecretKey => OssSecretKeyCredential::new(
                field(keys::OSS_ACCESS_KEY_ID),
                field(keys::OSS_SECRET_ACCESS_KEY),
            )?
            .into(),
            CredentialKind::OssToken => OssTokenCredential::new(
                field(keys::OSS_ACCESS_KEY_ID),
                field(keys::OSS_SECRET_ACCESS_KEY),
                field(keys::OSS_SECURITY_TOKEN),
                expire_time_ms()?,
            )?
            .into(),
        };
        Ok(credential)
    }
}

impl From<S3SecretKeyCredential> for Credential {
    fn from(c: S3SecretKeyCredential) -> Self {
        Credential::S3SecretKey(c)
    }
}

impl From<S3TokenCredential> for Credential {
    fn from(c: S3TokenCredential) -> Self {
        Credential::S3Token(c)
    }
}

impl From<GcsTokenCredential> for Credential {
    fn from(c: GcsTokenCredential) -> Self {
        Credential::GcsToken(c)
    }
}

impl From<OssSecretKeyCredential> for Credential {
    fn from(c: OssSecretKeyCredential) -> Self {
        Credential::OssSecretKey(c)
    }
}

impl From<OssTokenCredential> for Credential {
    fn from(c: OssTokenCredential) -> Self {
        Credential::OssToken(c)
    }
}

impl TryFrom<HashMap<String, String>> for Credential {
    type Error = CredentialError;

    fn try_from(props: HashMap<String, String>) -> Result<Self> {
        Credential::from_properties(&props)
    }
}

impl From<Credential> for HashMap<String, String> {
    fn from(credential: Credential) -> Self {
        credential.to_properties()
    }
}
