//! Canonical property keys for credentials and provider configuration.
//!
//! One naming scheme is used everywhere: `<backend>-<field>`. The same keys
//! appear in [`Credential::to_properties`](crate::Credential::to_properties),
//! in static fallback configuration, and in provider properties.

/// Discriminator key in a serialized credential map.
pub const CREDENTIAL_TYPE: &str = "credential-type";
/// Expiry instant (ms since epoch) in a serialized credential map.
pub const EXPIRE_TIME_IN_MS: &str = "expire-time-in-ms";

pub const S3_ACCESS_KEY_ID: &str = "s3-access-key-id";
pub const S3_SECRET_ACCESS_KEY: &str = "s3-secret-access-key";
pub const S3_SESSION_TOKEN: &str = "s3-session-token";
pub const S3_ROLE_ARN: &str = "s3-role-arn";

pub const GCS_TOKEN: &str = "gcs-token";
pub const GCS_SERVICE_ACCOUNT: &str = "gcs-service-account";

pub const OSS_ACCESS_KEY_ID: &str = "oss-access-key-id";
pub const OSS_SECRET_ACCESS_KEY: &str = "oss-secret-access-key";
pub const OSS_SECURITY_TOKEN: &str = "oss-security-token";
pub const OSS_ROLE_ARN: &str = "oss-role-arn";

/// Requested token lifetime for session-token providers, in seconds.
pub const TOKEN_EXPIRE_IN_SECS: &str = "token-expire-in-secs";

// Iceberg client property names.
pub const ICEBERG_S3_ACCESS_KEY_ID: &str = "s3.access-key-id";
pub const ICEBERG_S3_SECRET_ACCESS_KEY: &str = "s3.secret-access-key";
pub const ICEBERG_S3_SESSION_TOKEN: &str = "s3.session-token";
pub const ICEBERG_GCS_TOKEN: &str = "gcs.oauth2.token";
pub const ICEBERG_GCS_TOKEN_EXPIRES_AT: &str = "gcs.oauth2.token-expires-at";
pub const ICEBERG_OSS_ACCESS_KEY_ID: &str = "client.access-key-id";
pub const ICEBERG_OSS_ACCESS_KEY_SECRET: &str = "client.access-key-secret";
pub const ICEBERG_OSS_SECURITY_TOKEN: &str = "client.security-token";
