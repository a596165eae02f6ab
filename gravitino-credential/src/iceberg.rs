//! Conversion of credentials into Iceberg client properties.

use crate::credential::Credential;
use crate::keys;
use std::collections::HashMap;

/// Map a credential onto the property names Iceberg clients read.
///
/// Attributes without an Iceberg counterpart are dropped. The GCS expiry is
/// emitted as `gcs.oauth2.token-expires-at` (ms since epoch).
pub fn to_iceberg_properties(credential: &Credential) -> HashMap<String, String> {
    let mut props = HashMap::new();
    for (key, value) in credential.credential_info() {
        if let Some(iceberg_key) = iceberg_key(&key) {
            props.insert(iceberg_key.to_string(), value);
        }
    }
    if let Credential::GcsToken(token) = credential {
        props.insert(
            keys::ICEBERG_GCS_TOKEN_EXPIRES_AT.to_string(),
            token.expire_time_ms().to_string(),
        );
    }
    props
}

fn iceberg_key(key: &str) -> Option<&'static str> {
    match key {
        keys::S3_ACCESS_KEY_ID => Some(keys::ICEBERG_S3_ACCESS_KEY_ID),
        keys::S3_SECRET_ACCESS_KEY => Some(keys::ICEBERG_S3_SECRET_ACCESS_KEY),
        keys::S3_SESSION_TOKEN => Some(keys::ICEBERG_S3_SESSION_TOKEN),
        keys::GCS_TOKEN => Some(keys::ICEBERG_GCS_TOKEN),
        keys::OSS_ACCESS_KEY_ID => Some(keys::ICEBERG_OSS_ACCESS_KEY_ID),
        keys::OSS_SECRET_ACCESS_KEY => Some(keys::ICEBERG_OSS_ACCESS_KEY_SECRET),
        keys::OSS_SECURITY_TOKEN => Some(keys::ICEBERG_OSS_SECURITY_TOKEN),
        _ => None,
    }
}
