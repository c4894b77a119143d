//! Server version and CA digest

use super::Collector;
use crate::error::{KbomError, Result};
use semver::Version;
use sha2::{Digest, Sha256};

impl Collector {
    /// Kubernetes version and CA certificate digest
    pub(super) async fn metadata(&self) -> Result<(String, String)> {
        let ca = self
            .bounded("get CA data", self.source.ca_data())
            .await?
            .map_err(|e| KbomError::MetadataUnavailable(format!("{:#}", e)))?;

        let raw = self
            .bounded("get server version", self.source.server_version())
            .await?
            .map_err(|e| KbomError::MetadataUnavailable(format!("{:#}", e)))?;

        let version = normalize_version(&raw)?;
        Ok((version, ca_cert_digest(ca.as_deref())))
    }
}

/// Normalize a server git version such as `v1.25.1+build` to `1.25.1`.
///
/// Pre-release and build suffixes are dropped, and a short `1.25` is
/// completed to `1.25.0`.
pub fn normalize_version(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_matches('v');
    if let Ok(version) = Version::parse(trimmed) {
        return Ok(format!("{}.{}.{}", version.major, version.minor, version.patch));
    }

    let unparseable =
        || KbomError::MetadataUnavailable(format!("error parsing k8s version {:?}", raw));

    let core = trimmed.split(['+', '-']).next().unwrap_or_default();
    let parts = core
        .split('.')
        .map(|part| part.parse::<u64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| unparseable())?;

    match parts.as_slice() {
        [major] => Ok(format!("{}.0.0", major)),
        [major, minor] => Ok(format!("{}.{}.0", major, minor)),
        [major, minor, patch] => Ok(format!("{}.{}.{}", major, minor, patch)),
        _ => Err(unparseable()),
    }
}

/// Hex SHA-256 of the CA data, empty when there is none
pub fn ca_cert_digest(ca: Option<&[u8]>) -> String {
    match ca {
        Some(data) => hex::encode(Sha256::digest(data)),
        None => String::new(),
    }
}
