//! SHA256 checksums, shared by migrations and catalog sections

use sha2::{Digest, Sha256};

/// Compute the hex SHA256 checksum of raw bytes
pub fn compute_checksum(content: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_ref());
    hex::encode(hasher.finalize())
}
