//! Content fingerprints used for change detection

use sha2::{Digest, Sha256};

/// Compute the SHA-256 digest of `data` as lowercase hex.
pub fn fingerprint(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
