//! SHA256 digests of synced content.
//!
//! Used to identify uploaded content in logs without printing the content itself.

use sha2::{Digest, Sha256};

/// Calculate the SHA256 hash of content in memory as lowercase hex
pub fn content_sha256(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Short form of the content hash for log lines
pub fn short_digest(content: &[u8]) -> String {
    let mut digest = content_sha256(content);
    digest.truncate(12);
    digest
}
