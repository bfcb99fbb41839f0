//! Prompt fingerprinting.

use sha2::{Digest, Sha256};

/// Compute a stable SHA-256 fingerprint for a prompt string.
pub fn hash_prompt(prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    digest.iter().map(|byte| format!("{:02x}", byte)).collect()
}

/// Short form of [`hash_prompt`] for log lines.
pub fn short_hash(prompt: &str) -> String {
    hash_prompt(prompt).chars().take(12).collect()
}
