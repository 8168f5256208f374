//! Download token generation.
//!
//! Tokens are bearer credentials: knowing one grants download access
//! bounded only by the link's expiry and count limit. They are derived by
//! hashing fresh random entropy together with a timestamp and truncating
//! to a fixed-length lowercase hex string, so they are unguessable and
//! carry no structure.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Length of a download token in hex characters.
pub const TOKEN_LEN: usize = 32;

/// Generate a download token.
pub fn generate_download_token() -> String {
    let mut entropy = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut entropy);

    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    let mut hasher = Sha256::new();
    hasher.update(entropy);
    hasher.update(timestamp.to_be_bytes());
    let digest = hasher.finalize();

    digest
        .iter()
        .take(TOKEN_LEN / 2)
        .map(|b| format!("{:02x}", b))
        .collect()
}
