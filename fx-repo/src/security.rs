//! Shared-secret comparison for the batch job endpoint.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Compares a presented secret with the configured one in constant time.
///
/// Both sides are hashed first so the comparison length does not depend on
/// the secret length. An empty configured secret never matches.
pub fn verify_shared_secret(provided: &str, expected: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    let provided = Sha256::digest(provided.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    provided.as_slice().ct_eq(expected.as_slice()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_secret() {
        assert!(verify_shared_secret("cron_secret_123", "cron_secret_123"));
    }

    #[test]
    fn test_wrong_secret() {
        assert!(!verify_shared_secret("cron_secret_124", "cron_secret_123"));
        assert!(!verify_shared_secret("", "cron_secret_123"));
        assert!(!verify_shared_secret("cron_secret_123x", "cron_secret_123"));
    }

    #[test]
    fn test_empty_expected_never_matches() {
        assert!(!verify_shared_secret("", ""));
    }
}
