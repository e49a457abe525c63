//! Stable machine fingerprint for device-bound activations.

use sha2::{Digest, Sha256};

/// Derive a stable, privacy-preserving machine id.
///
/// Hashes hostname, OS, architecture, and the home directory path and
/// keeps the first 32 hex characters. No raw hardware identifier ever
/// leaves the machine.
pub fn machine_fingerprint() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown-host".to_string());

    let home = dirs::home_dir()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown-home".to_string());

    let fingerprint = format!(
        "{}|{}|{}|{}",
        host,
        std::env::consts::OS,
        std::env::consts::ARCH,
        home
    );

    let digest = Sha256::digest(fingerprint.as_bytes());
    hex::encode(digest)[..32].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_short() {
        let first = machine_fingerprint();
        let second = machine_fingerprint();
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
