//! License key generation, normalization, hashing, and masking.
//!
//! Keys are persisted only as a keyed HMAC-SHA256 digest; the plaintext
//! form appears in exactly one response, at issuance.

use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;

/// Characters allowed in generated keys. Excludes 0/O/1/I so keys stay
/// unambiguous when read aloud or typed.
const KEY_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Prefix for server-generated keys.
pub const DEFAULT_KEY_PREFIX: &str = "AK";

/// Server-only secret mixed into every key hash.
///
/// Without the pepper, stored hashes cannot be linked back to plaintext
/// keys. A missing or short pepper is a startup-time fatal error, never
/// a silent default.
#[derive(Clone)]
pub struct KeyPepper(String);

impl KeyPepper {
    pub const MIN_LEN: usize = 16;

    /// Wraps a configured pepper value. Returns `None` for values shorter
    /// than [`Self::MIN_LEN`] after trimming.
    pub fn new(secret: &str) -> Option<Self> {
        let secret = secret.trim();
        if secret.len() < Self::MIN_LEN {
            None
        } else {
            Some(Self(secret.to_string()))
        }
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for KeyPepper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyPepper(<redacted>)")
    }
}

/// Uppercase and strip everything outside `[A-Z0-9-]`.
pub fn normalize(raw: &str) -> String {
    raw.trim()
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// Generate a grouped, human-typeable license key like `AK-XXXX-XXXX-XXXX-XXXX`.
///
/// The prefix is uppercased and stripped to `[A-Z0-9]`; each group is
/// drawn from the unambiguous alphabet using OS entropy.
pub fn generate(prefix: &str, groups: usize, group_len: usize) -> String {
    let prefix: String = prefix
        .trim()
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect();
    let prefix = if prefix.is_empty() {
        DEFAULT_KEY_PREFIX.to_string()
    } else {
        prefix
    };

    let mut segments = Vec::with_capacity(groups);
    for _ in 0..groups {
        segments.push(random_segment(group_len));
    }

    format!("{}-{}", prefix, segments.join("-"))
}

fn random_segment(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
        .iter()
        .map(|b| KEY_ALPHABET[*b as usize % KEY_ALPHABET.len()] as char)
        .collect()
}

/// Keyed one-way digest of the normalized key, as lowercase hex.
/// Deterministic per pepper; not reversible without it.
pub fn hash(license_key: &str, pepper: &KeyPepper) -> String {
    let mut mac: Hmac<Sha256> =
        Mac::new_from_slice(pepper.as_bytes()).expect("HMAC can take key of any size");
    mac.update(normalize(license_key).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Display hint for a key: `ABCD...WXYZ` for keys longer than 8
/// characters after normalization, the full value otherwise.
pub fn mask(license_key: &str) -> String {
    let normalized = normalize(license_key);
    if normalized.len() <= 8 {
        return normalized;
    }
    format!(
        "{}...{}",
        &normalized[..4],
        &normalized[normalized.len() - 4..]
    )
}

/// Trim and cap a client-supplied machine id. Empty input yields `None`.
/// Machine ids are opaque fingerprints, never credentials.
pub fn normalize_machine_id(raw: &str) -> Option<String> {
    let machine_id = raw.trim();
    if machine_id.is_empty() {
        return None;
    }
    Some(machine_id.chars().take(128).collect())
}
