// hasher.rs — SHA-256 helpers.
//
// Every hash in the control plane is SHA-256 encoded as a 64-character
// lowercase hex string.

use sha2::{Digest, Sha256};

/// Hash arbitrary bytes to lowercase hex.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Hash a UTF-8 string to lowercase hex.
pub fn hash_str(s: &str) -> String {
    hash_bytes(s.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_same_hash() {
        assert_eq!(hash_str("governance"), hash_str("governance"));
    }

    #[test]
    fn different_input_different_hash() {
        assert_ne!(hash_str("allow"), hash_str("deny"));
    }

    #[test]
    fn output_is_64_lowercase_hex_chars() {
        let hash = hash_str("x");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
    }

    #[test]
    fn matches_known_sha256_vector() {
        // SHA-256 of the empty string.
        assert_eq!(
            hash_str(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
