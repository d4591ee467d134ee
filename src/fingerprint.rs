use sha2::{Digest, Sha256};

/// Stable identity of a pdiff: lowercase hex SHA-256 of its exact source text.
///
/// Any textual change, whitespace included, yields a new fingerprint and so a
/// fresh delta for every player.
pub fn fingerprint(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        assert_eq!(
            fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_fingerprint_tracks_exact_text() {
        let a = fingerprint(r#"{"members":[]}"#);
        let b = fingerprint(r#"{"members": []}"#);
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert_eq!(a, fingerprint(r#"{"members":[]}"#));
    }
}
