use std::fmt::Write;

use sha2::{Digest, Sha256};

use kwscope_core::normalize_keyword;

/// Hex characters of the SHA-256 digest kept in a key.
const DIGEST_PREFIX_LEN: usize = 16;

/// Derive the cache key for a signal `kind` and its input.
///
/// The input is normalized first, so inputs that differ only in case or
/// spacing share a key. The same input always yields the same key.
#[must_use]
pub fn cache_key(kind: &str, input: &str) -> String {
    cache_key_exact(kind, &normalize_keyword(input))
}

/// Like [`cache_key`] but hashes `input` byte for byte, for case-sensitive
/// inputs such as channel ids and prompts.
#[must_use]
pub fn cache_key_exact(kind: &str, input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut key = String::with_capacity(kind.len() + 1 + DIGEST_PREFIX_LEN);
    key.push_str(kind);
    key.push(':');
    for byte in &digest[..DIGEST_PREFIX_LEN / 2] {
        let _ = write!(key, "{byte:02x}");
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_stable_and_prefixed() {
        let a = cache_key("trend", "minecraft building");
        let b = cache_key("trend", "minecraft building");
        assert_eq!(a, b);
        assert!(a.starts_with("trend:"));
        assert_eq!(a.len(), "trend:".len() + DIGEST_PREFIX_LEN);
    }

    #[test]
    fn key_ignores_case_and_spacing() {
        assert_eq!(
            cache_key("suggest", "Minecraft  Building"),
            cache_key("suggest", "minecraft building")
        );
    }

    #[test]
    fn exact_key_is_case_sensitive() {
        assert_ne!(cache_key_exact("channel", "UCabc"), cache_key_exact("channel", "UCABC"));
        assert_eq!(cache_key_exact("channel", "UCabc"), cache_key_exact("channel", "UCabc"));
    }

    #[test]
    fn kind_separates_namespaces() {
        assert_ne!(cache_key("trend", "x"), cache_key("suggest", "x"));
        assert_ne!(cache_key("trend", "x"), cache_key("trend", "y"));
    }
}
