//! Blake3 hashing utilities.
//!
//! Provides the hashing used for manifest fingerprints and cache keys.

/// Compute Blake3 hash of data
pub fn blake3_hash(data: &[u8]) -> String {
    let hash = blake3::hash(data);
    hash.to_hex().to_string()
}

/// Deterministic, filesystem-safe directory name for a normalized URL.
///
/// The readable part is the URL with every non-alphanumeric run collapsed to
/// `-`; the hash suffix keeps distinct URLs apart after sanitizing.
pub fn cache_key(normalized_url: &str) -> String {
    let stripped = normalized_url
        .split_once("://")
        .map_or(normalized_url, |(_, rest)| rest);

    let mut readable = String::with_capacity(stripped.len());
    for c in stripped.chars() {
        if c.is_ascii_alphanumeric() {
            readable.push(c.to_ascii_lowercase());
        } else if !readable.ends_with('-') {
            readable.push('-');
        }
    }
    let readable = readable.trim_matches('-');
    let readable: String = readable.chars().take(64).collect();

    let digest = blake3_hash(normalized_url.as_bytes());
    format!("{}-{}", readable, &digest[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake3_hash() {
        let hash = blake3_hash(b"hello world");

        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, blake3_hash(b"hello world"));
    }

    #[test]
    fn test_cache_key_is_stable_and_safe() {
        let key = cache_key("https://github.com/acme/x");
        assert_eq!(key, cache_key("https://github.com/acme/x"));
        assert!(key.starts_with("github-com-acme-x-"));
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
    }

    #[test]
    fn test_cache_key_distinguishes_similar_urls() {
        assert_ne!(
            cache_key("https://github.com/acme/x-y"),
            cache_key("https://github.com/acme/x/y")
        );
    }
}
