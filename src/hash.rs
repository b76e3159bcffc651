// Copyright 2025 Martin Pool

//! Content-addressable hashing of source files and buffers.
//!
//! Every hash in this crate is a lowercase hex-encoded SHA-256 digest. Hashing is
//! pure: it depends only on the bytes given to it, never on the path, permissions,
//! or modification time of the file they came from, so that two runs over
//! byte-identical content always agree.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// A hex-encoded SHA-256 digest.
pub type Hash = String;

/// Hash an in-memory buffer.
pub fn hash_bytes(bytes: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Hash a file's content.
///
/// Fails only on I/O errors; the returned hash never depends on anything but the
/// bytes read from `path`.
pub fn hash_file(path: &Path) -> Result<Hash> {
    let bytes = fs::read(path).with_context(|| format!("read {} to hash it", path.display()))?;
    Ok(hash_bytes(&bytes))
}

/// Combine several hashes into one, order-independent, so that the combined hash
/// of a file's related test companions doesn't depend on the order they were
/// discovered in.
///
/// An empty input set hashes to the same value as an empty buffer.
pub fn combine_hashes<'a>(hashes: impl IntoIterator<Item = &'a Hash>) -> Hash {
    let mut sorted: Vec<&str> = hashes.into_iter().map(String::as_str).collect();
    sorted.sort_unstable();
    let mut hasher = Sha256::new();
    for h in sorted {
        hasher.update(h.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn same_bytes_hash_the_same() {
        assert_eq!(hash_bytes(b"hello"), hash_bytes(b"hello"));
        assert_ne!(hash_bytes(b"hello"), hash_bytes(b"hellp"));
    }

    #[test]
    fn hash_is_hex_sha256_length() {
        assert_eq!(hash_bytes(b"").len(), 64);
    }

    #[test]
    fn combine_is_order_independent() {
        let a = hash_bytes(b"a");
        let b = hash_bytes(b"b");
        assert_eq!(combine_hashes([&a, &b]), combine_hashes([&b, &a]));
    }

    #[test]
    fn combine_empty_is_stable() {
        assert_eq!(combine_hashes(std::iter::empty()), combine_hashes(None));
    }

    #[test]
    fn hash_file_matches_hash_bytes() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), b"source text\n").unwrap();
        assert_eq!(
            hash_file(tmp.path()).unwrap(),
            hash_bytes(b"source text\n")
        );
    }
}
