//! SHA-256 of merged outputs: reporting, and checking against a digest the
//! caller already knows.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of everything `reader` yields.
pub fn sha256_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

pub fn sha256_path(path: &Path) -> Result<String> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    sha256_reader(BufReader::with_capacity(256 * 1024, file))
        .with_context(|| format!("hash {}", path.display()))
}

/// Hashes `path` and fails unless it matches `expected` (hex, any case).
/// Returns the computed digest.
pub fn verify_sha256(path: &Path, expected: &str) -> Result<String> {
    let expected = expected.trim();
    if expected.len() != 64 || hex::decode(expected).is_err() {
        bail!("not a SHA-256 hex digest: {expected:?}");
    }
    let actual = sha256_path(path)?;
    if !actual.eq_ignore_ascii_case(expected) {
        bail!(
            "{}: SHA-256 mismatch (expected {}, got {})",
            path.display(),
            expected.to_ascii_lowercase(),
            actual
        );
    }
    Ok(actual)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &str = "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03";

    #[test]
    fn digest_of_reader() {
        assert_eq!(sha256_reader(&b"hello\n"[..]).unwrap(), HELLO);
    }

    #[test]
    fn digest_spans_buffer_boundaries() {
        let data = vec![7u8; 600 * 1024];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, &data).unwrap();
        assert_eq!(sha256_path(&path).unwrap(), sha256_reader(&data[..]).unwrap());
    }

    #[test]
    fn verify_accepts_matching_digest_in_any_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"hello\n").unwrap();
        assert_eq!(verify_sha256(&path, HELLO).unwrap(), HELLO);
        assert!(verify_sha256(&path, &HELLO.to_ascii_uppercase()).is_ok());
    }

    #[test]
    fn verify_rejects_mismatch_and_malformed_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"hello!\n").unwrap();
        let err = verify_sha256(&path, HELLO).unwrap_err();
        assert!(err.to_string().contains("mismatch"), "{err}");
        assert!(verify_sha256(&path, "abc").is_err());
        assert!(verify_sha256(&path, &"zz".repeat(32)).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(sha256_path(&dir.path().join("nope.mp4")).is_err());
    }
}
