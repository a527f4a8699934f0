// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content digests for duplicate detection.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use telefetch_core::TelefetchError;

/// Hex SHA-256 of a file, streamed in fixed-size chunks.
pub fn sha256_file(path: &Path) -> Result<String, TelefetchError> {
    let file = File::open(path).map_err(|e| TelefetchError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = reader
            .read(&mut buffer)
            .map_err(|e| TelefetchError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    let digest = hex::encode(hasher.finalize());
    debug!(path = %path.display(), digest = %digest, "file hashed");
    Ok(digest)
}

/// Whether two files have identical content. Sizes are compared first.
pub fn same_content(a: &Path, b: &Path) -> Result<bool, TelefetchError> {
    let len_a = std::fs::metadata(a).map_err(|e| TelefetchError::io(a, e))?.len();
    let len_b = std::fs::metadata(b).map_err(|e| TelefetchError::io(b, e))?.len();
    if len_a != len_b {
        return Ok(false);
    }
    Ok(sha256_file(a)? == sha256_file(b)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            sha256_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn content_comparison() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let c = dir.path().join("c");
        std::fs::write(&a, b"same bytes").unwrap();
        std::fs::write(&b, b"same bytes").unwrap();
        std::fs::write(&c, b"other byte").unwrap();
        assert!(same_content(&a, &b).unwrap());
        assert!(!same_content(&a, &c).unwrap());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = sha256_file(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, TelefetchError::Io { .. }));
    }
}
