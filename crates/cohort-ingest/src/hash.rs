use std::path::Path;

use sha2::Digest;

use crate::{IngestError, Result};

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    hex::encode(digest)
}

/// Digest of a whole input file, recorded for provenance.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path).map_err(|source| IngestError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut hasher = sha2::Sha256::new();
    std::io::copy(&mut file, &mut hasher).map_err(|source| IngestError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_digest_matches_byte_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.tsv");
        std::fs::write(&path, b"f.eid\tf.31.0.0\n1\t0\n").unwrap();
        assert_eq!(
            sha256_file(&path).unwrap(),
            sha256_hex(b"f.eid\tf.31.0.0\n1\t0\n")
        );
    }
}
