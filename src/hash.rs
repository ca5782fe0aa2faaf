//! Streaming content digests
//!
//! Files are read in fixed-size chunks so memory use does not depend on
//! file size; multi-gigabyte volumes hash in constant space.

use crate::graph::namespace::crypto;
use crate::graph::QualifiedName;
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256, Sha512};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read size used while streaming
pub const CHUNK_SIZE: usize = 8192;

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    Md5,
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    /// Graph predicate under which this digest is recorded
    pub fn predicate(&self) -> QualifiedName {
        match self {
            DigestAlgorithm::Md5 => crypto("md5"),
            DigestAlgorithm::Sha256 => crypto("sha256"),
            DigestAlgorithm::Sha512 => crypto("sha"),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "md5",
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A computed digest in lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest {
    pub algorithm: DigestAlgorithm,
    pub hex: String,
}

/// Hash everything `reader` yields
pub fn hash_reader<R: Read>(mut reader: R, algorithm: DigestAlgorithm) -> io::Result<Digest> {
    let hex = match algorithm {
        DigestAlgorithm::Md5 => stream::<Md5, _>(&mut reader)?,
        DigestAlgorithm::Sha256 => stream::<Sha256, _>(&mut reader)?,
        DigestAlgorithm::Sha512 => stream::<Sha512, _>(&mut reader)?,
    };
    Ok(Digest { algorithm, hex })
}

/// Hash the file at `path`
///
/// Returns `Ok(None)` when `path` is not an existing regular file, so a
/// caller can log and move on. A read failure part way through is an `Err`.
pub fn hash_file(path: &Path, algorithm: DigestAlgorithm) -> io::Result<Option<Digest>> {
    if !path.is_file() {
        return Ok(None);
    }
    let file = File::open(path)?;
    hash_reader(file, algorithm).map(Some)
}

/// Hash an in-memory buffer
pub fn hash_bytes(bytes: &[u8], algorithm: DigestAlgorithm) -> Digest {
    // Reading from a slice cannot fail.
    let hex = match algorithm {
        DigestAlgorithm::Md5 => hex::encode(Md5::digest(bytes)),
        DigestAlgorithm::Sha256 => hex::encode(Sha256::digest(bytes)),
        DigestAlgorithm::Sha512 => hex::encode(Sha512::digest(bytes)),
    };
    Digest { algorithm, hex }
}

fn stream<D: sha2::Digest, R: Read>(reader: &mut R) -> io::Result<String> {
    let mut hasher = D::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
