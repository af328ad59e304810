//! SHA-256 content fingerprints for duplicate detection
//!
//! Files are read in 1 MiB chunks so large videos never have to be held in
//! memory. A read failure does not abort the run: the file gets
//! [`Fingerprint::Unavailable`] and is copied without duplicate detection.

use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::{trace, warn};

/// Size of each read chunk (1 MiB)
const CHUNK_SIZE: usize = 1024 * 1024;

/// Value persisted in the action log for files that could not be hashed.
/// Never a valid hex digest, so it cannot collide with a real fingerprint.
pub const UNAVAILABLE_MARKER: &str = "ERROR_HASH";

/// Content fingerprint of a file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fingerprint {
    /// Lowercase hex SHA-256 of the full file contents
    Digest(String),
    /// The file could not be read; no duplicate detection is possible
    Unavailable,
}

impl Fingerprint {
    /// The hex digest, if the file was hashed
    pub fn digest(&self) -> Option<&str> {
        match self {
            Fingerprint::Digest(hex) => Some(hex),
            Fingerprint::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Fingerprint::Digest(_))
    }

    /// Value stored in the action log `checksum` column
    pub fn as_log_value(&self) -> &str {
        match self {
            Fingerprint::Digest(hex) => hex,
            Fingerprint::Unavailable => UNAVAILABLE_MARKER,
        }
    }

    /// First 8 characters of the logged value, used to disambiguate names
    pub fn short(&self) -> &str {
        let value = self.as_log_value();
        &value[..value.len().min(8)]
    }

    /// Content equality. An unavailable fingerprint never matches anything,
    /// including another unavailable one.
    pub fn matches(&self, other: &Fingerprint) -> bool {
        match (self, other) {
            (Fingerprint::Digest(a), Fingerprint::Digest(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_log_value())
    }
}

/// Compute the SHA-256 hex digest of a file, propagating I/O errors
pub fn try_digest_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Fingerprint a file. Read failures are logged and yield
/// [`Fingerprint::Unavailable`].
pub fn digest_file(path: &Path) -> Fingerprint {
    match try_digest_file(path) {
        Ok(hex) => {
            trace!(?path, hash = %hex, "Computed file hash");
            Fingerprint::Digest(hex)
        }
        Err(e) => {
            warn!(?path, error = %e, "Could not hash file");
            Fingerprint::Unavailable
        }
    }
}
