//! Metadata inspection context.
//!
//! Mimetype classification, host identity, and content hashing. The
//! classifier handle and the cached host name live on an [`Inspector`]
//! value built once at startup and threaded through the populate
//! pipeline; nothing here is process-global.

use std::io::{self, Read};
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha1::{Digest, Sha1};

use crate::error::EntryError;

/// Reported host name when the system refuses to provide one.
pub const UNKNOWN_HOST: &str = "unknown";

/// Classification and host identity for metadata capture.
#[derive(Debug, Clone)]
pub struct Inspector {
    hostname: String,
}

impl Inspector {
    /// Captures the host name once. Detection failure falls back to
    /// [`UNKNOWN_HOST`] rather than failing construction.
    pub fn new() -> Inspector {
        let hostname = hostname::get()
            .ok()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN_HOST.to_string());
        Inspector { hostname }
    }

    /// Cached host name for attribution.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Mimetype for a path. A pure lookup keyed by the path name: the
    /// same path always classifies identically.
    pub fn classify(&self, path: &Path) -> Result<String, EntryError> {
        mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string())
            .ok_or_else(|| EntryError::UnknownMimetype(path.to_path_buf()))
    }
}

impl Default for Inspector {
    fn default() -> Self {
        Inspector::new()
    }
}

/// Streams a reader through SHA-1 and returns the base64 digest. Memory
/// use is bounded by the copy buffer regardless of input size.
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha1::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(STANDARD.encode(hasher.finalize()))
}

/// Digest of an in-memory byte slice.
pub fn hash_bytes(data: &[u8]) -> String {
    STANDARD.encode(Sha1::digest(data))
}
