use crate::error::{Result, WavectlError};
use blake3::Hasher;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Blake3 hex digest of a file's contents. This is the cache key the
/// verifier uses to decide whether a stored result is still current.
pub fn content_hash(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(WavectlError::FileNotFound(path.display().to_string()));
    }
    let mut hasher = Hasher::new();
    let mut file = File::open(path)?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Blake3 hex digest of a string. Used to derive stable cache file names
/// from absolute paths.
pub fn str_hash(s: &str) -> String {
    blake3::hash(s.as_bytes()).to_hex().to_string()
}
