use super::{verify_claims, Claim, VerificationResult};
use crate::hash::{content_hash, str_hash};
use crate::io::atomic_write;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

// ---------------------------------------------------------------------------
// CacheEntry / ExportCache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Content hash of the file at verification time. The entry is only
    /// valid while the live file still hashes to this value.
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    /// The claims the stored result was computed against. A lookup with a
    /// different claim set is a miss even when the hash matches.
    #[serde(default)]
    pub claims: Vec<Claim>,
    pub result: VerificationResult,
}

/// Keyed by absolute file path. Adapters degrade internally: a corrupt
/// entry reads as a miss, a failed write is a warning — cache trouble
/// never fails a verification call.
pub trait ExportCache {
    fn get(&self, key: &str) -> Option<CacheEntry>;
    fn set(&self, key: &str, entry: CacheEntry);
    fn remove(&self, key: &str);
    fn clear(&self);
}

// ---------------------------------------------------------------------------
// verify_with_cache()
// ---------------------------------------------------------------------------

/// `verify_claims` wrapped in a content-hash cache. A hit whose stored
/// hash matches the live file and whose stored claims equal `expected`
/// returns the stored result without re-parsing; anything else
/// recomputes and overwrites the entry.
pub fn verify_with_cache(
    path: &Path,
    expected: &[Claim],
    cache: &dyn ExportCache,
) -> VerificationResult {
    let key = cache_key(path);
    let hash = match content_hash(path) {
        Ok(h) => h,
        Err(e) => {
            return VerificationResult {
                file: path.display().to_string(),
                verified: false,
                matches: Vec::new(),
                missing: Vec::new(),
                extra: Vec::new(),
                errors: vec![e.to_string()],
            }
        }
    };

    if let Some(entry) = cache.get(&key) {
        if entry.hash == hash && entry.claims == expected {
            return entry.result;
        }
    }

    let result = verify_claims(path, expected);
    cache.set(
        &key,
        CacheEntry {
            hash,
            timestamp: Utc::now(),
            claims: expected.to_vec(),
            result: result.clone(),
        },
    );
    result
}

/// Absolute-path cache key; falls back to the given path when it cannot
/// be canonicalized (e.g. the file vanished mid-call).
pub fn cache_key(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

// ---------------------------------------------------------------------------
// MemoryCache
// ---------------------------------------------------------------------------

/// In-memory adapter, used in tests and embedders that don't want disk.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExportCache for MemoryCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, entry: CacheEntry) {
        if let Ok(mut map) = self.entries.lock() {
            map.insert(key.to_string(), entry);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut map) = self.entries.lock() {
            map.remove(key);
        }
    }

    fn clear(&self) {
        if let Ok(mut map) = self.entries.lock() {
            map.clear();
        }
    }
}

// ---------------------------------------------------------------------------
// FsCache
// ---------------------------------------------------------------------------

pub const CACHE_DIR: &str = ".wavectl/cache";

/// Filesystem adapter: one JSON record per blake3(key) under
/// `<root>/.wavectl/cache/`. The directory is advisory and safe to
/// delete wholesale at any time.
pub struct FsCache {
    dir: PathBuf,
}

impl FsCache {
    pub fn new(root: &Path) -> Self {
        Self {
            dir: root.join(CACHE_DIR),
        }
    }

    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", str_hash(key)))
    }
}

impl ExportCache for FsCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        let path = self.entry_path(key);
        if !path.exists() {
            return None;
        }
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!("unreadable cache entry {}: {e}", path.display());
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("malformed cache entry {}: {e}", path.display());
                None
            }
        }
    }

    fn set(&self, key: &str, entry: CacheEntry) {
        let path = self.entry_path(key);
        let data = match serde_json::to_vec_pretty(&entry) {
            Ok(d) => d,
            Err(e) => {
                warn!("failed to encode cache entry for {key}: {e}");
                return;
            }
        };
        if let Err(e) = atomic_write(&path, &data) {
            warn!("failed to write cache entry {}: {e}", path.display());
        }
    }

    fn remove(&self, key: &str) {
        let path = self.entry_path(key);
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("failed to remove cache entry {}: {e}", path.display());
            }
        }
    }

    fn clear(&self) {
        if self.dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.dir) {
                warn!("failed to clear cache dir {}: {e}", self.dir.display());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeclKind;
    use tempfile::TempDir;

    fn claims() -> Vec<Claim> {
        vec![Claim {
            name: "f".to_string(),
            kind: DeclKind::Function,
        }]
    }

    fn write_source(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("mod.ts");
        std::fs::write(&path, "export function f(): void {}\n").unwrap();
        path
    }

    #[test]
    fn second_call_uses_cache_without_reparsing() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir);
        let cache = MemoryCache::new();

        let first = verify_with_cache(&path, &claims(), &cache);
        assert!(first.verified);
        assert_eq!(cache.len(), 1);

        // Doctor the stored result; if the second call re-parsed, the
        // marker would disappear.
        let key = cache_key(&path);
        let mut entry = cache.get(&key).unwrap();
        entry.result.errors.push("stale-marker".to_string());
        cache.set(&key, entry);

        let second = verify_with_cache(&path, &claims(), &cache);
        assert_eq!(second.errors, vec!["stale-marker"]);
    }

    #[test]
    fn different_claims_bypass_stored_result() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir);
        let cache = MemoryCache::new();

        let first = verify_with_cache(&path, &claims(), &cache);
        assert!(first.verified);

        // Same file, different expectation: the stored result is for
        // another claim set and must not be returned.
        let other = vec![Claim {
            name: "g".to_string(),
            kind: DeclKind::Function,
        }];
        let second = verify_with_cache(&path, &other, &cache);
        assert!(!second.verified);
        assert_eq!(second.missing, vec!["g"]);

        // The entry now belongs to the new claim set.
        let entry = cache.get(&cache_key(&path)).unwrap();
        assert_eq!(entry.claims, other);
    }

    #[test]
    fn hash_mismatch_recomputes_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir);
        let cache = MemoryCache::new();

        verify_with_cache(&path, &claims(), &cache);

        // Content change invalidates the stored hash.
        std::fs::write(&path, "export function f(): number { return 1; }\n").unwrap();
        let result = verify_with_cache(&path, &claims(), &cache);
        assert!(result.verified);

        let entry = cache.get(&cache_key(&path)).unwrap();
        assert_eq!(entry.hash, content_hash(&path).unwrap());
    }

    #[test]
    fn fs_cache_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir);
        let cache = FsCache::new(dir.path());

        let first = verify_with_cache(&path, &claims(), &cache);
        assert!(first.verified);
        assert!(cache.entry_path(&cache_key(&path)).exists());

        let second = verify_with_cache(&path, &claims(), &cache);
        assert!(second.verified);
    }

    #[test]
    fn corrupt_fs_entry_degrades_to_recompute() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir);
        let cache = FsCache::new(dir.path());

        let entry_path = cache.entry_path(&cache_key(&path));
        crate::io::atomic_write(&entry_path, b"{ not json").unwrap();

        let result = verify_with_cache(&path, &claims(), &cache);
        assert!(result.verified, "corruption must not fail the call");
    }

    #[test]
    fn unwritable_cache_dir_degrades_to_uncached_result() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir);

        // A plain file squatting on the cache directory path makes every
        // entry write fail.
        std::fs::create_dir_all(dir.path().join(".wavectl")).unwrap();
        std::fs::write(dir.path().join(CACHE_DIR), b"not a directory").unwrap();
        let cache = FsCache::new(dir.path());

        let first = verify_with_cache(&path, &claims(), &cache);
        assert!(first.verified, "a failed cache write must not fail the call");
        assert!(!cache.entry_path(&cache_key(&path)).exists());

        // Every call recomputes; the outcome stays correct.
        let second = verify_with_cache(&path, &claims(), &cache);
        assert!(second.verified);
    }

    #[test]
    fn clear_removes_everything() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir);
        let cache = FsCache::new(dir.path());

        verify_with_cache(&path, &claims(), &cache);
        cache.clear();
        assert!(!dir.path().join(CACHE_DIR).exists());
    }

    #[test]
    fn remove_targets_one_entry() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir);
        let other = dir.path().join("other.ts");
        std::fs::write(&other, "export function g(): void {}\n").unwrap();
        let cache = FsCache::new(dir.path());

        verify_with_cache(&path, &claims(), &cache);
        verify_with_cache(&other, &[], &cache);

        cache.remove(&cache_key(&path));
        assert!(!cache.entry_path(&cache_key(&path)).exists());
        assert!(cache.entry_path(&cache_key(&other)).exists());
    }

    #[test]
    fn missing_file_reports_without_caching() {
        let cache = MemoryCache::new();
        let result = verify_with_cache(Path::new("/nonexistent.ts"), &claims(), &cache);
        assert!(!result.verified);
        assert!(cache.is_empty());
    }
}
