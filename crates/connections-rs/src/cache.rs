//! Memoization of oracle responses.
//!
//! The solver consults a [`ResponseCache`] before every oracle call, keyed on
//! `(model, prompt template identity, items, rejected guesses)`. A hit
//! short-circuits the call entirely, which makes repeated runs of the same
//! puzzle with the same seed free and reproducible.
//!
//! | Implementation | Use case |
//! |----------------|----------|
//! | [`DiskCache`] | Default for the binary; survives across runs |
//! | [`MemoryCache`] | Tests and single-process reuse |
//! | [`NoCache`] | `--no-cache`; every call goes to the oracle |

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory name used under the system temp dir by [`DiskCache::in_temp_dir`].
pub const DEFAULT_CACHE_DIR_NAME: &str = "connections_cache";

/// Key→value store for serialized oracle responses.
pub trait ResponseCache {
    /// Look up a cached value. Returns `None` on a miss.
    fn get(&mut self, key: &str) -> Option<String>;

    /// Store a value, replacing any previous entry for `key`.
    fn put(&mut self, key: &str, value: String);
}

/// Build the cache key for one oracle call.
///
/// The key covers every argument that influences the oracle's answer:
/// the model, the prompt template, the item order, and the rejected
/// guesses. Rendered as 16 lowercase hex digits.
pub fn cache_key<S: AsRef<str>>(
    model: &str,
    template_id: &str,
    items: &[S],
    rejected: &[Vec<S>],
) -> String {
    let canonical = serde_json::json!({
        "model": model,
        "template": template_id,
        "items": items.iter().map(|i| i.as_ref()).collect::<Vec<&str>>(),
        "rejected": rejected
            .iter()
            .map(|g| g.iter().map(|i| i.as_ref()).collect::<Vec<&str>>())
            .collect::<Vec<_>>(),
    });
    format!("{:016x}", fnv1a(canonical.to_string().as_bytes()))
}

/// 64-bit FNV-1a hash.
pub(crate) fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

// ── NoCache ────────────────────────────────────────────────────────

/// A cache that never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl ResponseCache for NoCache {
    fn get(&mut self, _key: &str) -> Option<String> {
        None
    }

    fn put(&mut self, _key: &str, _value: String) {}
}

// ── MemoryCache ────────────────────────────────────────────────────

/// In-process cache with hit/miss counters.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, String>,
    hits: u64,
    misses: u64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Hit rate as a fraction (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl ResponseCache for MemoryCache {
    fn get(&mut self, key: &str) -> Option<String> {
        match self.entries.get(key) {
            Some(value) => {
                self.hits += 1;
                Some(value.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    fn put(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }
}

// ── DiskCache ──────────────────────────────────────────────────────

/// On-disk form of a cache entry.
#[derive(Serialize, Deserialize, Debug)]
struct DiskEntry {
    key: String,
    value: String,
    /// RFC 3339 timestamp of when the entry was written.
    cached_at: String,
}

/// One JSON file per key under a directory.
///
/// Directory layout:
/// ```text
/// cache_dir/
///   3f9a0c1be27d4410.json
///   9b1e77c05a2f0d3e.json
/// ```
///
/// I/O failures never propagate: an unreadable entry is a miss and a
/// failed write is logged and dropped.
#[derive(Debug)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    /// Open (creating if needed) a cache rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, String> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| format!("failed to create cache dir {}: {e}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Open the default cache under the system temp directory.
    pub fn in_temp_dir() -> Result<Self, String> {
        Self::new(std::env::temp_dir().join(DEFAULT_CACHE_DIR_NAME))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn read_entry(&self, key: &str) -> Result<Option<DiskEntry>, String> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        let entry: DiskEntry = serde_json::from_str(&content)
            .map_err(|e| format!("failed to parse {}: {e}", path.display()))?;
        Ok(Some(entry))
    }

    /// Atomic write: serialize to a temp file, then rename into place.
    fn write_entry(&self, entry: &DiskEntry) -> Result<(), String> {
        let final_path = self.entry_path(&entry.key);
        let tmp_path = self.dir.join(format!(".{}.json.tmp", entry.key));
        let json = serde_json::to_string_pretty(entry)
            .map_err(|e| format!("failed to serialize cache entry: {e}"))?;
        std::fs::write(&tmp_path, json)
            .map_err(|e| format!("failed to write {}: {e}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &final_path)
            .map_err(|e| format!("failed to rename {}: {e}", tmp_path.display()))?;
        Ok(())
    }
}

impl ResponseCache for DiskCache {
    fn get(&mut self, key: &str) -> Option<String> {
        match self.read_entry(key) {
            Ok(Some(entry)) if entry.key == key => {
                debug!("cache hit {key} (written {})", entry.cached_at);
                Some(entry.value)
            }
            Ok(Some(entry)) => {
                warn!("cache entry {key} holds key {}; ignoring", entry.key);
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Treating unreadable cache entry as a miss: {e}");
                None
            }
        }
    }

    fn put(&mut self, key: &str, value: String) {
        let entry = DiskEntry {
            key: key.to_string(),
            value,
            cached_at: chrono::Utc::now().to_rfc3339(),
        };
        if let Err(e) = self.write_entry(&entry) {
            warn!("Failed to store cache entry: {e}");
        }
    }
}
