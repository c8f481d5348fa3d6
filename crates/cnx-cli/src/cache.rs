//! The `.cnx/` content-addressed symbol cache.
//!
//! Keys are content hashes of the header text; entries are the extracted
//! symbol sets serialized as JSON. The format is private: missing, stale
//! or corrupt entries are all just cache misses.

use cnx_parser::cheader::HeaderSymbols;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

pub const CACHE_DIR_NAME: &str = ".cnx";

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    hash: u64,
    symbols: HeaderSymbols,
}

#[derive(Debug)]
pub struct SymbolCache {
    dir: PathBuf,
    enabled: bool,
}

impl SymbolCache {
    /// A cache rooted at `{project_root}/.cnx`. Disabled caches read and
    /// write nothing.
    pub fn new(project_root: &Path, enabled: bool) -> Self {
        SymbolCache {
            dir: project_root.join(CACHE_DIR_NAME),
            enabled,
        }
    }

    pub fn content_hash(content: &str) -> u64 {
        let mut hasher = FxHasher::default();
        content.hash(&mut hasher);
        hasher.finish()
    }

    fn entry_path(&self, hash: u64) -> PathBuf {
        self.dir.join(format!("{hash:016x}.json"))
    }

    /// Look up the extracted symbols for header text. Stale entries are
    /// impossible by construction (the hash IS the key); corrupt entries
    /// read as misses.
    pub fn load(&self, content: &str) -> Option<HeaderSymbols> {
        if !self.enabled {
            return None;
        }
        let hash = Self::content_hash(content);
        let text = std::fs::read_to_string(self.entry_path(hash)).ok()?;
        let entry: CacheEntry = serde_json::from_str(&text).ok()?;
        if entry.hash != hash {
            return None;
        }
        Some(entry.symbols)
    }

    /// Store extracted symbols. Failures are silent: the cache is an
    /// optimization, not a dependency.
    pub fn store(&self, content: &str, symbols: &HeaderSymbols) {
        if !self.enabled {
            return;
        }
        let hash = Self::content_hash(content);
        if std::fs::create_dir_all(&self.dir).is_err() {
            return;
        }
        let entry = CacheEntry {
            hash,
            symbols: symbols.clone(),
        };
        if let Ok(json) = serde_json::to_string(&entry) {
            let _ = std::fs::write(self.entry_path(hash), json);
        }
    }
}
