//! Generate-on-miss disk cache.
//!
//! Keys are relative paths under an explicit root; `{root}/{key}.bin` holds a
//! prefixed, versioned bitcode payload. Single writer, no eviction.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::constants::cache::{
    BITCODE_PREFIX, CACHE_EXTENSION, CACHE_RECORD_VERSION, DEFAULT_CACHE_DIR,
};
use crate::errors::PrepError;
use crate::transport::fs::ensure_parent_dir;

/// Disk cache rooted at an explicit directory.
#[derive(Clone, Debug)]
pub struct DiskCache {
    root: PathBuf,
}

impl Default for DiskCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DIR)
    }
}

impl DiskCache {
    /// Create a cache rooted at `root`; nothing is created until the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding cache entries.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.{CACHE_EXTENSION}"))
    }

    /// Whether an entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    /// Decode the entry for `key`, if present.
    pub fn get<T>(&self, key: &str) -> Result<Option<T>, PrepError>
    where
        T: for<'de> bitcode::Decode<'de>,
    {
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        decode_entry(key, &bytes).map(Some)
    }

    /// Return the entry for `key`, generating and persisting it on a miss.
    ///
    /// A miss without `generate` is `MissingGenerator`.
    pub fn load<T, F>(&self, key: &str, generate: Option<F>) -> Result<T, PrepError>
    where
        T: bitcode::Encode + for<'de> bitcode::Decode<'de>,
        F: FnOnce() -> Result<T, PrepError>,
    {
        if let Some(value) = self.get(key)? {
            debug!(key, "cache hit");
            return Ok(value);
        }
        let generate = generate.ok_or_else(|| PrepError::MissingGenerator {
            key: key.to_string(),
        })?;
        debug!(key, "cache miss; generating");
        let value = generate()?;
        self.save(&value, key)?;
        Ok(value)
    }

    /// [`DiskCache::load`] with a required generator.
    pub fn load_or_generate<T, F>(&self, key: &str, generate: F) -> Result<T, PrepError>
    where
        T: bitcode::Encode + for<'de> bitcode::Decode<'de>,
        F: FnOnce() -> Result<T, PrepError>,
    {
        self.load(key, Some(generate))
    }

    /// Write `value` under `key`, replacing any existing entry.
    pub fn save<T>(&self, value: &T, key: &str) -> Result<(), PrepError>
    where
        T: bitcode::Encode + ?Sized,
    {
        let path = self.path_for(key);
        ensure_parent_dir(&path)?;
        fs::write(&path, encode_entry(value))?;
        Ok(())
    }
}

fn encode_entry<T: bitcode::Encode + ?Sized>(value: &T) -> Vec<u8> {
    let payload = bitcode::encode(value);
    let mut out = Vec::with_capacity(payload.len() + 2);
    out.push(BITCODE_PREFIX);
    out.push(CACHE_RECORD_VERSION);
    out.extend_from_slice(&payload);
    out
}

fn decode_entry<T>(key: &str, bytes: &[u8]) -> Result<T, PrepError>
where
    T: for<'de> bitcode::Decode<'de>,
{
    let corrupt = |reason: String| PrepError::Cache {
        key: key.to_string(),
        reason,
    };
    match bytes {
        [BITCODE_PREFIX, CACHE_RECORD_VERSION, payload @ ..] => {
            bitcode::decode(payload).map_err(|err| corrupt(format!("decode failed: {err}")))
        }
        [BITCODE_PREFIX, version, ..] => Err(corrupt(format!(
            "version mismatch (expected {CACHE_RECORD_VERSION}, found {version})"
        ))),
        _ => Err(corrupt("missing payload header".to_string())),
    }
}
