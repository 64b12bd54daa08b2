//! Fingerprint Cache
//!
//! Disk-backed memoization of generation-engine calls. Each call is
//! identified by a fingerprint: the SHA-256 of the canonical JSON of
//! `{kind, request}`, where objects are key-sorted recursively so logically
//! equal requests hash equally regardless of construction order.
//!
//! ## Layout
//!
//! `<cache_dir>/<fingerprint>.json` holding `{fingerprint, inputs, output}`.
//! Entries never expire and are never rewritten once stored.
//!
//! ## Failure policy
//!
//! A present but unreadable entry is a fatal [`NovelError::CacheCorrupt`];
//! it is never silently treated as a miss. Writes go through a temp file and
//! rename, so a crash cannot leave a half-written entry behind.

use std::future::Future;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::constants::storage::RECORD_EXTENSION;
use crate::storage::{read_if_exists, write_json_atomic};
use crate::types::{NovelError, Result};

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub cache_dir: PathBuf,
}

impl CacheConfig {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }
}

/// One stored call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: String,
    /// Canonical `{kind, request}` the fingerprint was computed from
    pub inputs: Value,
    pub output: Value,
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub entry_count: usize,
    pub total_size_bytes: u64,
}

// =============================================================================
// Fingerprinting
// =============================================================================

/// Rebuild `value` with every object's keys in sorted order.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

fn canonical_inputs(call_kind: &str, request: &Value) -> Value {
    canonicalize(&json!({ "kind": call_kind, "request": request }))
}

fn digest(inputs: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(inputs.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

// =============================================================================
// FingerprintCache
// =============================================================================

pub struct FingerprintCache {
    config: CacheConfig,
}

impl FingerprintCache {
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.config.cache_dir
    }

    /// Deterministic fingerprint of one call.
    pub fn fingerprint(call_kind: &str, request: &Value) -> String {
        digest(&canonical_inputs(call_kind, request))
    }

    fn entry_path(&self, fingerprint: &str) -> PathBuf {
        self.config
            .cache_dir
            .join(format!("{}.{}", fingerprint, RECORD_EXTENSION))
    }

    async fn load(&self, fingerprint: &str) -> Result<Option<CacheEntry>> {
        let path = self.entry_path(fingerprint);
        let Some(content) = read_if_exists(&path).await? else {
            return Ok(None);
        };

        let entry: CacheEntry =
            serde_json::from_str(&content).map_err(|e| NovelError::CacheCorrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if entry.fingerprint != fingerprint {
            return Err(NovelError::CacheCorrupt {
                path,
                reason: format!("entry claims fingerprint {}", entry.fingerprint),
            });
        }
        Ok(Some(entry))
    }

    /// Return the stored output for this call, or run `compute` once and store it.
    ///
    /// `compute` is not invoked on a hit. A failing `compute` stores nothing.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        call_kind: &str,
        request: &Value,
        compute: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let inputs = canonical_inputs(call_kind, request);
        let fingerprint = digest(&inputs);

        if let Some(entry) = self.load(&fingerprint).await? {
            debug!("Cache hit {} ({})", &fingerprint[..12], call_kind);
            return serde_json::from_value(entry.output).map_err(|e| NovelError::CacheCorrupt {
                path: self.entry_path(&fingerprint),
                reason: format!("stored output does not match {}: {}", call_kind, e),
            });
        }

        debug!("Cache miss {} ({})", &fingerprint[..12], call_kind);
        let output = compute().await?;

        let entry = CacheEntry {
            output: serde_json::to_value(&output)?,
            fingerprint,
            inputs,
        };
        write_json_atomic(&self.entry_path(&entry.fingerprint), &entry).await?;

        Ok(output)
    }

    /// Whether an entry exists for this call
    pub async fn contains(&self, call_kind: &str, request: &Value) -> Result<bool> {
        let path = self.entry_path(&Self::fingerprint(call_kind, request));
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn entry_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        let mut dir_entries = match tokio::fs::read_dir(&self.config.cache_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = dir_entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == RECORD_EXTENSION) {
                files.push(path);
            }
        }
        Ok(files)
    }

    /// Delete every entry. Returns the number removed.
    pub async fn clear(&self) -> Result<usize> {
        let files = self.entry_files().await?;
        for path in &files {
            tokio::fs::remove_file(path).await?;
        }

        info!("Cleared {} cache entries", files.len());
        Ok(files.len())
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        let mut stats = CacheStats::default();
        for path in self.entry_files().await? {
            stats.entry_count += 1;
            stats.total_size_bytes += tokio::fs::metadata(&path).await?.len();
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    fn cache_in(dir: &TempDir) -> FingerprintCache {
        FingerprintCache::new(CacheConfig::new(dir.path()))
    }

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let fp = FingerprintCache::fingerprint("chat", &json!({"messages": []}));
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_call_kind_changes_fingerprint() {
        let request = json!({"messages": [{"role": "user", "content": "hi"}]});
        assert_ne!(
            FingerprintCache::fingerprint("chat", &request),
            FingerprintCache::fingerprint("chat_structured:Title", &request)
        );
    }

    #[test]
    fn test_nested_key_order_ignored() {
        let a = json!({"outer": {"b": 1, "a": [{"y": 2, "x": 1}]}});
        let mut inner = Map::new();
        inner.insert("x".into(), json!(1));
        inner.insert("y".into(), json!(2));
        let mut outer = Map::new();
        outer.insert("a".into(), json!([Value::Object(inner)]));
        outer.insert("b".into(), json!(1));
        let b = json!({"outer": Value::Object(outer)});

        assert_eq!(
            FingerprintCache::fingerprint("chat", &a),
            FingerprintCache::fingerprint("chat", &b)
        );
    }

    #[tokio::test]
    async fn test_compute_runs_once_per_fingerprint() {
        let temp_dir = TempDir::new().unwrap();
        let cache = cache_in(&temp_dir);
        let calls = AtomicU32::new(0);
        let request = json!({"prompt": "title please"});

        for _ in 0..2 {
            let out: String = cache
                .get_or_compute("chat", &request, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("The Salt Road".to_string())
                })
                .await
                .unwrap();
            assert_eq!(out, "The Salt Road");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_entries_survive_new_instance() {
        let temp_dir = TempDir::new().unwrap();
        let request = json!({"prompt": "x"});

        let first: Vec<String> = cache_in(&temp_dir)
            .get_or_compute("facts", &request, || async { Ok(vec!["a".to_string()]) })
            .await
            .unwrap();

        let second: Vec<String> = cache_in(&temp_dir)
            .get_or_compute("facts", &request, || async {
                Err(NovelError::Config("compute must not run on a hit".into()))
            })
            .await
            .unwrap();

        assert_eq!(first, second);
        assert!(cache_in(&temp_dir).contains("facts", &request).await.unwrap());
    }

    #[tokio::test]
    async fn test_entry_layout() {
        let temp_dir = TempDir::new().unwrap();
        let cache = cache_in(&temp_dir);
        let request = json!({"b": 2, "a": 1});

        let _: u32 = cache
            .get_or_compute("count", &request, || async { Ok(7) })
            .await
            .unwrap();

        let fp = FingerprintCache::fingerprint("count", &request);
        let raw = std::fs::read_to_string(temp_dir.path().join(format!("{fp}.json"))).unwrap();
        let entry: CacheEntry = serde_json::from_str(&raw).unwrap();
        assert_eq!(entry.fingerprint, fp);
        assert_eq!(entry.inputs["kind"], "count");
        assert_eq!(entry.inputs["request"]["a"], 1);
        assert_eq!(entry.output, json!(7));
    }

    #[tokio::test]
    async fn test_failed_compute_stores_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let cache = cache_in(&temp_dir);
        let request = json!({"prompt": "x"});

        let result: Result<String> = cache
            .get_or_compute("chat", &request, || async {
                Err(NovelError::Config("engine down".into()))
            })
            .await;

        assert!(result.is_err());
        assert!(!cache.contains("chat", &request).await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let cache = cache_in(&temp_dir);
        let request = json!({"prompt": "x"});
        let fp = FingerprintCache::fingerprint("chat", &request);
        std::fs::write(temp_dir.path().join(format!("{fp}.json")), "{ not json").unwrap();

        let calls = AtomicU32::new(0);
        let result: Result<String> = cache
            .get_or_compute("chat", &request, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("fresh".to_string())
            })
            .await;

        assert!(matches!(result, Err(NovelError::CacheCorrupt { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_clear_and_stats() {
        let temp_dir = TempDir::new().unwrap();
        let cache = cache_in(&temp_dir);

        for i in 0..3 {
            let _: u32 = cache
                .get_or_compute("n", &json!({ "i": i }), || async move { Ok(i) })
                .await
                .unwrap();
        }

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entry_count, 3);
        assert!(stats.total_size_bytes > 0);

        assert_eq!(cache.clear().await.unwrap(), 3);
        assert_eq!(cache.stats().await.unwrap().entry_count, 0);
    }

    #[tokio::test]
    async fn test_clear_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FingerprintCache::new(CacheConfig::new(temp_dir.path().join("never")));
        assert_eq!(cache.clear().await.unwrap(), 0);
    }
}
