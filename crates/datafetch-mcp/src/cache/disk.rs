//! Disk-backed cache storing one Arrow IPC file per fingerprint

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use arrow::compute::concat_batches;
use arrow::error::ArrowError;
use arrow::ipc::reader::FileReader;
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;

use super::error::{CacheError, CacheResult};
use super::fingerprint::Fingerprint;
use super::provider::{CacheStats, CacheStore};

/// File extension of cache entries
pub const ENTRY_EXTENSION: &str = "arrow";

/// Disambiguates temp files written concurrently by this process
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Default)]
struct DiskStats {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    skipped_writes: AtomicU64,
    errors: AtomicU64,
}

/// Disk cache keyed by fingerprint
///
/// The file's modification time is the only metadata: there is no index, and
/// staleness is judged at lookup time against the TTL the caller passes in.
/// Writers race without locking; each write lands in a unique temp file that
/// is renamed over the entry, so readers never observe a half-written file
/// and the last writer wins.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: Arc<PathBuf>,
    stats: Arc<DiskStats>,
}

impl DiskCache {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
            stats: Arc::new(DiskStats::default()),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the entry for `fingerprint`
    #[must_use]
    pub fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.root
            .join(format!("{}.{ENTRY_EXTENSION}", fingerprint.as_str()))
    }
}

fn corrupt(path: &Path, err: &ArrowError) -> CacheError {
    CacheError::Corrupt {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

fn entry_age(metadata: &fs::Metadata) -> Option<Duration> {
    let modified = metadata.modified().ok()?;
    // An mtime in the future counts as freshly written.
    Some(
        SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO),
    )
}

fn read_entry(path: &Path, ttl: Duration) -> CacheResult<Option<RecordBatch>> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    match entry_age(&metadata) {
        Some(age) if age < ttl => {}
        _ => return Ok(None),
    }

    let file = File::open(path)?;
    let reader = FileReader::try_new(BufReader::new(file), None).map_err(|e| corrupt(path, &e))?;
    let schema = reader.schema();
    let batches = reader
        .collect::<Result<Vec<_>, ArrowError>>()
        .map_err(|e| corrupt(path, &e))?;
    let batch = concat_batches(&schema, &batches).map_err(|e| corrupt(path, &e))?;

    Ok(Some(batch))
}

fn write_ipc(path: &Path, batch: &RecordBatch) -> CacheResult<()> {
    let file = File::create(path)?;
    let mut writer = FileWriter::try_new(BufWriter::new(file), batch.schema().as_ref())
        .map_err(|e| CacheError::Serialization(e.to_string()))?;
    writer
        .write(batch)
        .map_err(|e| CacheError::Serialization(e.to_string()))?;
    let mut inner = writer
        .into_inner()
        .map_err(|e| CacheError::Serialization(e.to_string()))?;
    inner.flush()?;
    Ok(())
}

fn write_entry(root: &Path, path: &Path, batch: &RecordBatch) -> CacheResult<()> {
    fs::create_dir_all(root)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = root.join(format!(
        ".{file_name}.{}.{}.tmp",
        std::process::id(),
        TEMP_SEQ.fetch_add(1, Ordering::Relaxed)
    ));

    if let Err(e) = write_ipc(&temp, batch) {
        let _ = fs::remove_file(&temp);
        return Err(e);
    }

    fs::rename(&temp, path).inspect_err(|_| {
        let _ = fs::remove_file(&temp);
    })?;
    Ok(())
}

fn remove_entry(path: &Path) -> CacheResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn purge_entries(root: &Path, max_age: Duration) -> CacheResult<u64> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut deleted = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
            continue;
        }

        let expired = entry
            .metadata()
            .ok()
            .and_then(|m| entry_age(&m))
            .is_some_and(|age| age > max_age);
        if !expired {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                deleted += 1;
                tracing::debug!(cache.path = %path.display(), "Deleted expired cache entry");
            }
            Err(e) => {
                tracing::warn!(
                    cache.path = %path.display(),
                    error = %e,
                    "Failed to delete cache entry"
                );
            }
        }
    }

    Ok(deleted)
}

#[async_trait]
impl CacheStore for DiskCache {
    async fn lookup(
        &self,
        fingerprint: &Fingerprint,
        ttl: Duration,
    ) -> CacheResult<Option<RecordBatch>> {
        let path = self.entry_path(fingerprint);
        let result = tokio::task::spawn_blocking(move || read_entry(&path, ttl)).await?;

        let counter = match &result {
            Ok(Some(_)) => &self.stats.hits,
            Ok(None) => &self.stats.misses,
            Err(_) => &self.stats.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        result
    }

    async fn store(&self, fingerprint: &Fingerprint, batch: &RecordBatch) -> CacheResult<bool> {
        if batch.num_rows() == 0 {
            self.stats.skipped_writes.fetch_add(1, Ordering::Relaxed);
            return Ok(false);
        }

        let root = Arc::clone(&self.root);
        let path = self.entry_path(fingerprint);
        let batch = batch.clone();
        let result =
            tokio::task::spawn_blocking(move || write_entry(&root, &path, &batch)).await?;

        match result {
            Ok(()) => {
                self.stats.writes.fetch_add(1, Ordering::Relaxed);
                Ok(true)
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    async fn remove(&self, fingerprint: &Fingerprint) -> CacheResult<bool> {
        let path = self.entry_path(fingerprint);
        tokio::task::spawn_blocking(move || remove_entry(&path)).await?
    }

    async fn purge_older_than(&self, age: Duration) -> CacheResult<u64> {
        let root = Arc::clone(&self.root);
        tokio::task::spawn_blocking(move || purge_entries(&root, age)).await?
    }

    async fn health_check(&self) -> CacheResult<()> {
        let root = Arc::clone(&self.root);
        tokio::task::spawn_blocking(move || {
            fs::create_dir_all(root.as_path())?;
            if fs::metadata(root.as_path())?.is_dir() {
                Ok(())
            } else {
                Err(CacheError::Io(format!(
                    "cache root {} is not a directory",
                    root.display()
                )))
            }
        })
        .await?
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            writes: self.stats.writes.load(Ordering::Relaxed),
            skipped_writes: self.stats.skipped_writes.load(Ordering::Relaxed),
            errors: self.stats.errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Float64Array, Int64Array, StringArray, TimestampSecondArray};
    use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
    use tempfile::TempDir;

    use super::*;
    use crate::types::Params;

    const DAY: Duration = Duration::from_secs(86_400);

    fn sample_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("date", DataType::Timestamp(TimeUnit::Second, None), true),
            Field::new("symbol", DataType::Utf8, false),
            Field::new("close", DataType::Float64, true),
            Field::new("volume", DataType::Int64, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(TimestampSecondArray::from(vec![
                    Some(1_704_153_600),
                    Some(1_704_240_000),
                    None,
                ])),
                Arc::new(StringArray::from(vec!["000001", "000001", "000001"])),
                Arc::new(Float64Array::from(vec![Some(10.5), Some(f64::NAN), None])),
                Arc::new(Int64Array::from(vec![Some(1_000), None, Some(3_000)])),
            ],
        )
        .unwrap()
    }

    fn fingerprint(symbol: &str) -> Fingerprint {
        let mut params = Params::new();
        params.insert("symbol".to_string(), serde_json::json!(symbol));
        Fingerprint::new("stock_zh_a_hist", &params)
    }

    fn set_age(path: &Path, age: Duration) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[tokio::test]
    async fn test_lookup_missing_is_miss() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path());
        let result = cache.lookup(&fingerprint("000001"), DAY).await.unwrap();
        assert!(result.is_none());
        assert_eq!(cache.stats().await.misses, 1);
    }

    #[tokio::test]
    async fn test_store_then_lookup_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path());
        let fp = fingerprint("000001");
        let batch = sample_batch();

        assert!(cache.store(&fp, &batch).await.unwrap());
        assert!(cache.entry_path(&fp).exists());

        let cached = cache.lookup(&fp, DAY).await.unwrap().unwrap();
        assert_eq!(cached.schema(), batch.schema());
        assert_eq!(cached.num_rows(), 3);
        assert_eq!(&cached.columns()[0], &batch.columns()[0]);
        assert_eq!(&cached.columns()[1], &batch.columns()[1]);
        assert_eq!(&cached.columns()[3], &batch.columns()[3]);

        let stats = cache.stats().await;
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_store_creates_root_on_demand() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested").join("system");
        let cache = DiskCache::new(&root);
        assert!(!root.exists());

        cache.store(&fingerprint("a"), &sample_batch()).await.unwrap();
        assert!(root.is_dir());
    }

    #[tokio::test]
    async fn test_empty_batch_is_not_stored() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path());
        let fp = fingerprint("empty");
        let empty = RecordBatch::new_empty(sample_batch().schema());

        assert!(!cache.store(&fp, &empty).await.unwrap());
        assert!(!cache.entry_path(&fp).exists());
        assert_eq!(cache.stats().await.skipped_writes, 1);
    }

    #[tokio::test]
    async fn test_stale_entry_is_miss() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path());
        let fp = fingerprint("000001");
        cache.store(&fp, &sample_batch()).await.unwrap();
        set_age(&cache.entry_path(&fp), 2 * DAY);

        assert!(cache.lookup(&fp, DAY).await.unwrap().is_none());
        assert!(cache.lookup(&fp, 30 * DAY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_entry() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path());
        let fp = fingerprint("000001");
        let first = sample_batch();
        cache.store(&fp, &first).await.unwrap();

        let second = first.slice(0, 1);
        cache.store(&fp, &second).await.unwrap();

        let cached = cache.lookup(&fp, DAY).await.unwrap().unwrap();
        assert_eq!(cached.num_rows(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_error() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path());
        let fp = fingerprint("000001");
        fs::write(cache.entry_path(&fp), b"definitely not arrow").unwrap();

        let err = cache.lookup(&fp, DAY).await.unwrap_err();
        assert!(err.is_corrupt());
        assert_eq!(cache.stats().await.errors, 1);
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path());
        cache.store(&fingerprint("a"), &sample_batch()).await.unwrap();
        cache.store(&fingerprint("b"), &sample_batch()).await.unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| n.ends_with(".arrow")));
    }

    #[tokio::test]
    async fn test_remove_entry() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path());
        let fp = fingerprint("000001");
        cache.store(&fp, &sample_batch()).await.unwrap();

        assert!(cache.remove(&fp).await.unwrap());
        assert!(!cache.remove(&fp).await.unwrap());
        assert!(cache.lookup(&fp, DAY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_older_than() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path());
        let old = fingerprint("old");
        let fresh = fingerprint("fresh");
        cache.store(&old, &sample_batch()).await.unwrap();
        cache.store(&fresh, &sample_batch()).await.unwrap();
        set_age(&cache.entry_path(&old), 40 * DAY);
        fs::write(dir.path().join("notes.txt"), b"keep me").unwrap();

        let deleted = cache.purge_older_than(30 * DAY).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(!cache.entry_path(&old).exists());
        assert!(cache.entry_path(&fresh).exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_purge_missing_root() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path().join("never-created"));
        assert_eq!(cache.purge_older_than(DAY).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_health_check_creates_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("cache");
        let cache = DiskCache::new(&root);
        cache.health_check().await.unwrap();
        assert!(root.is_dir());
    }

    #[tokio::test]
    async fn test_health_check_fails_for_file_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("occupied");
        fs::write(&root, b"x").unwrap();
        let cache = DiskCache::new(&root);
        assert!(cache.health_check().await.is_err());
    }

    #[test]
    fn test_entry_path_uses_fingerprint() {
        let cache = DiskCache::new("/var/cache/datafetch");
        let fp = fingerprint("000001");
        let path = cache.entry_path(&fp);
        assert!(path.starts_with("/var/cache/datafetch"));
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            format!("{fp}.arrow")
        );
    }
}
