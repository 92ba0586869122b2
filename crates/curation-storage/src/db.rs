//! Shared RocksDB handle for the curation stores.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rocksdb::{Cache, ColumnFamily, Direction, IteratorMode, Options, DB};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use crate::column_families::{get_column_family_descriptors, CURATION_CFS};
use crate::error::{StorageError, StorageResult};
use crate::serialization::deserialize_with_version;

/// Configuration for [`CurationDb`].
#[derive(Debug, Clone)]
pub struct CurationDbConfig {
    /// Block cache size in bytes (default: 64MB).
    pub block_cache_size: usize,
    /// Maximum number of open files (default: 500).
    pub max_open_files: i32,
    /// Enable WAL (write-ahead log) for durability (default: true).
    pub enable_wal: bool,
    /// Create database if it doesn't exist (default: true).
    pub create_if_missing: bool,
}

impl Default for CurationDbConfig {
    fn default() -> Self {
        Self {
            block_cache_size: 64 * 1024 * 1024,
            max_open_files: 500,
            enable_wal: true,
            create_if_missing: true,
        }
    }
}

/// One RocksDB instance holding embeddings, result records and result heads.
///
/// `DB` is internally thread-safe; share it as `Arc<CurationDb>` between the
/// embedding store and the result store.
pub struct CurationDb {
    pub(crate) db: DB,
    #[allow(dead_code)]
    cache: Cache,
    path: PathBuf,
}

impl CurationDb {
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        Self::open_with_config(path, CurationDbConfig::default())
    }

    pub fn open_with_config<P: AsRef<Path>>(
        path: P,
        config: CurationDbConfig,
    ) -> StorageResult<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let path_str = path_buf.to_string_lossy().to_string();

        let cache = Cache::new_lru_cache(config.block_cache_size);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(config.create_if_missing);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_open_files(config.max_open_files);
        if !config.enable_wal {
            db_opts.set_manual_wal_flush(true);
        }

        let db = DB::open_cf_descriptors(&db_opts, &path_str, get_column_family_descriptors(&cache))
            .map_err(|e| {
                error!(path = %path_str, error = %e, "Failed to open RocksDB");
                StorageError::OpenFailed {
                    path: path_str.clone(),
                    message: e.to_string(),
                }
            })?;

        info!(path = %path_str, column_families = CURATION_CFS.len(), "Opened curation database");
        Ok(Self {
            db,
            cache,
            path: path_buf,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn get_cf(&self, name: &str) -> StorageResult<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound {
                name: name.to_string(),
            })
    }

    /// Decode every value whose key starts with `prefix`, in key order.
    pub(crate) fn scan_prefix<T: DeserializeOwned>(
        &self,
        cf_name: &'static str,
        prefix: &[u8],
    ) -> StorageResult<Vec<T>> {
        let cf = self.get_cf(cf_name)?;
        let mut values = Vec::new();
        for item in self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, value) = item.map_err(|e| StorageError::rocksdb_op("iterate", cf_name, None, e))?;
            if !key.starts_with(prefix) {
                break;
            }
            values.push(deserialize_with_version(&value, cf_name, &key)?);
        }
        debug!(cf = cf_name, count = values.len(), "Prefix scan");
        Ok(values)
    }

    /// Whether any key starts with `prefix`.
    pub(crate) fn has_prefix(&self, cf_name: &'static str, prefix: &[u8]) -> StorageResult<bool> {
        let cf = self.get_cf(cf_name)?;
        let mut iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));
        match iter.next() {
            Some(Ok((key, _))) => Ok(key.starts_with(prefix)),
            Some(Err(e)) => Err(StorageError::rocksdb_op("iterate", cf_name, None, e)),
            None => Ok(false),
        }
    }
}

/// Run a blocking storage closure on tokio's blocking pool.
pub(crate) async fn blocking<T, F>(db: &Arc<CurationDb>, f: F) -> StorageResult<T>
where
    F: FnOnce(&CurationDb) -> StorageResult<T> + Send + 'static,
    T: Send + 'static,
{
    let db = Arc::clone(db);
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| StorageError::TaskJoin(e.to_string()))?
}
