//! RocksDB-backed embedding store.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rocksdb::{ColumnFamily, Direction, IteratorMode, WriteBatch};
use tracing::{debug, info};

use curation_core::traits::EmbeddingStore;
use curation_core::types::{Embedding, Partition};
use curation_core::{CoreError, CoreResult};

use crate::column_families::CF_EMBEDDINGS;
use crate::db::{blocking, CurationDb};
use crate::error::{StorageError, StorageResult};
use crate::schema::{
    check_component, embedding_key, embedding_prefix, parse_embedding_seq, parse_model_space,
    prefix_upper_bound, space_prefix,
};
use crate::serialization::serialize_with_version;

/// Embeddings keyed by `(model space, partition, sequence)`.
///
/// Reads are prefix scans, so `fetch` returns rows in ingestion order.
/// Ingestion is serialized so sequence numbers are never reused.
#[derive(Clone)]
pub struct RocksDbEmbeddingStore {
    db: Arc<CurationDb>,
    ingest: Arc<Mutex<()>>,
}

impl RocksDbEmbeddingStore {
    pub fn new(db: Arc<CurationDb>) -> Self {
        Self {
            db,
            ingest: Arc::new(Mutex::new(())),
        }
    }

    /// Append embeddings in one atomic batch. Returns how many were written.
    ///
    /// # Errors
    ///
    /// - `CoreError::ValidationError` for an empty model space or partition
    ///   tag, or one containing a NUL byte
    /// - `CoreError::StoreUnavailable` if the write fails
    pub async fn put_embeddings(&self, embeddings: Vec<Embedding>) -> CoreResult<usize> {
        let ingest = Arc::clone(&self.ingest);
        let written = blocking(&self.db, move |db| {
            let _guard = ingest.lock();
            put_blocking(db, &embeddings)
        })
        .await?;
        info!(written, "Ingested embeddings");
        Ok(written)
    }
}

fn last_seq(db: &CurationDb, cf: &ColumnFamily, prefix: &[u8]) -> StorageResult<Option<u64>> {
    let upper = prefix_upper_bound(prefix);
    let mut iter = db
        .db
        .iterator_cf(cf, IteratorMode::From(&upper, Direction::Reverse));
    match iter.next() {
        Some(Ok((key, _))) if key.starts_with(prefix) => Ok(parse_embedding_seq(&key)),
        Some(Err(e)) => Err(StorageError::rocksdb_op("iterate", CF_EMBEDDINGS, None, e)),
        _ => Ok(None),
    }
}

fn put_blocking(db: &CurationDb, embeddings: &[Embedding]) -> StorageResult<usize> {
    let cf = db.get_cf(CF_EMBEDDINGS)?;
    let mut next_seq: HashMap<Vec<u8>, u64> = HashMap::new();
    let mut batch = WriteBatch::default();

    for e in embeddings {
        check_component(&e.model_space)?;
        check_component(e.partition.as_str())?;

        let prefix = embedding_prefix(&e.model_space, &e.partition);
        let seq = match next_seq.entry(prefix) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => {
                let start = last_seq(db, cf, slot.key())?.map_or(0, |s| s + 1);
                slot.insert(start)
            }
        };
        let key = embedding_key(&e.model_space, &e.partition, *seq);
        *seq += 1;
        batch.put_cf(cf, &key, serialize_with_version(e, "Embedding")?);
    }

    db.db
        .write(batch)
        .map_err(|e| StorageError::rocksdb_op("write_batch", CF_EMBEDDINGS, None, e))?;
    Ok(embeddings.len())
}

#[async_trait]
impl EmbeddingStore for RocksDbEmbeddingStore {
    async fn fetch(&self, model_space: &str, partition: &Partition) -> CoreResult<Vec<Embedding>> {
        let space = model_space.to_string();
        let prefix = embedding_prefix(model_space, partition);
        let (rows, space_known) = blocking(&self.db, move |db| {
            let rows: Vec<Embedding> = db.scan_prefix(CF_EMBEDDINGS, &prefix)?;
            let known = !rows.is_empty() || db.has_prefix(CF_EMBEDDINGS, &space_prefix(&space))?;
            Ok((rows, known))
        })
        .await?;

        if !space_known {
            return Err(CoreError::MissingModelSpace {
                model_space: model_space.to_string(),
            });
        }
        debug!(model_space, %partition, count = rows.len(), "Fetched embeddings");
        Ok(rows)
    }

    async fn model_spaces(&self) -> CoreResult<Vec<String>> {
        let names = blocking(&self.db, |db| {
            let cf = db.get_cf(CF_EMBEDDINGS)?;
            let mut names = Vec::new();
            let mut iter = db.db.raw_iterator_cf(cf);
            iter.seek_to_first();
            while let Some(key) = iter.key() {
                let Some(space) = parse_model_space(key).map(str::to_string) else {
                    break;
                };
                iter.seek(prefix_upper_bound(&space_prefix(&space)));
                names.push(space);
            }
            iter.status()
                .map_err(|e| StorageError::rocksdb_op("iterate", CF_EMBEDDINGS, None, e))?;
            Ok(names)
        })
        .await?;
        Ok(names)
    }
}
