//! RocksDB-backed result store with single-batch run swaps.
//!
//! Records of each run live under their own `{space}\0{run_id}\0` range and a
//! head entry names the live run. `replace_results` writes the new range,
//! repoints the head and range-deletes the previous run in one `WriteBatch`,
//! so a reader never observes a mixture of runs.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rocksdb::{Direction, IteratorMode, WriteBatch};
use tracing::{debug, info};

use curation_core::traits::ResultStore;
use curation_core::types::{ResultSet, ScoreRecord};
use curation_core::CoreResult;

use crate::column_families::{CF_RESULTS, CF_RESULT_HEADS};
use crate::db::{blocking, CurationDb};
use crate::error::{StorageError, StorageResult};
use crate::schema::{check_component, head_key, prefix_upper_bound, result_key, run_prefix, space_prefix};
use crate::serialization::{deserialize_with_version, serialize_with_version, RunHead};

#[derive(Clone)]
pub struct RocksDbResultStore {
    db: Arc<CurationDb>,
    /// Serializes head read-modify-write across concurrent swaps.
    swap: Arc<Mutex<()>>,
}

impl RocksDbResultStore {
    pub fn new(db: Arc<CurationDb>) -> Self {
        Self {
            db,
            swap: Arc::new(Mutex::new(())),
        }
    }

    /// Count raw record keys for a model space across all runs.
    ///
    /// After any successful swap this equals the live run's record count.
    pub async fn stored_record_count(&self, model_space: &str) -> CoreResult<usize> {
        let prefix = space_prefix(model_space);
        let count = blocking(&self.db, move |db| {
            let cf = db.get_cf(CF_RESULTS)?;
            let mut count = 0usize;
            for item in db.db.iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward)) {
                let (key, _) = item.map_err(|e| StorageError::rocksdb_op("iterate", CF_RESULTS, None, e))?;
                if !key.starts_with(&prefix) {
                    break;
                }
                count += 1;
            }
            Ok(count)
        })
        .await?;
        Ok(count)
    }
}

fn read_head(db: &CurationDb, model_space: &str) -> StorageResult<Option<RunHead>> {
    let cf = db.get_cf(CF_RESULT_HEADS)?;
    let key = head_key(model_space);
    match db.db.get_cf(cf, &key) {
        Ok(Some(bytes)) => Ok(Some(deserialize_with_version(&bytes, CF_RESULT_HEADS, &key)?)),
        Ok(None) => Ok(None),
        Err(e) => Err(StorageError::rocksdb_op("get", CF_RESULT_HEADS, Some(model_space), e)),
    }
}

/// Queue deletion of a run's whole key range.
fn delete_run(
    db: &CurationDb,
    batch: &mut WriteBatch,
    model_space: &str,
    head: &RunHead,
) -> StorageResult<()> {
    let cf = db.get_cf(CF_RESULTS)?;
    let prefix = run_prefix(model_space, &head.run_id);
    batch.delete_range_cf(cf, &prefix, &prefix_upper_bound(&prefix));
    Ok(())
}

fn replace_blocking(db: &CurationDb, result_set: &ResultSet) -> StorageResult<Option<RunHead>> {
    let space = result_set.model_space.as_str();
    let cf_results = db.get_cf(CF_RESULTS)?;
    let cf_heads = db.get_cf(CF_RESULT_HEADS)?;

    let previous = read_head(db, space)?;
    let mut batch = WriteBatch::default();
    for record in &result_set.records {
        let key = result_key(space, &result_set.run_id, &record.embedding_id);
        batch.put_cf(cf_results, &key, serialize_with_version(record, "ScoreRecord")?);
    }
    let head = RunHead {
        run_id: result_set.run_id,
        created_at: result_set.created_at,
        record_count: result_set.records.len(),
    };
    batch.put_cf(cf_heads, head_key(space), serialize_with_version(&head, "RunHead")?);
    if let Some(old) = &previous {
        delete_run(db, &mut batch, space, old)?;
    }

    db.db
        .write(batch)
        .map_err(|e| StorageError::rocksdb_op("write_batch", CF_RESULTS, Some(space), e))?;
    Ok(previous)
}

/// Resolve the head and its records from one snapshot.
fn current_blocking(db: &CurationDb, model_space: &str) -> StorageResult<Option<ResultSet>> {
    let cf_results = db.get_cf(CF_RESULTS)?;
    let cf_heads = db.get_cf(CF_RESULT_HEADS)?;
    let snapshot = db.db.snapshot();

    let key = head_key(model_space);
    let head: RunHead = match snapshot.get_cf(cf_heads, &key) {
        Ok(Some(bytes)) => deserialize_with_version(&bytes, CF_RESULT_HEADS, &key)?,
        Ok(None) => return Ok(None),
        Err(e) => return Err(StorageError::rocksdb_op("get", CF_RESULT_HEADS, Some(model_space), e)),
    };

    let prefix = run_prefix(model_space, &head.run_id);
    let mut records: Vec<ScoreRecord> = Vec::with_capacity(head.record_count);
    for item in snapshot.iterator_cf(cf_results, IteratorMode::From(&prefix, Direction::Forward)) {
        let (k, v) = item.map_err(|e| StorageError::rocksdb_op("iterate", CF_RESULTS, Some(model_space), e))?;
        if !k.starts_with(&prefix) {
            break;
        }
        records.push(deserialize_with_version(&v, CF_RESULTS, &k)?);
    }

    Ok(Some(ResultSet {
        model_space: model_space.to_string(),
        run_id: head.run_id,
        created_at: head.created_at,
        records,
    }))
}

#[async_trait]
impl ResultStore for RocksDbResultStore {
    async fn replace_results(&self, result_set: ResultSet) -> CoreResult<()> {
        check_component(&result_set.model_space)?;
        let swap = Arc::clone(&self.swap);
        let space = result_set.model_space.clone();
        let run_id = result_set.run_id;
        let records = result_set.len();

        let previous = blocking(&self.db, move |db| {
            let _guard = swap.lock();
            replace_blocking(db, &result_set)
        })
        .await?;

        info!(
            model_space = %space,
            %run_id,
            records,
            superseded = ?previous.map(|h| h.run_id),
            "Result set swapped"
        );
        Ok(())
    }

    async fn delete_results(&self, model_space: &str) -> CoreResult<usize> {
        let swap = Arc::clone(&self.swap);
        let space = model_space.to_string();
        let removed = blocking(&self.db, move |db| {
            let _guard = swap.lock();
            let Some(head) = read_head(db, &space)? else {
                return Ok(0);
            };
            let mut batch = WriteBatch::default();
            delete_run(db, &mut batch, &space, &head)?;
            batch.delete_cf(db.get_cf(CF_RESULT_HEADS)?, head_key(&space));
            db.db
                .write(batch)
                .map_err(|e| StorageError::rocksdb_op("write_batch", CF_RESULTS, Some(&space), e))?;
            Ok(head.record_count)
        })
        .await?;
        debug!(model_space, removed, "Result set deleted");
        Ok(removed)
    }

    async fn current_results(&self, model_space: &str) -> CoreResult<Option<ResultSet>> {
        let space = model_space.to_string();
        Ok(blocking(&self.db, move |db| current_blocking(db, &space)).await?)
    }
}
