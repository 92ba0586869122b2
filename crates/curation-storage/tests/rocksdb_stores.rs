//! RocksDB stores and the HNSW index against a real on-disk database.

use std::sync::Arc;

use chrono::Utc;
use curation_core::config::{IndexConfig, ScoringConfig};
use curation_core::traits::{AnnIndex, EmbeddingStore, ResultStore};
use curation_core::types::{Embedding, Partition, ResultSet, ScoreKind, ScoreRecord};
use curation_core::{CoreError, SamplingOrchestrator};
use curation_storage::{CurationDb, HnswAnnIndex, RocksDbEmbeddingStore, RocksDbResultStore};
use curation_test_utils::{square_category, SpaceBuilder};
use tempfile::TempDir;
use uuid::Uuid;

fn open(dir: &TempDir) -> Arc<CurationDb> {
    Arc::new(CurationDb::open(dir.path()).unwrap())
}

fn result_set(space: &str, ids: &[Uuid]) -> ResultSet {
    let records = ids
        .iter()
        .map(|id| {
            let mut r = ScoreRecord::empty(*id);
            r.set(ScoreKind::ActivationUncertainty, Some(0.5));
            r
        })
        .collect();
    ResultSet::new(space, records)
}

#[tokio::test]
async fn test_fetch_preserves_ingestion_order_across_batches() {
    let dir = TempDir::new().unwrap();
    let store = RocksDbEmbeddingStore::new(open(&dir));

    let first: Vec<Embedding> = (0..12)
        .map(|i| Embedding::training("m", "a", vec![i as f32]))
        .collect();
    let second: Vec<Embedding> = (12..20)
        .map(|i| Embedding::training("m", "b", vec![i as f32]))
        .collect();
    assert_eq!(store.put_embeddings(first.clone()).await.unwrap(), 12);
    store.put_embeddings(second.clone()).await.unwrap();
    store
        .put_embeddings(vec![Embedding::inference("m", vec![99.0])])
        .await
        .unwrap();

    let training = store.fetch("m", &Partition::Training).await.unwrap();
    let expected: Vec<Uuid> = first.iter().chain(&second).map(|e| e.id).collect();
    assert_eq!(training.iter().map(|e| e.id).collect::<Vec<_>>(), expected);
    assert_eq!(store.fetch("m", &Partition::Inference).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_space_and_empty_partition() {
    let dir = TempDir::new().unwrap();
    let store = RocksDbEmbeddingStore::new(open(&dir));
    store
        .put_embeddings(vec![Embedding::training("m", "a", vec![0.0])])
        .await
        .unwrap();

    assert!(store.fetch("m", &Partition::Inference).await.unwrap().is_empty());
    let err = store.fetch("other", &Partition::Training).await.unwrap_err();
    assert!(matches!(err, CoreError::MissingModelSpace { .. }));
}

#[tokio::test]
async fn test_model_spaces_listed_once_each() {
    let dir = TempDir::new().unwrap();
    let store = RocksDbEmbeddingStore::new(open(&dir));
    let mut rows = square_category("vision", "a");
    rows.extend(square_category("text", "a"));
    rows.push(Embedding::inference("vision", vec![0.5, 0.5]));
    store.put_embeddings(rows).await.unwrap();

    assert_eq!(store.model_spaces().await.unwrap(), vec!["text", "vision"]);
}

#[tokio::test]
async fn test_invalid_space_name_rejected() {
    let dir = TempDir::new().unwrap();
    let store = RocksDbEmbeddingStore::new(open(&dir));
    let err = store
        .put_embeddings(vec![Embedding::training("bad\0space", "a", vec![0.0])])
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ValidationError { .. }));
}

#[tokio::test]
async fn test_swap_leaves_only_latest_run() {
    let dir = TempDir::new().unwrap();
    let results = RocksDbResultStore::new(open(&dir));

    let old_ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
    let new_ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
    results.replace_results(result_set("m", &old_ids)).await.unwrap();
    let second = result_set("m", &new_ids);
    let second_run = second.run_id;
    results.replace_results(second).await.unwrap();

    let live = results.current_results("m").await.unwrap().unwrap();
    assert_eq!(live.run_id, second_run);
    assert_eq!(live.len(), 3);
    assert!(live.records.iter().all(|r| new_ids.contains(&r.embedding_id)));
    assert_eq!(results.stored_record_count("m").await.unwrap(), 3);
}

#[tokio::test]
async fn test_spaces_are_isolated() {
    let dir = TempDir::new().unwrap();
    let results = RocksDbResultStore::new(open(&dir));
    results
        .replace_results(result_set("m", &[Uuid::new_v4()]))
        .await
        .unwrap();
    results
        .replace_results(result_set("m2", &[Uuid::new_v4(), Uuid::new_v4()]))
        .await
        .unwrap();
    results
        .replace_results(result_set("m", &[Uuid::new_v4()]))
        .await
        .unwrap();

    assert_eq!(results.stored_record_count("m").await.unwrap(), 1);
    assert_eq!(results.stored_record_count("m2").await.unwrap(), 2);
}

#[tokio::test]
async fn test_delete_results() {
    let dir = TempDir::new().unwrap();
    let results = RocksDbResultStore::new(open(&dir));
    results
        .replace_results(result_set("m", &[Uuid::new_v4(), Uuid::new_v4()]))
        .await
        .unwrap();

    assert_eq!(results.delete_results("m").await.unwrap(), 2);
    assert!(results.current_results("m").await.unwrap().is_none());
    assert_eq!(results.stored_record_count("m").await.unwrap(), 0);
    assert_eq!(results.delete_results("m").await.unwrap(), 0);
}

#[tokio::test]
async fn test_results_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let ids = [Uuid::new_v4()];
    let run_id = {
        let results = RocksDbResultStore::new(open(&dir));
        let set = result_set("m", &ids);
        let run_id = set.run_id;
        results.replace_results(set).await.unwrap();
        run_id
    };

    let results = RocksDbResultStore::new(open(&dir));
    let live = results.current_results("m").await.unwrap().unwrap();
    assert_eq!(live.run_id, run_id);
    assert_eq!(
        live.record(ids[0]).and_then(|r| r.get(ScoreKind::ActivationUncertainty)),
        Some(0.5)
    );
    assert!(live.created_at <= Utc::now());
}

#[tokio::test]
async fn test_orchestrator_over_rocksdb_and_hnsw() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    let embeddings = RocksDbEmbeddingStore::new(db.clone());
    let results = RocksDbResultStore::new(db);

    let space = SpaceBuilder::new("vision").inference(60).build();
    let inference_ids: Vec<Uuid> = space.inference.iter().map(|e| e.id).collect();
    embeddings.put_embeddings(space.all()).await.unwrap();

    let store: Arc<dyn EmbeddingStore> = Arc::new(embeddings);
    let index = Arc::new(HnswAnnIndex::new(store.clone(), IndexConfig::default()));
    let config = ScoringConfig {
        random_seed: Some(7),
        ..ScoringConfig::default()
    };
    let orchestrator =
        SamplingOrchestrator::new(store, index.clone(), Arc::new(results.clone()), config);

    let report = orchestrator.run("vision").await.unwrap();
    assert_eq!(report.inference_count, 60);
    assert!(report.failed_scorers.is_empty());
    assert!(!index.is_loaded("vision"));

    let live = results.current_results("vision").await.unwrap().unwrap();
    assert_eq!(live.run_id, report.run_id);
    assert_eq!(live.random_selection_count(), 10);
    for id in &inference_ids {
        let record = live.record(*id).unwrap();
        let boundary = record.get(ScoreKind::BoundaryUncertainty).unwrap();
        assert!((0.0..=1.0).contains(&boundary));
    }

    orchestrator.run("vision").await.unwrap();
    assert_eq!(results.stored_record_count("vision").await.unwrap(), 60);
}
