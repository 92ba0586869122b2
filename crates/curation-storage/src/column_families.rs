//! RocksDB column family definitions.
//!
//! | Name | Key | Value |
//! |------|-----|-------|
//! | embeddings | `{space}\0{partition}\0{seq:020}` | `Embedding` |
//! | results | `{space}\0{run_id}\0{uuid}` | `ScoreRecord` |
//! | result_heads | `{space}` | `RunHead` (live run id) |

use rocksdb::{BlockBasedOptions, Cache, ColumnFamilyDescriptor, Options};

pub const CF_EMBEDDINGS: &str = "embeddings";
pub const CF_RESULTS: &str = "results";
pub const CF_RESULT_HEADS: &str = "result_heads";

pub const CURATION_CFS: &[&str] = &[CF_EMBEDDINGS, CF_RESULTS, CF_RESULT_HEADS];

/// Embeddings are scanned by prefix and written once.
pub fn embeddings_cf_options(cache: &Cache) -> Options {
    let mut block_opts = BlockBasedOptions::default();
    block_opts.set_block_cache(cache);
    block_opts.set_cache_index_and_filter_blocks(true);

    let mut opts = Options::default();
    opts.set_block_based_table_factory(&block_opts);
    opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
    opts.create_if_missing(true);
    opts
}

/// Result records are scanned by run prefix and range-deleted on swap.
pub fn results_cf_options(cache: &Cache) -> Options {
    let mut block_opts = BlockBasedOptions::default();
    block_opts.set_block_cache(cache);
    block_opts.set_cache_index_and_filter_blocks(true);

    let mut opts = Options::default();
    opts.set_block_based_table_factory(&block_opts);
    opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
    opts.create_if_missing(true);
    opts
}

/// One small value per model space, read on every lookup.
pub fn result_heads_cf_options(cache: &Cache) -> Options {
    let mut block_opts = BlockBasedOptions::default();
    block_opts.set_block_cache(cache);
    block_opts.set_bloom_filter(10.0, false);
    block_opts.set_cache_index_and_filter_blocks(true);

    let mut opts = Options::default();
    opts.set_block_based_table_factory(&block_opts);
    opts.set_compression_type(rocksdb::DBCompressionType::None);
    opts.optimize_for_point_lookup(16);
    opts.create_if_missing(true);
    opts
}

pub fn get_column_family_descriptors(cache: &Cache) -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_EMBEDDINGS, embeddings_cf_options(cache)),
        ColumnFamilyDescriptor::new(CF_RESULTS, results_cf_options(cache)),
        ColumnFamilyDescriptor::new(CF_RESULT_HEADS, result_heads_cf_options(cache)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_per_cf() {
        let cache = Cache::new_lru_cache(1024 * 1024);
        let descriptors = get_column_family_descriptors(&cache);
        assert_eq!(descriptors.len(), CURATION_CFS.len());
    }
}
