//! Key layouts for the curation column families.
//!
//! Components are joined with a NUL byte so that every model space, and
//! every run within it, occupies a contiguous key range.

use curation_core::types::Partition;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

const SEP: u8 = 0;

/// Reject components that would break the NUL-separated layout.
pub fn check_component(value: &str) -> StorageResult<()> {
    if value.is_empty() {
        return Err(StorageError::InvalidKey {
            value: value.to_string(),
            reason: "must not be empty",
        });
    }
    if value.as_bytes().contains(&SEP) {
        return Err(StorageError::InvalidKey {
            value: value.escape_debug().to_string(),
            reason: "must not contain NUL bytes",
        });
    }
    Ok(())
}

/// `{space}\0`
#[inline]
pub fn space_prefix(model_space: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(model_space.len() + 1);
    key.extend_from_slice(model_space.as_bytes());
    key.push(SEP);
    key
}

/// `{space}\0{partition}\0`
#[inline]
pub fn embedding_prefix(model_space: &str, partition: &Partition) -> Vec<u8> {
    let mut key = space_prefix(model_space);
    key.extend_from_slice(partition.as_str().as_bytes());
    key.push(SEP);
    key
}

/// `{space}\0{partition}\0{seq:020}`. Zero padding keeps insertion order.
#[inline]
pub fn embedding_key(model_space: &str, partition: &Partition, seq: u64) -> Vec<u8> {
    let mut key = embedding_prefix(model_space, partition);
    key.extend_from_slice(format!("{:020}", seq).as_bytes());
    key
}

/// Sequence number of an embedding key.
pub fn parse_embedding_seq(key: &[u8]) -> Option<u64> {
    let tail = key.rsplit(|b| *b == SEP).next()?;
    std::str::from_utf8(tail).ok()?.parse().ok()
}

/// Model space component of any `{space}\0...` key.
pub fn parse_model_space(key: &[u8]) -> Option<&str> {
    let head = key.split(|b| *b == SEP).next()?;
    std::str::from_utf8(head).ok()
}

/// `{space}\0{run_id}\0`
#[inline]
pub fn run_prefix(model_space: &str, run_id: &Uuid) -> Vec<u8> {
    let mut key = space_prefix(model_space);
    key.extend_from_slice(run_id.to_string().as_bytes());
    key.push(SEP);
    key
}

/// `{space}\0{run_id}\0{uuid}`
#[inline]
pub fn result_key(model_space: &str, run_id: &Uuid, embedding_id: &Uuid) -> Vec<u8> {
    let mut key = run_prefix(model_space, run_id);
    key.extend_from_slice(embedding_id.to_string().as_bytes());
    key
}

#[inline]
pub fn head_key(model_space: &str) -> Vec<u8> {
    model_space.as_bytes().to_vec()
}

/// Smallest key greater than every key starting with `prefix`.
///
/// All prefixes here end in a NUL separator, so bumping that byte is enough.
pub fn prefix_upper_bound(prefix: &[u8]) -> Vec<u8> {
    let mut upper = prefix.to_vec();
    match upper.last_mut() {
        Some(last) if *last < u8::MAX => *last += 1,
        _ => upper.push(u8::MAX),
    }
    upper
}
