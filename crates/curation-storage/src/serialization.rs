//! Versioned bincode encoding for stored values.
//!
//! Every value is one version byte followed by the bincode payload. Bump
//! [`STORAGE_VERSION`] when a stored struct changes layout.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

pub const STORAGE_VERSION: u8 = 1;

/// Pointer to the live run of a model space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunHead {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub record_count: usize,
}

pub fn serialize_with_version<T: Serialize>(
    value: &T,
    type_name: &'static str,
) -> StorageResult<Vec<u8>> {
    let payload = bincode::serialize(value).map_err(|e| StorageError::Serialization {
        type_name,
        message: e.to_string(),
    })?;
    let mut bytes = Vec::with_capacity(payload.len() + 1);
    bytes.push(STORAGE_VERSION);
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

pub fn deserialize_with_version<T: DeserializeOwned>(
    bytes: &[u8],
    cf: &'static str,
    key: &[u8],
) -> StorageResult<T> {
    let Some((&version, payload)) = bytes.split_first() else {
        return Err(StorageError::Deserialization {
            cf,
            key: String::from_utf8_lossy(key).into_owned(),
            message: "empty value".to_string(),
        });
    };
    if version != STORAGE_VERSION {
        return Err(StorageError::VersionMismatch {
            cf,
            expected: STORAGE_VERSION,
            actual: version,
        });
    }
    bincode::deserialize(payload).map_err(|e| StorageError::Deserialization {
        cf,
        key: String::from_utf8_lossy(key).into_owned(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use curation_core::types::{Embedding, ScoreKind, ScoreRecord};

    #[test]
    fn test_embedding_survives_encoding() {
        let e = Embedding::inference("m", vec![0.25, -1.5])
            .with_predicted_label("cat")
            .with_probabilities(vec![0.7, 0.3]);
        let bytes = serialize_with_version(&e, "Embedding").unwrap();
        assert_eq!(bytes[0], STORAGE_VERSION);
        let back: Embedding = deserialize_with_version(&bytes, "embeddings", b"k").unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn test_null_scores_stay_null() {
        let mut r = ScoreRecord::empty(Uuid::new_v4());
        r.set(ScoreKind::BoundaryUncertainty, Some(0.5));
        let bytes = serialize_with_version(&r, "ScoreRecord").unwrap();
        let back: ScoreRecord = deserialize_with_version(&bytes, "results", b"k").unwrap();
        assert_eq!(back.get(ScoreKind::BoundaryUncertainty), Some(0.5));
        assert_eq!(back.get(ScoreKind::ActivationUncertainty), None);
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut bytes = serialize_with_version(&1u32, "u32").unwrap();
        bytes[0] = STORAGE_VERSION + 1;
        let err = deserialize_with_version::<u32>(&bytes, "results", b"k").unwrap_err();
        assert!(matches!(err, StorageError::VersionMismatch { .. }));
        assert!(deserialize_with_version::<u32>(&[], "results", b"k").is_err());
    }
}
