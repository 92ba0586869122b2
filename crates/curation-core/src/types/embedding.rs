//! Embedding rows as read from the embedding store.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Dataset partition an embedding belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    /// Labeled reference data used to fit category models.
    Training,
    /// Unlabeled production data to be scored.
    Inference,
    /// Any other tag the ingestion path used.
    Other(String),
}

impl Partition {
    pub fn as_str(&self) -> &str {
        match self {
            Partition::Training => "training",
            Partition::Inference => "inference",
            Partition::Other(tag) => tag.as_str(),
        }
    }

    pub fn parse(tag: &str) -> Self {
        match tag {
            "training" => Partition::Training,
            "inference" => Partition::Inference,
            other => Partition::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored embedding. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub id: Uuid,
    pub model_space: String,
    pub partition: Partition,
    pub vector: Vec<f32>,
    /// Ground-truth category; required for training rows.
    pub label: Option<String>,
    /// Category produced by the model at inference time.
    pub predicted_label: Option<String>,
    /// Model output class probabilities, if the ingestion path recorded them.
    pub probabilities: Option<Vec<f32>>,
}

impl Embedding {
    /// Create an embedding with a fresh id and no labels.
    pub fn new(model_space: impl Into<String>, partition: Partition, vector: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            model_space: model_space.into(),
            partition,
            vector,
            label: None,
            predicted_label: None,
            probabilities: None,
        }
    }

    /// Training row with a ground-truth label.
    pub fn training(model_space: impl Into<String>, label: impl Into<String>, vector: Vec<f32>) -> Self {
        Self::new(model_space, Partition::Training, vector).with_label(label)
    }

    /// Inference row, optionally carrying the model's predicted category.
    pub fn inference(model_space: impl Into<String>, vector: Vec<f32>) -> Self {
        Self::new(model_space, Partition::Inference, vector)
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_predicted_label(mut self, label: impl Into<String>) -> Self {
        self.predicted_label = Some(label.into());
        self
    }

    pub fn with_probabilities(mut self, probabilities: Vec<f32>) -> Self {
        self.probabilities = Some(probabilities);
        self
    }

    /// Category used to pick a category model: the predicted label when
    /// present, otherwise the ground-truth label.
    pub fn category(&self) -> Option<&str> {
        self.predicted_label
            .as_deref()
            .or(self.label.as_deref())
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}
