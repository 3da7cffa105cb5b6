//! Sentiment classifier seam
//!
//! A classifier returns one score per class; the predicted label is the
//! `id2label` entry of the highest score (the first maximum wins ties).

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Classifier errors
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Model config error: {0}")]
    ModelConfig(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Label {0:?} not in id2label")]
    UnknownLabel(String),

    #[error("Classifier returned no scores")]
    EmptyScores,
}

impl ClassifierError {
    /// Failures of the server rather than of the request: worth one retry
    pub fn is_transient(&self) -> bool {
        match self {
            ClassifierError::NetworkError(_) => true,
            ClassifierError::ApiError(status, _) => *status >= 500,
            _ => false,
        }
    }
}

/// Class id → label, ids contiguous from 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Id2Label {
    labels: Vec<String>,
}

impl Id2Label {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, id: usize) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    /// Inverse map, for ordering scores returned by label
    pub fn label2id(&self) -> HashMap<String, usize> {
        self.labels
            .iter()
            .enumerate()
            .map(|(id, label)| (label.clone(), id))
            .collect()
    }
}

/// The part of a model's `config.json` the scorer reads
#[derive(Debug, Deserialize)]
struct ModelConfig {
    id2label: HashMap<String, String>,
}

impl Id2Label {
    /// Read `id2label` from `<model_dir>/config.json`
    pub fn load(model_dir: &Path) -> Result<Self, ClassifierError> {
        let path = model_dir.join("config.json");
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ClassifierError::ModelConfig(format!("Read {} failed: {}", path.display(), e))
        })?;
        Self::from_model_config(&content)
    }

    pub fn from_model_config(content: &str) -> Result<Self, ClassifierError> {
        let config: ModelConfig = serde_json::from_str(content)
            .map_err(|e| ClassifierError::ModelConfig(e.to_string()))?;

        let mut entries = config
            .id2label
            .into_iter()
            .map(|(id, label)| {
                id.parse::<usize>()
                    .map(|id| (id, label))
                    .map_err(|_| ClassifierError::ModelConfig(format!("class id {:?} is not a number", id)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|(id, _)| *id);

        if entries.is_empty() {
            return Err(ClassifierError::ModelConfig("id2label is empty".to_string()));
        }
        for (expected, (id, _)) in entries.iter().enumerate() {
            if *id != expected {
                return Err(ClassifierError::ModelConfig(format!(
                    "class ids not contiguous: missing {}",
                    expected
                )));
            }
        }

        Ok(Self::new(entries.into_iter().map(|(_, label)| label).collect()))
    }
}

/// Index of the highest score; the first one on ties
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        match best {
            Some((_, top)) if score <= top => {}
            _ if score.is_nan() => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    /// One score per class id, in id order
    async fn class_scores(&self, text: &str) -> Result<Vec<f32>, ClassifierError>;

    fn id2label(&self) -> &Id2Label;

    async fn predict_label(&self, text: &str) -> Result<String, ClassifierError> {
        let scores = self.class_scores(text).await?;
        let id = argmax(&scores).ok_or(ClassifierError::EmptyScores)?;
        self.id2label()
            .label(id)
            .map(str::to_string)
            .ok_or_else(|| ClassifierError::UnknownLabel(format!("class {}", id)))
    }
}
