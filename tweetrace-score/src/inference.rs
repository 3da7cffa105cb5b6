//! Inference server client
//!
//! The fine-tuned model is served by a text-classification inference
//! server. `POST {endpoint}/predict` with raw scores returns every class
//! as `{"label", "score"}`; the label map comes from the local model
//! directory so scores can be put back in class-id order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tweetrace_common::config::ClassifierConfig;

use crate::classifier::{ClassifierError, Id2Label, SentimentClassifier};

const USER_AGENT: &str = concat!("tweetrace-score/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    inputs: &'a str,
    truncate: bool,
    raw_scores: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

/// HTTP classifier backed by the inference server
pub struct InferenceClient {
    http_client: reqwest::Client,
    predict_url: String,
    id2label: Id2Label,
    label2id: HashMap<String, usize>,
}

impl InferenceClient {
    /// Load the label map from `model_dir` and build the HTTP client
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let id2label = Id2Label::load(&config.model_dir)?;
        Self::with_labels(&config.endpoint, config.timeout(), id2label)
    }

    pub fn with_labels(
        endpoint: &str,
        timeout: Duration,
        id2label: Id2Label,
    ) -> Result<Self, ClassifierError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifierError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            predict_url: format!("{}/predict", endpoint.trim_end_matches('/')),
            label2id: id2label.label2id(),
            id2label,
        })
    }

    /// Put returned scores in class-id order. Classes the server left out
    /// score negative infinity.
    fn order_scores(&self, returned: Vec<LabelScore>) -> Result<Vec<f32>, ClassifierError> {
        let mut scores = vec![f32::NEG_INFINITY; self.id2label.len()];
        for entry in returned {
            let id = *self
                .label2id
                .get(&entry.label)
                .ok_or(ClassifierError::UnknownLabel(entry.label))?;
            scores[id] = entry.score;
        }
        Ok(scores)
    }
}

#[async_trait]
impl SentimentClassifier for InferenceClient {
    async fn class_scores(&self, text: &str) -> Result<Vec<f32>, ClassifierError> {
        let request = PredictRequest {
            inputs: text,
            truncate: true,
            raw_scores: true,
        };

        tracing::debug!(chars = text.chars().count(), "Requesting classification");

        let response = self
            .http_client
            .post(&self.predict_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassifierError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::ApiError(status.as_u16(), body));
        }

        let returned: Vec<LabelScore> = response
            .json()
            .await
            .map_err(|e| ClassifierError::ParseError(e.to_string()))?;
        if returned.is_empty() {
            return Err(ClassifierError::EmptyScores);
        }

        self.order_scores(returned)
    }

    fn id2label(&self) -> &Id2Label {
        &self.id2label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> InferenceClient {
        let labels = Id2Label::new(vec![
            "positive".to_string(),
            "negative".to_string(),
            "neutral".to_string(),
        ]);
        InferenceClient::with_labels("http://127.0.0.1:9/", Duration::from_secs(1), labels).unwrap()
    }

    #[test]
    fn test_predict_url_joined() {
        assert_eq!(client().predict_url, "http://127.0.0.1:9/predict");
    }

    #[test]
    fn test_scores_reordered_by_class_id() {
        let returned = vec![
            LabelScore { label: "neutral".to_string(), score: 2.5 },
            LabelScore { label: "positive".to_string(), score: -1.0 },
        ];
        let scores = client().order_scores(returned).unwrap();
        assert_eq!(scores, vec![-1.0, f32::NEG_INFINITY, 2.5]);
    }

    #[test]
    fn test_unknown_label_rejected() {
        let returned = vec![LabelScore { label: "LABEL_7".to_string(), score: 1.0 }];
        assert!(matches!(
            client().order_scores(returned),
            Err(ClassifierError::UnknownLabel(label)) if label == "LABEL_7"
        ));
    }
}
