// libs/prediction-cell/src/services/inference.rs
use std::time::Duration;

use reqwest::{Client, header};
use serde::Deserialize;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::models::{PatientData, PredictionError, RiskLevel};

/// Response contract of the external classifier. Risk fields are
/// optional; the deployed model returns only label and probability.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceResponse {
    pub prediction: String,
    pub probability: f64,
    pub risk_level: Option<RiskLevel>,
    pub risk_factors: Option<Vec<String>>,
    pub recommendations: Option<Vec<String>>,
}

/// Thin HTTP client for the ML classifier service. Every call is bounded
/// by the configured timeout; there are no retries.
pub struct InferenceClient {
    http_client: Client,
    api_url: String,
    timeout: Duration,
}

impl InferenceClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http_client: Client::new(),
            api_url: config.ml_api_url.clone(),
            timeout: Duration::from_secs(config.ml_api_timeout_secs),
        }
    }

    pub async fn predict(&self, patient: &PatientData) -> Result<InferenceResponse, PredictionError> {
        let url = format!("{}/predict", self.api_url);
        debug!("Sending patient snapshot to classifier at {}", url);

        let response = self.http_client.post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(self.timeout)
            .json(patient)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    error!("Classifier request timed out after {:?}", self.timeout);
                    PredictionError::ClassifierTimeout
                } else {
                    error!("Classifier request failed: {}", e);
                    PredictionError::ClassifierUnavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Classifier error ({}): {}", status, error_text);
            return Err(PredictionError::ClassifierUnavailable(format!(
                "classifier returned {}", status
            )));
        }

        let inference = response.json::<InferenceResponse>().await
            .map_err(|e| {
                error!("Invalid classifier response: {}", e);
                PredictionError::ClassifierUnavailable("invalid classifier response".to_string())
            })?;

        debug!(
            "Classifier returned label {} with probability {:.3}",
            inference.prediction, inference.probability
        );
        Ok(inference)
    }
}
