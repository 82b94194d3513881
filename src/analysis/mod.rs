//! Client for the external change-analysis service.
//!
//! The backend never diffs documents itself; when a new version is uploaded
//! it hands the previous and new object keys to the analyzer and stores
//! whatever changes come back. An analyzer failure fails the upload, so no
//! partial version is ever stored.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::Classification;

/// One detected change as returned by the analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedChange {
    pub summary: String,
    pub analysis: String,
    pub change: String,
    pub before_quote: String,
    pub after_quote: String,
    #[serde(rename = "type")]
    pub change_type: String,
    pub confidence: f64,
    #[serde(default)]
    pub classification: Option<Classification>,
}

/// Seam to the external analysis service.
#[async_trait]
pub trait ChangeAnalyzer: Send + Sync {
    /// Detect the textual differences between two stored uploads.
    async fn analyze(&self, before_key: &str, after_key: &str)
        -> Result<Vec<DetectedChange>, AppError>;
}

/// HTTP implementation talking to a deployed analyzer.
pub struct HttpAnalyzer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAnalyzer {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    before_key: &'a str,
    after_key: &'a str,
}

#[async_trait]
impl ChangeAnalyzer for HttpAnalyzer {
    async fn analyze(
        &self,
        before_key: &str,
        after_key: &str,
    ) -> Result<Vec<DetectedChange>, AppError> {
        let url = format!("{}/analyze", self.base_url);
        tracing::debug!("Requesting analysis: {} vs {}", before_key, after_key);

        let response = self
            .client
            .post(&url)
            .json(&AnalyzeRequest {
                before_key,
                after_key,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| body.get("detail").and_then(|d| d.as_str().map(String::from)))
                .unwrap_or_else(|| format!("Analyzer returned status {}", status));
            return Err(AppError::Analysis(detail));
        }

        let changes = response.json::<Vec<DetectedChange>>().await?;
        tracing::info!("Analyzer detected {} changes", changes.len());
        Ok(changes)
    }
}

/// Analyzer used when no service is configured: every new version carries an
/// empty change list.
pub struct DisabledAnalyzer;

#[async_trait]
impl ChangeAnalyzer for DisabledAnalyzer {
    async fn analyze(
        &self,
        _before_key: &str,
        _after_key: &str,
    ) -> Result<Vec<DetectedChange>, AppError> {
        tracing::warn!("No analyzer configured; storing version without detected changes");
        Ok(Vec::new())
    }
}

/// Pick the analyzer implementation from configuration.
pub fn from_config(analyzer_url: &Option<String>) -> Arc<dyn ChangeAnalyzer> {
    match analyzer_url {
        Some(url) => Arc::new(HttpAnalyzer::new(url.clone())),
        None => Arc::new(DisabledAnalyzer),
    }
}
