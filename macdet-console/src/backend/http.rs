//! HTTP detection backend

use super::{BackendError, DetectorBackend, HealthStatus};
use crate::bundle::InferenceRequest;
use crate::catalog::Testbed;
use crate::sample::SampleRecord;
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::debug;

/// Backend reached over HTTP
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    name: String,
}

impl HttpBackend {
    /// Create a new HTTP backend
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| BackendError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        if base_url.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder().timeout(timeout).build()?;
        let name = format!("http:{}", base_url);

        Ok(Self {
            client,
            base_url,
            name,
        })
    }

    /// Create with a custom name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|e| BackendError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// URL of the sample endpoint for `file_path`, with the path form-encoded
    pub fn sample_url(&self, file_path: &str) -> Result<Url, BackendError> {
        let mut url = self.endpoint("/data/mage/sample")?;
        url.query_pairs_mut().append_pair("file_path", file_path);
        Ok(url)
    }
}

/// `/data/mage/sample` response format
#[derive(Deserialize)]
struct SampleResponse {
    #[serde(default)]
    file: Option<String>,
    sampled_data: SampledData,
}

#[derive(Deserialize)]
struct SampledData {
    text: String,
    decision: String,
    #[serde(default)]
    label: Option<i64>,
}

/// `/data/mage/testbeds` response format
#[derive(Deserialize)]
struct TestbedsResponse {
    data: TestbedsData,
}

#[derive(Deserialize)]
struct TestbedsData {
    testbeds: Vec<Testbed>,
}

async fn ensure_success(response: Response) -> Result<Response, BackendError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status { status, body })
}

#[async_trait]
impl DetectorBackend for HttpBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn sample(&self, file_path: &str) -> Result<SampleRecord, BackendError> {
        let url = self.sample_url(file_path)?;
        debug!(%url, "Requesting sample");

        let response = ensure_success(self.client.get(url).send().await?).await?;
        let body = response.bytes().await?;
        let sample: SampleResponse = serde_json::from_slice(&body)?;

        Ok(SampleRecord {
            text: sample.sampled_data.text,
            decision: sample.sampled_data.decision,
            label: sample.sampled_data.label,
            file: sample.file,
        })
    }

    async fn infer_all(
        &self,
        request: &InferenceRequest,
    ) -> Result<serde_json::Value, BackendError> {
        let url = self.endpoint("/inferAll")?;
        let start = Instant::now();

        let response = self.client.post(url).json(request).send().await?;
        let response = ensure_success(response).await?;
        let body = response.bytes().await?;

        debug!(
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Inference response received"
        );
        Ok(serde_json::from_slice(&body)?)
    }

    async fn testbeds(&self) -> Result<Vec<Testbed>, BackendError> {
        let url = self.endpoint("/data/mage/testbeds")?;

        let response = ensure_success(self.client.get(url).send().await?).await?;
        let body = response.bytes().await?;
        let listing: TestbedsResponse = serde_json::from_slice(&body)?;

        Ok(listing.data.testbeds)
    }

    async fn health_check(&self) -> HealthStatus {
        let url = match self.endpoint("/") {
            Ok(url) => url,
            Err(e) => {
                return HealthStatus {
                    healthy: false,
                    latency_ms: None,
                    error: Some(e.to_string()),
                }
            }
        };
        let start = Instant::now();

        match self.client.get(url).send().await {
            Ok(response) => {
                let latency = start.elapsed().as_millis() as u64;
                if response.status().is_success() {
                    HealthStatus {
                        healthy: true,
                        latency_ms: Some(latency),
                        error: None,
                    }
                } else {
                    HealthStatus {
                        healthy: false,
                        latency_ms: Some(latency),
                        error: Some(format!("HTTP {}", response.status())),
                    }
                }
            }
            Err(e) => HealthStatus {
                healthy: false,
                latency_ms: None,
                error: Some(e.to_string()),
            },
        }
    }
}
