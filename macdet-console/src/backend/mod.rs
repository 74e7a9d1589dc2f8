//! Detection backend abstraction and implementations

mod http;

pub use http::HttpBackend;

use crate::bundle::InferenceRequest;
use crate::catalog::{Catalog, Testbed};
use crate::sample::SampleRecord;
use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// Errors that can occur when talking to the detection backend
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

/// Health status of the backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

/// Trait for detection backends
#[async_trait]
pub trait DetectorBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Draw one sample from the testbed file at `file_path`
    async fn sample(&self, file_path: &str) -> Result<SampleRecord, BackendError>;

    /// Submit text to every detector. Returns the raw response body so that
    /// each model slot can be decoded independently.
    async fn infer_all(&self, request: &InferenceRequest)
        -> Result<serde_json::Value, BackendError>;

    /// List the testbeds the backend can sample from
    async fn testbeds(&self) -> Result<Vec<Testbed>, BackendError>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> HealthStatus;
}

/// Build a catalog from the backend's testbed listing
pub async fn fetch_catalog(backend: &dyn DetectorBackend) -> Result<Catalog, BackendError> {
    let testbeds = backend.testbeds().await?;
    info!(backend = backend.name(), testbeds = testbeds.len(), "Fetched testbed catalog");
    Ok(Catalog::from_testbeds(testbeds))
}
