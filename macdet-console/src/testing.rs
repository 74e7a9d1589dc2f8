//! Test doubles shared by the unit tests

use crate::aggregate::Presentation;
use crate::backend::{BackendError, DetectorBackend, HealthStatus};
use crate::bundle::InferenceRequest;
use crate::catalog::Testbed;
use crate::sample::SampleRecord;
use crate::sink::PresentationSink;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted backend that records every call it receives
pub struct MockBackend {
    sample: Option<SampleRecord>,
    inference: Option<Value>,
    inference_delay: Duration,
    testbeds: Vec<Testbed>,
    sample_calls: Mutex<Vec<String>>,
    inference_calls: Mutex<Vec<InferenceRequest>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            sample: Some(SampleRecord {
                text: "The quick brown fox.".to_string(),
                decision: "human-written".to_string(),
                label: Some(1),
                file: None,
            }),
            inference: Some(json!({})),
            inference_delay: Duration::ZERO,
            testbeds: Vec::new(),
            sample_calls: Mutex::new(Vec::new()),
            inference_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_samples(mut self) -> Self {
        self.sample = None;
        self
    }

    pub fn with_inference(mut self, body: Value) -> Self {
        self.inference = Some(body);
        self
    }

    pub fn failing_inference(mut self) -> Self {
        self.inference = None;
        self
    }

    pub fn with_inference_delay(mut self, delay: Duration) -> Self {
        self.inference_delay = delay;
        self
    }

    pub fn with_testbeds(mut self, testbeds: Vec<Testbed>) -> Self {
        self.testbeds = testbeds;
        self
    }

    pub fn sample_paths(&self) -> Vec<String> {
        self.sample_calls.lock().unwrap().clone()
    }

    pub fn inference_requests(&self) -> Vec<InferenceRequest> {
        self.inference_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DetectorBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn sample(&self, file_path: &str) -> Result<SampleRecord, BackendError> {
        self.sample_calls.lock().unwrap().push(file_path.to_string());
        self.sample.clone().ok_or(BackendError::Status {
            status: 404,
            body: "Testbed not found.".to_string(),
        })
    }

    async fn infer_all(&self, request: &InferenceRequest) -> Result<Value, BackendError> {
        self.inference_calls.lock().unwrap().push(request.clone());
        if !self.inference_delay.is_zero() {
            tokio::time::sleep(self.inference_delay).await;
        }
        self.inference.clone().ok_or(BackendError::Status {
            status: 500,
            body: "Internal Server Error".to_string(),
        })
    }

    async fn testbeds(&self) -> Result<Vec<Testbed>, BackendError> {
        Ok(self.testbeds.clone())
    }

    async fn health_check(&self) -> HealthStatus {
        HealthStatus {
            healthy: true,
            latency_ms: Some(0),
            error: None,
        }
    }
}

/// Everything a sink was asked to do, in order
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Sample(SampleRecord),
    Cleared,
    Results(Presentation),
    ProgressShown,
    Progress(f64),
    ProgressHidden,
    Warning(String),
    Alert(String),
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn progress_values(&self) -> Vec<f64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Progress(value) => Some(value),
                _ => None,
            })
            .collect()
    }

    pub fn last_results(&self) -> Option<Presentation> {
        self.events().into_iter().rev().find_map(|e| match e {
            SinkEvent::Results(p) => Some(p),
            _ => None,
        })
    }

    pub fn count(&self, matches: impl Fn(&SinkEvent) -> bool) -> usize {
        self.events().iter().filter(|e| matches(e)).count()
    }

    fn push(&self, event: SinkEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl PresentationSink for RecordingSink {
    fn show_sample(&self, sample: &SampleRecord) {
        self.push(SinkEvent::Sample(sample.clone()));
    }

    fn clear_results(&self) {
        self.push(SinkEvent::Cleared);
    }

    fn show_results(&self, presentation: &Presentation) {
        self.push(SinkEvent::Results(presentation.clone()));
    }

    fn show_progress(&self) {
        self.push(SinkEvent::ProgressShown);
    }

    fn update_progress(&self, value: f64) {
        self.push(SinkEvent::Progress(value));
    }

    fn hide_progress(&self) {
        self.push(SinkEvent::ProgressHidden);
    }

    fn warn(&self, message: &str) {
        self.push(SinkEvent::Warning(message.to_string()));
    }

    fn alert(&self, message: &str) {
        self.push(SinkEvent::Alert(message.to_string()));
    }
}
