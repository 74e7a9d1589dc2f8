//! Inference submission and result decoding

use crate::backend::{BackendError, DetectorBackend};
use crate::bundle::{FieldAnomaly, InferenceRequest, ResultBundle};
use crate::sink::PresentationSink;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

/// Errors from an inference run
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("No text to analyze")]
    EmptyInput,

    #[error("Inference request failed: {0}")]
    Transport(#[from] BackendError),
}

/// Settled result of one successful submission
#[derive(Debug, Clone)]
pub struct InferenceOutcome {
    pub bundle: ResultBundle,
    /// Slots that could not be used, already logged
    pub anomalies: Vec<FieldAnomaly>,
    pub elapsed: Duration,
}

/// Submits text to the detection backend, one call per run
pub struct InferenceOrchestrator {
    backend: Arc<dyn DetectorBackend>,
}

impl InferenceOrchestrator {
    pub fn new(backend: Arc<dyn DetectorBackend>) -> Self {
        Self { backend }
    }

    /// Clear displayed results, then validate `text` into a request.
    ///
    /// Clearing happens first so a rejected run never leaves stale results
    /// on screen either. Whitespace-only text counts as empty, which is
    /// stricter than rejecting only the empty string.
    pub fn prepare(
        &self,
        text: &str,
        sink: &dyn PresentationSink,
    ) -> Result<InferenceRequest, InferenceError> {
        sink.clear_results();

        if text.trim().is_empty() {
            return Err(InferenceError::EmptyInput);
        }
        Ok(InferenceRequest::new(text))
    }

    /// Issue exactly one `/inferAll` submission and decode the bundle.
    /// No retries.
    pub async fn submit(&self, request: &InferenceRequest) -> Result<InferenceOutcome, InferenceError> {
        info!(bytes = request.text.len(), backend = self.backend.name(), "Running inference");
        let start = Instant::now();

        let raw = match self.backend.infer_all(request).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Inference failed");
                return Err(InferenceError::Transport(e));
            }
        };

        let (bundle, anomalies) = ResultBundle::decode(&raw);
        let elapsed = start.elapsed();

        info!(
            present = ?bundle.present_slots(),
            anomalies = anomalies.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Inference complete"
        );

        Ok(InferenceOutcome {
            bundle,
            anomalies,
            elapsed,
        })
    }

    /// [`prepare`](Self::prepare) followed by [`submit`](Self::submit)
    pub async fn run_inference(
        &self,
        text: &str,
        sink: &dyn PresentationSink,
    ) -> Result<InferenceOutcome, InferenceError> {
        let request = self.prepare(text, sink)?;
        self.submit(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::ModelSlot;
    use crate::testing::{MockBackend, RecordingSink, SinkEvent};
    use serde_json::json;

    #[tokio::test]
    async fn test_empty_text_sends_nothing() {
        let backend = Arc::new(MockBackend::new());
        let orchestrator = InferenceOrchestrator::new(backend.clone());
        let sink = RecordingSink::new();

        for text in ["", "   \n"] {
            let result = orchestrator.run_inference(text, &sink).await;
            assert!(matches!(result, Err(InferenceError::EmptyInput)));
        }
        assert!(backend.inference_requests().is_empty());
        assert_eq!(sink.count(|e| *e == SinkEvent::Cleared), 2);
    }

    #[tokio::test]
    async fn test_single_submission_with_text_body() {
        let backend = Arc::new(MockBackend::new().with_inference(json!({
            "watermark": {"label": "AI", "confidence": 0.87, "z_score": 3.21, "p_value": 0.00012}
        })));
        let orchestrator = InferenceOrchestrator::new(backend.clone());
        let sink = RecordingSink::new();

        let outcome = orchestrator.run_inference("some text", &sink).await.unwrap();

        assert_eq!(backend.inference_requests(), vec![InferenceRequest::new("some text")]);
        assert_eq!(outcome.bundle.present_slots(), vec![ModelSlot::Watermark]);
        assert_eq!(outcome.anomalies.len(), 3);
        assert_eq!(sink.events().first(), Some(&SinkEvent::Cleared));
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let backend = Arc::new(MockBackend::new().failing_inference());
        let orchestrator = InferenceOrchestrator::new(backend.clone());
        let sink = RecordingSink::new();

        let result = orchestrator.run_inference("text", &sink).await;

        assert!(matches!(
            result,
            Err(InferenceError::Transport(BackendError::Status { status: 500, .. }))
        ));
        assert_eq!(backend.inference_requests().len(), 1);
    }
}
