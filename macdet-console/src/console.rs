//! Console session
//!
//! [`Console`] owns all per-session state: the selection, the displayed
//! sample, the manual text and the presentation sink. Each inference cycle
//! replaces its results wholesale. Cycle methods take `&mut self`, so a
//! session can never have two inference runs in flight.

use crate::aggregate::{Presentation, ResultAggregator};
use crate::backend::DetectorBackend;
use crate::bundle::{FieldAnomaly, ResultBundle};
use crate::catalog::Catalog;
use crate::inference::{InferenceError, InferenceOrchestrator};
use crate::progress::{ProgressReport, ProgressSimulator};
use crate::sample::{SampleError, SampleProvider, SampleRecord};
use crate::selection::{InputMode, Selection, SelectionController, SelectionError, TestbedChoice};
use crate::sink::PresentationSink;
use crate::ProgressConfig;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

const ENTER_TEXT: &str = "Please enter text.";
const SELECT_TO_SAMPLE: &str = "Please select a testbed and testbed type to sample text.";
const INFERENCE_FAILED: &str =
    "An error occurred while fetching inference results. Please try again.";

/// Errors surfaced by console operations. None of them end the session.
#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Sample(#[from] SampleError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// Outcome of a completed inference cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub presentation: Presentation,
    pub bundle: ResultBundle,
    pub anomalies: Vec<FieldAnomaly>,
    pub progress: ProgressReport,
}

/// One operator session against a detection backend
pub struct Console {
    selection: SelectionController,
    sampler: SampleProvider,
    orchestrator: InferenceOrchestrator,
    progress: ProgressSimulator,
    aggregator: ResultAggregator,
    sink: Arc<dyn PresentationSink>,
    sample: Option<SampleRecord>,
    manual_text: String,
}

impl Console {
    pub fn new(
        catalog: Arc<Catalog>,
        backend: Arc<dyn DetectorBackend>,
        sink: Arc<dyn PresentationSink>,
        progress: &ProgressConfig,
    ) -> Self {
        Self {
            selection: SelectionController::new(Arc::clone(&catalog)),
            sampler: SampleProvider::new(catalog, Arc::clone(&backend)),
            orchestrator: InferenceOrchestrator::new(backend),
            progress: ProgressSimulator::new(progress),
            aggregator: ResultAggregator::new(),
            sink,
            sample: None,
            manual_text: String::new(),
        }
    }

    pub fn selection(&self) -> &Selection {
        self.selection.selection()
    }

    pub fn subtype_choices(&self) -> &[String] {
        self.selection.choices()
    }

    pub fn catalog(&self) -> &Catalog {
        self.selection.catalog()
    }

    /// Currently displayed sample, if any
    pub fn sample(&self) -> Option<&SampleRecord> {
        self.sample.as_ref()
    }

    /// Switch input mode. A previously fetched sample stays displayed.
    pub fn set_mode(&mut self, mode: InputMode) {
        self.selection.set_mode(mode);
    }

    pub fn set_manual_text(&mut self, text: impl Into<String>) {
        self.manual_text = text.into();
    }

    /// Text the next inference run would submit
    pub fn current_text(&self) -> &str {
        match self.selection.mode() {
            InputMode::Manual => &self.manual_text,
            InputMode::Sampled => self.sample.as_ref().map(|s| s.text.as_str()).unwrap_or(""),
        }
    }

    /// Choose a testbed. A single-subtype testbed is sampled immediately.
    pub async fn select_testbed(&mut self, name: &str) -> Result<TestbedChoice, ConsoleError> {
        let choice = match self.selection.select_testbed(name) {
            Ok(choice) => choice,
            Err(e) => {
                self.sink.alert(&e.to_string());
                return Err(e.into());
            }
        };

        if let Some(target) = &choice.ready {
            self.fetch(&target.testbed, &target.subtype).await?;
        }
        Ok(choice)
    }

    /// Choose a subtype of the selected testbed and sample it
    pub async fn select_subtype(&mut self, name: &str) -> Result<&SampleRecord, ConsoleError> {
        let target = match self.selection.select_subtype(name) {
            Ok(target) => target,
            Err(e) => {
                self.sink.alert(&e.to_string());
                return Err(e.into());
            }
        };
        self.fetch(&target.testbed, &target.subtype).await
    }

    /// Draw a fresh sample for the current selection
    pub async fn resample(&mut self) -> Result<&SampleRecord, ConsoleError> {
        let selection = self.selection.selection();
        let testbed = selection.testbed.clone().unwrap_or_default();
        let subtype = selection.subtype.clone().unwrap_or_default();
        self.fetch(&testbed, &subtype).await
    }

    async fn fetch(&mut self, testbed: &str, subtype: &str) -> Result<&SampleRecord, ConsoleError> {
        match self.sampler.fetch_sample(testbed, subtype).await {
            Ok(record) => {
                self.sink.show_sample(&record);
                Ok(&*self.sample.insert(record))
            }
            Err(e) => {
                match &e {
                    SampleError::MissingSelection => self.sink.warn(&e.to_string()),
                    _ => self.sink.alert(&e.to_string()),
                }
                Err(e.into())
            }
        }
    }

    /// Run one inference cycle on the current text.
    ///
    /// Results are cleared first. The backend call and the progress
    /// simulation then run concurrently, and the aggregated presentation is
    /// pushed to the sink once the call settles.
    pub async fn run_inference(&mut self) -> Result<CycleReport, ConsoleError> {
        let text = self.current_text().to_string();
        let sink = self.sink.as_ref();

        let request = match self.orchestrator.prepare(&text, sink) {
            Ok(request) => request,
            Err(e) => {
                sink.warn(match self.selection.mode() {
                    InputMode::Manual => ENTER_TEXT,
                    InputMode::Sampled => SELECT_TO_SAMPLE,
                });
                return Err(e.into());
            }
        };

        info!(mode = %self.selection.mode(), "Starting inference cycle");

        let (outcome, progress) = self
            .progress
            .run_alongside(self.orchestrator.submit(&request), sink)
            .await;

        match outcome {
            Ok(outcome) => {
                let presentation = self.aggregator.aggregate(Some(&outcome.bundle));
                sink.show_results(&presentation);
                Ok(CycleReport {
                    presentation,
                    bundle: outcome.bundle,
                    anomalies: outcome.anomalies,
                    progress,
                })
            }
            Err(e) => {
                sink.alert(INFERENCE_FAILED);
                Err(e.into())
            }
        }
    }
}
