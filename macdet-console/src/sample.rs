//! Sample retrieval for a resolved testbed/subtype selection

use crate::backend::{BackendError, DetectorBackend};
use crate::catalog::Catalog;
use crate::selection::{EntryKind, SelectionError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Errors from sample retrieval
#[derive(Error, Debug)]
pub enum SampleError {
    #[error("Please select a testbed and testbed type.")]
    MissingSelection,

    #[error("Selection does not match the catalog: {0}")]
    Selection(#[from] SelectionError),

    #[error("Failed to fetch sample: {0}")]
    Fetch(#[from] BackendError),
}

/// One sampled line from a testbed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub text: String,

    /// Ground-truth decision, e.g. "machine-generated" or "human-written"
    pub decision: String,

    /// Raw ground-truth label (0 = machine, 1 = human)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<i64>,

    /// File the sample was drawn from, as echoed by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl SampleRecord {
    pub fn new(text: impl Into<String>, decision: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            decision: decision.into(),
            label: None,
            file: None,
        }
    }
}

/// Resolves selections to file paths and fetches samples for them
pub struct SampleProvider {
    catalog: Arc<Catalog>,
    backend: Arc<dyn DetectorBackend>,
}

impl SampleProvider {
    pub fn new(catalog: Arc<Catalog>, backend: Arc<dyn DetectorBackend>) -> Self {
        Self { catalog, backend }
    }

    /// Fetch a sample for the given testbed/subtype pair.
    ///
    /// Both names must be non-empty; no request is made otherwise.
    pub async fn fetch_sample(
        &self,
        testbed: &str,
        subtype: &str,
    ) -> Result<SampleRecord, SampleError> {
        if testbed.is_empty() || subtype.is_empty() {
            return Err(SampleError::MissingSelection);
        }

        let testbed_entry = self.catalog.get(testbed).ok_or(SelectionError::NotFound {
            kind: EntryKind::Testbed,
            name: testbed.to_string(),
        })?;
        let entry = testbed_entry
            .subtype(subtype)
            .ok_or(SelectionError::NotFound {
                kind: EntryKind::Subtype,
                name: subtype.to_string(),
            })?;

        info!(testbed, subtype, file_path = %entry.file_path, backend = self.backend.name(), "Fetching sample");

        match self.backend.sample(&entry.file_path).await {
            Ok(record) => {
                info!(decision = %record.decision, bytes = record.text.len(), "Sample fetched");
                Ok(record)
            }
            Err(e) => {
                warn!(testbed, subtype, error = %e, "Sample fetch failed");
                Err(SampleError::Fetch(e))
            }
        }
    }
}
