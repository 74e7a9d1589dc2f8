//! Per-model detection results
//!
//! The backend answers `/inferAll` with an object whose `longformer`,
//! `finetuned`, `watermark` and `macdet` keys may each be missing. Every slot
//! is decoded on its own so a malformed slot never takes its siblings down.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// Request body for `/inferAll`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub text: String,
}

impl InferenceRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Classifier verdict shared by the longformer, finetuned and macdet models
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassifierResult {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

pub type LongformerResult = ClassifierResult;
pub type FinetunedResult = ClassifierResult;
pub type MacdetResult = ClassifierResult;

/// Watermark detector verdict with its test statistics
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WatermarkResult {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub num_tokens_scored: Option<u64>,
    #[serde(default)]
    pub num_green_tokens: Option<u64>,
    #[serde(default)]
    pub green_fraction: Option<f64>,
    #[serde(default)]
    pub z_score: Option<f64>,
    #[serde(default)]
    pub p_value: Option<f64>,
    #[serde(default)]
    pub detection_threshold: Option<f64>,
    /// Watermarked rendition of the input text
    #[serde(default)]
    pub text: Option<String>,
}

/// Model slots of a result bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelSlot {
    Longformer,
    Finetuned,
    Watermark,
    Macdet,
}

impl ModelSlot {
    pub const ALL: [ModelSlot; 4] = [
        ModelSlot::Longformer,
        ModelSlot::Finetuned,
        ModelSlot::Watermark,
        ModelSlot::Macdet,
    ];

    /// JSON key of this slot
    pub fn key(&self) -> &'static str {
        match self {
            ModelSlot::Longformer => "longformer",
            ModelSlot::Finetuned => "finetuned",
            ModelSlot::Watermark => "watermark",
            ModelSlot::Macdet => "macdet",
        }
    }
}

impl fmt::Display for ModelSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A per-slot decode problem. Logged, never raised.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldAnomaly {
    /// Key missing from the response
    Missing(ModelSlot),
    /// Key present but `null`
    Null(ModelSlot),
    /// Key present with an unexpected shape
    Malformed { slot: ModelSlot, reason: String },
}

impl FieldAnomaly {
    pub fn slot(&self) -> ModelSlot {
        match self {
            FieldAnomaly::Missing(slot) | FieldAnomaly::Null(slot) => *slot,
            FieldAnomaly::Malformed { slot, .. } => *slot,
        }
    }
}

impl fmt::Display for FieldAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldAnomaly::Missing(slot) => write!(f, "{} missing", slot),
            FieldAnomaly::Null(slot) => write!(f, "{} is null", slot),
            FieldAnomaly::Malformed { slot, reason } => write!(f, "{} malformed: {}", slot, reason),
        }
    }
}

/// Aggregate, possibly partial, set of per-model results
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultBundle {
    pub longformer: Option<LongformerResult>,
    pub finetuned: Option<FinetunedResult>,
    pub watermark: Option<WatermarkResult>,
    pub macdet: Option<MacdetResult>,
}

impl ResultBundle {
    /// Decode a raw `/inferAll` response slot by slot.
    ///
    /// A non-object response decodes to an empty bundle with all four slots
    /// reported as malformed.
    pub fn decode(raw: &Value) -> (Self, Vec<FieldAnomaly>) {
        let mut anomalies = Vec::new();

        let Some(object) = raw.as_object() else {
            for slot in ModelSlot::ALL {
                anomalies.push(FieldAnomaly::Malformed {
                    slot,
                    reason: "response is not a JSON object".to_string(),
                });
            }
            return (Self::default(), anomalies);
        };

        let mut slot_value = |slot: ModelSlot| -> Option<Value> {
            match object.get(slot.key()) {
                None => {
                    anomalies.push(FieldAnomaly::Missing(slot));
                    None
                }
                Some(Value::Null) => {
                    anomalies.push(FieldAnomaly::Null(slot));
                    None
                }
                Some(value) => Some(value.clone()),
            }
        };

        let longformer = slot_value(ModelSlot::Longformer);
        let finetuned = slot_value(ModelSlot::Finetuned);
        let watermark = slot_value(ModelSlot::Watermark);
        let macdet = slot_value(ModelSlot::Macdet);

        let bundle = Self {
            longformer: decode_slot(ModelSlot::Longformer, longformer, &mut anomalies),
            finetuned: decode_slot(ModelSlot::Finetuned, finetuned, &mut anomalies),
            watermark: decode_slot(ModelSlot::Watermark, watermark, &mut anomalies),
            macdet: decode_slot(ModelSlot::Macdet, macdet, &mut anomalies),
        };

        for anomaly in &anomalies {
            warn!(slot = %anomaly.slot(), anomaly = %anomaly, "Result slot not usable");
        }

        (bundle, anomalies)
    }

    pub fn is_present(&self, slot: ModelSlot) -> bool {
        match slot {
            ModelSlot::Longformer => self.longformer.is_some(),
            ModelSlot::Finetuned => self.finetuned.is_some(),
            ModelSlot::Watermark => self.watermark.is_some(),
            ModelSlot::Macdet => self.macdet.is_some(),
        }
    }

    /// Slots that carry a result
    pub fn present_slots(&self) -> Vec<ModelSlot> {
        ModelSlot::ALL
            .into_iter()
            .filter(|slot| self.is_present(*slot))
            .collect()
    }
}

fn decode_slot<T>(
    slot: ModelSlot,
    value: Option<Value>,
    anomalies: &mut Vec<FieldAnomaly>,
) -> Option<T>
where
    T: for<'de> Deserialize<'de>,
{
    let value = value?;
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            anomalies.push(FieldAnomaly::Malformed {
                slot,
                reason: e.to_string(),
            });
            None
        }
    }
}
