//! Normalization of result bundles into display strings
//!
//! Sentinels stand in only for fields the backend left out. A value of zero
//! is a real value and is formatted like any other.

use crate::bundle::{ClassifierResult, ModelSlot, ResultBundle, WatermarkResult};
use tracing::debug;

/// Shown for a numeric field the backend did not send
pub const NOT_AVAILABLE: &str = "N/A";
/// Shown for a missing prediction label
pub const UNKNOWN_LABEL: &str = "Unknown";
/// Shown when the watermark detector returned no text
pub const NO_WATERMARKED_TEXT: &str = "No watermarked text available.";

/// Display strings for a label/confidence classifier
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassifierDisplay {
    pub prediction: String,
    pub confidence: String,
}

/// Display strings for the watermark detector
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WatermarkDisplay {
    pub prediction: String,
    pub confidence: String,
    pub num_tokens_scored: String,
    pub num_green_tokens: String,
    pub green_fraction: String,
    pub z_score: String,
    pub p_value: String,
    pub detection_threshold: String,
    pub text: String,
}

/// Per-model presentation record. Empty strings mean the slot has no result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Presentation {
    pub longformer: ClassifierDisplay,
    pub finetuned: ClassifierDisplay,
    pub watermark: WatermarkDisplay,
    pub macdet: ClassifierDisplay,
}

impl Presentation {
    /// Whether the slot carries display values
    pub fn is_populated(&self, slot: ModelSlot) -> bool {
        match slot {
            ModelSlot::Longformer => self.longformer != ClassifierDisplay::default(),
            ModelSlot::Finetuned => self.finetuned != ClassifierDisplay::default(),
            ModelSlot::Watermark => self.watermark != WatermarkDisplay::default(),
            ModelSlot::Macdet => self.macdet != ClassifierDisplay::default(),
        }
    }
}

/// Turns a (possibly partial) bundle into a [`Presentation`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultAggregator;

impl ResultAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Format every slot independently. `None` (a failed run) yields an
    /// all-empty presentation.
    pub fn aggregate(&self, bundle: Option<&ResultBundle>) -> Presentation {
        let Some(bundle) = bundle else {
            debug!("No result bundle, all slots left empty");
            return Presentation::default();
        };

        for slot in ModelSlot::ALL {
            if !bundle.is_present(slot) {
                debug!(%slot, "No result for slot, leaving it empty");
            }
        }

        Presentation {
            longformer: classifier_display(bundle.longformer.as_ref()),
            finetuned: classifier_display(bundle.finetuned.as_ref()),
            watermark: watermark_display(bundle.watermark.as_ref()),
            macdet: classifier_display(bundle.macdet.as_ref()),
        }
    }
}

fn classifier_display(result: Option<&ClassifierResult>) -> ClassifierDisplay {
    match result {
        Some(r) => ClassifierDisplay {
            prediction: r.label.clone().unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
            confidence: or_sentinel(r.confidence, format_confidence),
        },
        None => ClassifierDisplay::default(),
    }
}

fn watermark_display(result: Option<&WatermarkResult>) -> WatermarkDisplay {
    let Some(r) = result else {
        return WatermarkDisplay::default();
    };

    WatermarkDisplay {
        prediction: r.label.clone().unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
        confidence: or_sentinel(r.confidence, format_confidence),
        num_tokens_scored: or_sentinel(r.num_tokens_scored, |n| n.to_string()),
        num_green_tokens: or_sentinel(r.num_green_tokens, |n| n.to_string()),
        green_fraction: or_sentinel(r.green_fraction, |v| format!("{:.4}", v)),
        z_score: or_sentinel(r.z_score, |v| format!("{:.4}", v)),
        p_value: or_sentinel(r.p_value, format_scientific),
        detection_threshold: or_sentinel(r.detection_threshold, |v| v.to_string()),
        text: r
            .text
            .clone()
            .unwrap_or_else(|| NO_WATERMARKED_TEXT.to_string()),
    }
}

fn or_sentinel<T>(value: Option<T>, format: impl FnOnce(T) -> String) -> String {
    value.map(format).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Confidence in `[0, 1]` as a percentage with two decimals
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.2}%", confidence * 100.0)
}

/// Six-digit mantissa with an explicitly signed exponent, e.g. `1.200000e-4`
pub fn format_scientific(value: f64) -> String {
    let formatted = format!("{:.6e}", value);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => formatted,
    }
}
