//! Presentation boundary
//!
//! Rendering is not this crate's concern. The console pushes display strings,
//! progress updates and user notices through [`PresentationSink`] and the host
//! decides what they look like.

use crate::aggregate::Presentation;
use crate::sample::SampleRecord;

/// Receiver for everything the console wants shown to the operator
pub trait PresentationSink: Send + Sync {
    /// A new sample replaced the displayed one
    fn show_sample(&self, sample: &SampleRecord);

    /// Blank every per-model display field
    fn clear_results(&self);

    /// Per-model display strings for a finished run
    fn show_results(&self, presentation: &Presentation);

    /// Show the progress indicator at 0%
    fn show_progress(&self);

    /// Progress percentage in `[0, 100]`
    fn update_progress(&self, value: f64);

    fn hide_progress(&self);

    /// Recoverable input problem, e.g. no text to analyze
    fn warn(&self, message: &str);

    /// Backend or transport failure
    fn alert(&self, message: &str);
}
