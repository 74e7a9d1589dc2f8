//! Simulated progress for inference runs
//!
//! The backend gives no progress information, so the bar is driven by wall
//! time against a minimum visual duration. The real call's settlement can end
//! the simulation early, but only when `early_exit_on_settle` is enabled.

use crate::sink::PresentationSink;
use crate::ProgressConfig;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::debug;

/// Progress of one run. Replaced, never shared across runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressState {
    /// Percentage in `[0, 100]`
    pub value: f64,
    pub settled: bool,
}

impl ProgressState {
    fn start() -> Self {
        Self {
            value: 0.0,
            settled: false,
        }
    }

    fn finished() -> Self {
        Self {
            value: 100.0,
            settled: true,
        }
    }
}

/// Set once the tracked task has produced its output
#[derive(Debug, Clone, Default)]
pub struct SettlementFlag(Arc<AtomicBool>);

impl SettlementFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settle(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_settled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// What ended a simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEnd {
    /// Minimum duration elapsed
    Elapsed,
    /// Tracked task settled first
    Settled,
}

/// Summary of one simulation
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub ended_by: ProgressEnd,
    /// Intermediate values published before the final 100
    pub ticks: usize,
    pub elapsed: Duration,
    pub state: ProgressState,
}

/// Time-based progress estimate that runs beside a real task
pub struct ProgressSimulator {
    min_duration: Duration,
    tick: Duration,
    early_exit_on_settle: bool,
}

impl ProgressSimulator {
    pub fn new(config: &ProgressConfig) -> Self {
        Self {
            min_duration: Duration::from_millis(config.min_duration_ms),
            tick: Duration::from_millis(config.tick_ms.max(1)),
            early_exit_on_settle: config.early_exit_on_settle,
        }
    }

    pub fn early_exit_on_settle(&self) -> bool {
        self.early_exit_on_settle
    }

    /// `min(elapsed / min_duration * 100, 100)`
    pub fn progress_at(&self, elapsed: Duration) -> f64 {
        if self.min_duration.is_zero() {
            return 100.0;
        }
        let ratio = elapsed.as_secs_f64() / self.min_duration.as_secs_f64();
        (ratio * 100.0).min(100.0)
    }

    /// Drive the progress indicator until the minimum duration has elapsed
    /// or, with early exit enabled, until `settled` is observed on a tick.
    ///
    /// Values published through the sink never decrease and 100 is published
    /// exactly once, right before the indicator is hidden.
    pub async fn run(&self, settled: &SettlementFlag, sink: &dyn PresentationSink) -> ProgressReport {
        sink.show_progress();

        let start = Instant::now();
        let mut state = ProgressState::start();
        let mut ticks = 0;
        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let ended_by = loop {
            ticker.tick().await;

            let value = self.progress_at(start.elapsed());
            if value >= 100.0 {
                break ProgressEnd::Elapsed;
            }
            if self.early_exit_on_settle && settled.is_settled() {
                break ProgressEnd::Settled;
            }

            state = ProgressState {
                value: value.max(state.value),
                settled: false,
            };
            sink.update_progress(state.value);
            ticks += 1;
        };

        state = ProgressState::finished();
        sink.update_progress(state.value);
        sink.hide_progress();

        let elapsed = start.elapsed();
        debug!(?ended_by, ticks, elapsed_ms = elapsed.as_millis() as u64, "Progress finished");

        ProgressReport {
            ended_by,
            ticks,
            elapsed,
            state,
        }
    }

    /// Run `task` and the simulation concurrently on the current task.
    ///
    /// The task is wrapped so that its settlement raises the flag the
    /// simulation polls. Both complete before this returns.
    pub async fn run_alongside<F>(
        &self,
        task: F,
        sink: &dyn PresentationSink,
    ) -> (F::Output, ProgressReport)
    where
        F: Future,
    {
        let settled = SettlementFlag::new();

        let tracked = async {
            let output = task.await;
            settled.settle();
            output
        };

        tokio::join!(tracked, self.run(&settled, sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingSink, SinkEvent};

    fn simulator(early_exit: bool) -> ProgressSimulator {
        ProgressSimulator::new(&ProgressConfig {
            min_duration_ms: 3000,
            tick_ms: 50,
            early_exit_on_settle: early_exit,
        })
    }

    fn assert_well_formed(sink: &RecordingSink) {
        let values = sink.progress_values();
        assert!(values.windows(2).all(|w| w[0] <= w[1]), "values decreased: {:?}", values);
        assert_eq!(values.iter().filter(|v| **v == 100.0).count(), 1);
        assert_eq!(values.last(), Some(&100.0));
        assert!(values.iter().all(|v| (0.0..=100.0).contains(v)));

        let events = sink.events();
        assert_eq!(events.first(), Some(&SinkEvent::ProgressShown));
        assert_eq!(events.last(), Some(&SinkEvent::ProgressHidden));
    }

    #[test]
    fn test_progress_formula() {
        let sim = simulator(false);
        assert_eq!(sim.progress_at(Duration::ZERO), 0.0);
        assert_eq!(sim.progress_at(Duration::from_millis(1500)), 50.0);
        assert_eq!(sim.progress_at(Duration::from_millis(3000)), 100.0);
        assert_eq!(sim.progress_at(Duration::from_secs(10)), 100.0);
    }

    #[test]
    fn test_zero_min_duration_is_complete() {
        let sim = ProgressSimulator::new(&ProgressConfig {
            min_duration_ms: 0,
            tick_ms: 0,
            early_exit_on_settle: false,
        });
        assert_eq!(sim.progress_at(Duration::ZERO), 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_full_duration_without_early_exit() {
        let sim = simulator(false);
        let sink = RecordingSink::new();

        let (output, report) = sim
            .run_alongside(
                async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    "done"
                },
                &sink,
            )
            .await;

        assert_eq!(output, "done");
        assert_eq!(report.ended_by, ProgressEnd::Elapsed);
        assert!(report.elapsed >= Duration::from_millis(3000));
        assert_eq!(report.state, ProgressState::finished());
        assert_well_formed(&sink);
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_exit_on_settlement() {
        let sim = simulator(true);
        let sink = RecordingSink::new();

        let (_, report) = sim
            .run_alongside(tokio::time::sleep(Duration::from_millis(200)), &sink)
            .await;

        assert_eq!(report.ended_by, ProgressEnd::Settled);
        assert!(report.elapsed < Duration::from_millis(400));
        assert_well_formed(&sink);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_task_outlives_simulation() {
        let sim = simulator(true);
        let sink = RecordingSink::new();
        let started = Instant::now();

        let (_, report) = sim
            .run_alongside(tokio::time::sleep(Duration::from_secs(5)), &sink)
            .await;

        assert_eq!(report.ended_by, ProgressEnd::Elapsed);
        assert!(report.elapsed < Duration::from_secs(4));
        // join waits for the real task as well
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert_well_formed(&sink);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_settled_flag() {
        let sim = simulator(true);
        let sink = RecordingSink::new();
        let flag = SettlementFlag::new();
        flag.settle();

        let report = sim.run(&flag, &sink).await;

        assert_eq!(report.ended_by, ProgressEnd::Settled);
        assert_eq!(report.ticks, 0);
        assert_eq!(sink.progress_values(), vec![100.0]);
    }
}
