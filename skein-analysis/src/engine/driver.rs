//! The engine driver.
//!
//! Resets the state, iterates all events in global order applying the
//! clock updater and the event-triggered predicates, then runs the
//! final-pass predicates. Cancellation is checked between events; a
//! cancelled run returns the results accumulated so far without the
//! final passes.

use serde::Serialize;
use skein_core::cancel::CancelToken;
use skein_core::config::AnalysisConfig;
use skein_core::errors::AnalysisError;
use skein_core::results::{AnalysisResult, FlowCandidate, ResultSink};
use tracing::{debug, info};

use crate::detectors::{exit_code, leak, resource_deadlock, select_partner, unlock_lock, wait_group};
use crate::trace::iterator::SortedIter;
use crate::trace::link::link_partners;
use crate::trace::trace::Trace;

use super::state::{EngineState, SizeReport};
use super::updater::{self, UpdateCtx};

/// What a run produced besides the result stream.
#[derive(Debug, Serialize)]
pub struct AnalysisSummary {
    pub processed_events: usize,
    pub cancelled: bool,
    /// Whether any result was emitted.
    pub found_bug: bool,
    /// The resource-deadlock analysis hit a cross-thread release and was
    /// skipped.
    pub resource_deadlock_failed: bool,
    /// Fuzzing flow candidates (empty unless the knob is on).
    pub flows: Vec<FlowCandidate>,
    pub size_report: SizeReport,
}

/// The analysis engine. Owns all mutable state; `run` resets it, so one
/// analyzer can process any number of traces sequentially.
#[derive(Debug, Default)]
pub struct Analyzer {
    config: AnalysisConfig,
    state: EngineState,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            state: EngineState::new(),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Current per-table sizes (memory accounting).
    pub fn size_report(&self) -> SizeReport {
        self.state.size_report()
    }

    /// Analyze one trace, emitting results into `sink`.
    pub fn run(
        &mut self,
        trace: &mut Trace,
        sink: &mut dyn ResultSink,
        cancel: &CancelToken,
    ) -> Result<AnalysisSummary, AnalysisError> {
        trace.validate()?;
        link_partners(trace);
        self.state.reset(trace.routine_count());

        let mut counting = CountingSink { inner: sink, emitted: 0 };
        let mut flows: Vec<FlowCandidate> = Vec::new();
        let mut iter = SortedIter::new(trace);
        let mut processed = 0usize;
        let mut cancelled = false;

        debug!(
            routines = trace.routine_count(),
            elements = trace.len(),
            "starting analysis"
        );

        while let Some(eid) = iter.next(trace) {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let mut ctx = UpdateCtx {
                config: &self.config,
                sink: &mut counting,
                flows: &mut flows,
            };
            updater::apply(&mut self.state, trace, &mut iter, eid, &mut ctx)?;
            processed += 1;
        }

        if !cancelled {
            let mut ctx = UpdateCtx {
                config: &self.config,
                sink: &mut counting,
                flows: &mut flows,
            };
            updater::channel::flush_holds(&mut self.state, trace, &mut ctx)?;
            if self.config.select_without_partner {
                select_partner::final_sweep(&mut self.state, trace, &mut ctx);
            }
            if self.config.leak || self.config.mixed_deadlock {
                leak::final_sweep(&mut self.state, trace, &mut ctx);
                leak::stuck_routines(&self.state, trace, &mut ctx);
            }
            if self.config.done_before_add {
                wait_group::check_all(&self.state, trace, &mut ctx);
            }
            if self.config.cyclic_deadlock || self.config.resource_deadlock {
                resource_deadlock::search(&self.state, trace, &mut ctx);
            }
            if self.config.unlock_before_lock {
                unlock_lock::check_all(&self.state, trace, &mut ctx);
            }
            exit_code::check(&self.state, trace, &mut ctx);
        }

        info!(
            processed,
            cancelled,
            results = counting.emitted,
            "analysis finished"
        );

        Ok(AnalysisSummary {
            processed_events: processed,
            cancelled,
            found_bug: counting.emitted > 0,
            resource_deadlock_failed: self.state.deadlock_analysis_failed,
            flows,
            size_report: self.state.size_report(),
        })
    }
}

/// One-shot convenience wrapper.
pub fn analyze(
    trace: &mut Trace,
    config: &AnalysisConfig,
    sink: &mut dyn ResultSink,
    cancel: &CancelToken,
) -> Result<AnalysisSummary, AnalysisError> {
    Analyzer::new(config.clone()).run(trace, sink, cancel)
}

/// Counts emissions on the way into the caller's sink.
struct CountingSink<'a> {
    inner: &'a mut dyn ResultSink,
    emitted: usize,
}

impl ResultSink for CountingSink<'_> {
    fn emit(&mut self, result: AnalysisResult) {
        self.emitted += 1;
        self.inner.emit(result);
    }
}
