//! Mutex analyses: unlock-before-lock flow, cross-thread release
//! handling, failed-try fuzzing flows, and cancellation.

use skein_analysis::engine::analyze;
use skein_analysis::trace::{ElementKind, ForkEvent, MutexEvent, MutexOp, Trace, TraceBuilder};
use skein_core::cancel::CancelToken;
use skein_core::config::AnalysisConfig;
use skein_core::results::{AnalysisResult, BugKind, FlowKind, MemorySink};
use skein_core::types::{PrimitiveId, RoutineId};

fn r(id: u32) -> RoutineId {
    RoutineId::new(id)
}

fn m(id: i64) -> PrimitiveId {
    PrimitiveId::new(id)
}

fn run(
    trace: &mut Trace,
    config: &AnalysisConfig,
) -> (Vec<AnalysisResult>, skein_analysis::engine::AnalysisSummary) {
    skein_core::tracing::init_tracing();
    let mut sink = MemorySink::new();
    let summary = analyze(trace, config, &mut sink, &CancelToken::new()).unwrap();
    (sink.into_results(), summary)
}

#[test]
fn test_unlock_without_lock_is_reported() {
    let mut builder = TraceBuilder::new(2);
    builder
        .push(
            r(1),
            1,
            10,
            "a.go",
            1,
            ElementKind::Mutex(MutexEvent::new(m(1), MutexOp::Lock)),
        )
        .unwrap();
    builder
        .push(
            r(2),
            2,
            20,
            "b.go",
            2,
            ElementKind::Mutex(MutexEvent::new(m(1), MutexOp::Unlock)),
        )
        .unwrap();
    let mut trace = builder.finish().unwrap();
    let (results, summary) = run(&mut trace, &AnalysisConfig::standard());

    let report = results
        .iter()
        .find(|res| res.kind == BugKind::PossibleUnlockBeforeLock)
        .expect("P04 expected");
    assert_eq!(report.primary[0].routine(), r(2));
    assert!(
        summary.resource_deadlock_failed,
        "a cross-thread release disables the lock-dependency analysis"
    );
}

#[test]
fn test_balanced_same_routine_locks_are_silent() {
    let mut builder = TraceBuilder::new(1);
    for (i, op) in [MutexOp::Lock, MutexOp::Unlock, MutexOp::Lock, MutexOp::Unlock]
        .into_iter()
        .enumerate()
    {
        builder
            .push(
                r(1),
                (i as u64) * 10 + 1,
                (i as u64) * 10 + 5,
                "a.go",
                i as u32 + 1,
                ElementKind::Mutex(MutexEvent::new(m(2), op)),
            )
            .unwrap();
    }
    let mut trace = builder.finish().unwrap();
    let (results, summary) = run(&mut trace, &AnalysisConfig::standard());

    assert!(results
        .iter()
        .all(|res| res.kind != BugKind::PossibleUnlockBeforeLock));
    assert!(!summary.resource_deadlock_failed);
}

#[test]
fn test_failed_trylock_concurrent_with_holder_is_a_flow() {
    let mut config = AnalysisConfig::standard();
    config.fuzzing = true;

    let mut builder = TraceBuilder::new(2);
    builder
        .push(r(1), 1, 2, "a.go", 1, ElementKind::Fork(ForkEvent { child: r(2) }))
        .unwrap();
    builder
        .push(
            r(1),
            3,
            10,
            "a.go",
            2,
            ElementKind::Mutex(MutexEvent::new(m(3), MutexOp::Lock)),
        )
        .unwrap();
    builder
        .push(
            r(2),
            4,
            20,
            "b.go",
            3,
            ElementKind::Mutex(MutexEvent::failed(m(3), MutexOp::TryLock)),
        )
        .unwrap();
    let mut trace = builder.finish().unwrap();
    let (_, summary) = run(&mut trace, &config);

    assert_eq!(summary.flows.len(), 1);
    assert_eq!(summary.flows[0].kind, FlowKind::FailedTryLock);
}

#[test]
fn test_read_locks_do_not_fake_cycles() {
    // Two routines taking the same two rwlocks in opposite order, but
    // only ever on the read side: readers cannot block each other.
    let (m1, m2) = (m(4), m(5));
    let mut builder = TraceBuilder::new(2);
    let mut push = |routine, t, mutex, op| {
        builder
            .push(
                routine,
                t,
                t + 1,
                "locks.go",
                1,
                ElementKind::Mutex(MutexEvent::new(mutex, op)),
            )
            .unwrap();
    };
    push(r(1), 10, m1, MutexOp::RLock);
    push(r(1), 20, m2, MutexOp::RLock);
    push(r(1), 30, m2, MutexOp::RUnlock);
    push(r(1), 40, m1, MutexOp::RUnlock);
    push(r(2), 50, m2, MutexOp::RLock);
    push(r(2), 60, m1, MutexOp::RLock);
    push(r(2), 70, m1, MutexOp::RUnlock);
    push(r(2), 80, m2, MutexOp::RUnlock);
    let mut trace = builder.finish().unwrap();
    let (results, _) = run(&mut trace, &AnalysisConfig::standard());

    assert!(results
        .iter()
        .all(|res| res.kind != BugKind::PossibleCyclicDeadlock));
}

#[test]
fn test_cancellation_returns_early() {
    let mut builder = TraceBuilder::new(1);
    builder
        .push(
            r(1),
            1,
            10,
            "a.go",
            1,
            ElementKind::Mutex(MutexEvent::new(m(6), MutexOp::Lock)),
        )
        .unwrap();
    let mut trace = builder.finish().unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();
    let mut sink = MemorySink::new();
    let summary = analyze(&mut trace, &AnalysisConfig::standard(), &mut sink, &cancel).unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.processed_events, 0);
    assert!(!summary.found_bug);
}
