//! End-to-end scenarios: small hand-built traces with a known expected
//! bug report.

use skein_analysis::engine::analyze;
use skein_analysis::trace::{
    ChannelEvent, ElementKind, MutexEvent, MutexOp, SelectCase, SelectEvent, Trace, TraceBuilder,
    WaitGroupEvent,
};
use skein_core::cancel::CancelToken;
use skein_core::config::AnalysisConfig;
use skein_core::results::{AnalysisResult, BugKind, Severity};
use skein_core::types::{OpId, PrimitiveId, RoutineId};

fn r(id: u32) -> RoutineId {
    RoutineId::new(id)
}

fn ch(id: i64) -> PrimitiveId {
    PrimitiveId::new(id)
}

fn o(id: u64) -> OpId {
    OpId::new(id)
}

fn run_standard(trace: &mut Trace) -> Vec<AnalysisResult> {
    skein_core::tracing::init_tracing();
    let mut sink = skein_core::results::MemorySink::new();
    analyze(
        trace,
        &AnalysisConfig::standard(),
        &mut sink,
        &CancelToken::new(),
    )
    .unwrap();
    sink.into_results()
}

fn find<'a>(results: &'a [AnalysisResult], kind: BugKind) -> Option<&'a AnalysisResult> {
    results.iter().find(|result| result.kind == kind)
}

#[test]
fn test_close_on_closed() {
    let mut builder = TraceBuilder::new(2);
    builder
        .push(
            r(1),
            1,
            10,
            "main.go",
            5,
            ElementKind::Channel(ChannelEvent::close(ch(0x10))),
        )
        .unwrap();
    builder
        .push(
            r(2),
            2,
            20,
            "worker.go",
            9,
            ElementKind::Channel(ChannelEvent::close(ch(0x10))),
        )
        .unwrap();
    let mut trace = builder.finish().unwrap();

    let results = run_standard(&mut trace);
    let result = find(&results, BugKind::CloseOnClosed).expect("A03 expected");
    assert_eq!(result.severity, Severity::Critical);
    assert_eq!(result.primary[0].routine(), r(2));
    assert_eq!(result.secondary[0].routine(), r(1));
}

#[test]
fn test_results_serialize_to_json() {
    let mut builder = TraceBuilder::new(2);
    for (routine, t) in [(r(1), 10u64), (r(2), 20)] {
        builder
            .push(
                routine,
                t - 5,
                t,
                "main.go",
                5,
                ElementKind::Channel(ChannelEvent::close(ch(0x10))),
            )
            .unwrap();
    }
    let mut trace = builder.finish().unwrap();
    let results = run_standard(&mut trace);
    let json = serde_json::to_string(&results).unwrap();
    assert!(json.contains("CloseOnClosed"));
}

#[test]
fn test_possible_send_on_closed() {
    // Buffered send in routine 1, unordered close in routine 2.
    let mut builder = TraceBuilder::new(2);
    builder
        .push(
            r(1),
            5,
            10,
            "main.go",
            12,
            ElementKind::Channel(ChannelEvent::send(ch(0x20), o(1), 1, 0)),
        )
        .unwrap();
    builder
        .push(
            r(2),
            15,
            20,
            "main.go",
            30,
            ElementKind::Channel(ChannelEvent::close(ch(0x20))),
        )
        .unwrap();
    let mut trace = builder.finish().unwrap();

    let results = run_standard(&mut trace);
    let result = find(&results, BugKind::PossibleSendOnClosed).expect("P01 expected");
    assert_eq!(result.severity, Severity::Critical);
    assert_eq!(result.primary[0].routine(), r(1));
    assert_eq!(result.secondary[0].routine(), r(2));
}

#[test]
fn test_cyclic_deadlock_two_threads_two_locks() {
    let (m1, m2) = (PrimitiveId::new(0x31), PrimitiveId::new(0x32));
    let mut builder = TraceBuilder::new(2);
    let mut push_mutex = |routine, t_pre, t_post, mutex, op| {
        builder
            .push(
                routine,
                t_pre,
                t_post,
                "locks.go",
                (t_pre % 100) as u32,
                ElementKind::Mutex(MutexEvent::new(mutex, op)),
            )
            .unwrap();
    };
    // Routine 1: m1 then m2; routine 2: m2 then m1, disjoint in time but
    // concurrent per the weak clocks.
    push_mutex(r(1), 1, 10, m1, MutexOp::Lock);
    push_mutex(r(1), 11, 20, m2, MutexOp::Lock);
    push_mutex(r(1), 21, 30, m2, MutexOp::Unlock);
    push_mutex(r(1), 31, 40, m1, MutexOp::Unlock);
    push_mutex(r(2), 41, 50, m2, MutexOp::Lock);
    push_mutex(r(2), 51, 60, m1, MutexOp::Lock);
    push_mutex(r(2), 61, 70, m1, MutexOp::Unlock);
    push_mutex(r(2), 71, 80, m2, MutexOp::Unlock);
    let mut trace = builder.finish().unwrap();

    let results = run_standard(&mut trace);
    let result = find(&results, BugKind::PossibleCyclicDeadlock).expect("P05 expected");
    assert_eq!(result.severity, Severity::Critical);
    let mut routines: Vec<RoutineId> = result.secondary.iter().map(|e| e.routine()).collect();
    routines.sort();
    routines.dedup();
    assert_eq!(routines, vec![r(1), r(2)], "cycle names both routines");
    // No unlock-before-lock noise: every unlock is same-routine covered.
    assert!(find(&results, BugKind::PossibleUnlockBeforeLock).is_none());
}

#[test]
fn test_unbuffered_leak_pair_mutual_witnesses() {
    let mut builder = TraceBuilder::new(2);
    builder
        .push(
            r(1),
            1,
            2,
            "main.go",
            3,
            ElementKind::Fork(skein_analysis::trace::ForkEvent { child: r(2) }),
        )
        .unwrap();
    builder
        .push(
            r(1),
            5,
            0,
            "main.go",
            10,
            ElementKind::Channel(ChannelEvent::send(ch(0x40), o(7), 0, 0)),
        )
        .unwrap();
    builder
        .push(
            r(2),
            6,
            0,
            "worker.go",
            20,
            ElementKind::Channel(ChannelEvent::recv(ch(0x40), o(7), 0, 0)),
        )
        .unwrap();
    let mut trace = builder.finish().unwrap();

    let results = run_standard(&mut trace);
    let leaks: Vec<_> = results
        .iter()
        .filter(|result| result.kind == BugKind::LeakUnbufferedWithPartner)
        .collect();
    assert_eq!(leaks.len(), 2, "both blocked sides are witnesses of each other");
    let primaries: Vec<RoutineId> = leaks.iter().map(|l| l.primary[0].routine()).collect();
    assert!(primaries.contains(&r(1)));
    assert!(primaries.contains(&r(2)));
}

#[test]
fn test_select_without_partner_per_case() {
    let mut builder = TraceBuilder::new(1);
    let cases = vec![
        SelectCase::send(ch(0x51), o(0), 0),
        SelectCase::send(ch(0x52), o(0), 0),
    ]
    .into_iter()
    .collect();
    builder
        .push(
            r(1),
            5,
            0,
            "main.go",
            42,
            ElementKind::Select(SelectEvent::new(cases, None, false)),
        )
        .unwrap();
    let mut trace = builder.finish().unwrap();

    let results = run_standard(&mut trace);
    let warnings: Vec<_> = results
        .iter()
        .filter(|result| result.kind == BugKind::SelectWithoutPartner)
        .collect();
    assert_eq!(warnings.len(), 2, "one A08 per case");
    for warning in warnings {
        assert_eq!(warning.severity, Severity::Warning);
    }
}

#[test]
fn test_negative_wait_group_via_max_flow() {
    let wg = PrimitiveId::new(0x60);
    let mut builder = TraceBuilder::new(3);
    builder
        .push(
            r(1),
            1,
            10,
            "main.go",
            5,
            ElementKind::WaitGroup(WaitGroupEvent::change(wg, 1, 1)),
        )
        .unwrap();
    builder
        .push(
            r(2),
            2,
            20,
            "worker.go",
            8,
            ElementKind::WaitGroup(WaitGroupEvent::change(wg, -1, 0)),
        )
        .unwrap();
    builder
        .push(
            r(3),
            3,
            30,
            "worker.go",
            8,
            ElementKind::WaitGroup(WaitGroupEvent::change(wg, -1, -1)),
        )
        .unwrap();
    builder
        .push(
            r(1),
            40,
            50,
            "main.go",
            9,
            ElementKind::WaitGroup(WaitGroupEvent::wait(wg)),
        )
        .unwrap();
    let mut trace = builder.finish().unwrap();

    let results = run_standard(&mut trace);
    let result = find(&results, BugKind::PossibleNegativeWaitGroup).expect("P03 expected");
    assert_eq!(result.severity, Severity::Critical);
    assert!(!result.primary.is_empty());
}
