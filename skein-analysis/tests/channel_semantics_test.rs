//! Channel clock semantics: unbuffered synchronization, buffered
//! out-of-order delivery, hold lists, closed-channel receives, and the
//! concurrent-receive predicate.

use skein_analysis::clock::HappensBefore;
use skein_analysis::engine::analyze;
use skein_analysis::trace::{
    ChannelEvent, ElementKind, ForkEvent, Trace, TraceBuilder,
};
use skein_core::cancel::CancelToken;
use skein_core::config::AnalysisConfig;
use skein_core::results::{AnalysisResult, BugKind, MemorySink, Severity};
use skein_core::types::{EventId, OpId, PrimitiveId, RoutineId};

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
    let mut sink = MemorySink::new();
    analyze(
        trace,
        &AnalysisConfig::standard(),
        &mut sink,
        &CancelToken::new(),
    )
    .unwrap();
    sink.into_results()
}

#[test]
fn test_unbuffered_pair_is_synchronized() {
    let mut builder = TraceBuilder::new(2);
    builder
        .push(r(1), 1, 2, "main.go", 1, ElementKind::Fork(ForkEvent { child: r(2) }))
        .unwrap();
    let send = builder
        .push(
            r(1),
            5,
            10,
            "main.go",
            2,
            ElementKind::Channel(ChannelEvent::send(ch(1), o(1), 0, 0)),
        )
        .unwrap();
    let recv = builder
        .push(
            r(2),
            6,
            11,
            "worker.go",
            3,
            ElementKind::Channel(ChannelEvent::recv(ch(1), o(1), 0, 0)),
        )
        .unwrap();
    let mut trace = builder.finish().unwrap();
    run_standard(&mut trace);

    let send_vc = &trace.element(send).vc;
    let recv_vc = &trace.element(recv).vc;
    assert_eq!(
        send_vc.happens_before(recv_vc),
        HappensBefore::Before,
        "the joint transition must order send before recv"
    );
}

#[test]
fn test_fork_keeps_parent_and_child_concurrent() {
    let mut builder = TraceBuilder::new(2);
    let fork = builder
        .push(r(1), 1, 2, "main.go", 1, ElementKind::Fork(ForkEvent { child: r(2) }))
        .unwrap();
    // Two operations on unrelated channels; neither synchronizes.
    let parent_op = builder
        .push(
            r(1),
            5,
            10,
            "main.go",
            2,
            ElementKind::Channel(ChannelEvent::send(ch(1), o(1), 1, 0)),
        )
        .unwrap();
    let child_op = builder
        .push(
            r(2),
            6,
            11,
            "worker.go",
            3,
            ElementKind::Channel(ChannelEvent::send(ch(2), o(2), 1, 0)),
        )
        .unwrap();
    let mut trace = builder.finish().unwrap();
    run_standard(&mut trace);

    let parent_vc = &trace.element(parent_op).vc;
    let child_vc = &trace.element(child_op).vc;
    assert_eq!(
        parent_vc.happens_before(child_vc),
        HappensBefore::Concurrent,
        "post-fork parent and child ops are unordered"
    );
    // The child inherited the parent component the fork observed.
    let fork_vc = &trace.element(fork).vc;
    assert_eq!(child_vc.value(r(1)), fork_vc.value(r(1)));
}

#[test]
fn test_buffered_out_of_order_delivery() {
    // Two values in a capacity-2 buffer consumed in reverse oID order.
    let mut builder = TraceBuilder::new(2);
    builder
        .push(
            r(1),
            1,
            10,
            "main.go",
            1,
            ElementKind::Channel(ChannelEvent::send(ch(5), o(1), 2, 0)),
        )
        .unwrap();
    builder
        .push(
            r(1),
            11,
            20,
            "main.go",
            2,
            ElementKind::Channel(ChannelEvent::send(ch(5), o(2), 2, 1)),
        )
        .unwrap();
    let first_recv = builder
        .push(
            r(2),
            21,
            30,
            "worker.go",
            3,
            ElementKind::Channel(ChannelEvent::recv(ch(5), o(2), 2, 2)),
        )
        .unwrap();
    let second_recv = builder
        .push(
            r(2),
            31,
            40,
            "worker.go",
            4,
            ElementKind::Channel(ChannelEvent::recv(ch(5), o(1), 2, 1)),
        )
        .unwrap();
    let mut trace = builder.finish().unwrap();
    let results = run_standard(&mut trace);

    assert!(!trace.element(first_recv).vc.is_empty());
    assert!(!trace.element(second_recv).vc.is_empty());
    assert!(
        results.iter().all(|res| res.severity != Severity::Critical),
        "out-of-order buffered delivery is not a bug"
    );
}

#[test]
fn test_hold_list_defers_early_receive() {
    // The receive sorts before the send; it parks and is retried after
    // the send fills the buffer.
    let mut builder = TraceBuilder::new(2);
    let recv = builder
        .push(
            r(2),
            1,
            5,
            "worker.go",
            1,
            ElementKind::Channel(ChannelEvent::recv(ch(6), o(1), 1, 1)),
        )
        .unwrap();
    let send = builder
        .push(
            r(1),
            2,
            10,
            "main.go",
            2,
            ElementKind::Channel(ChannelEvent::send(ch(6), o(1), 1, 0)),
        )
        .unwrap();
    let mut trace = builder.finish().unwrap();
    let results = run_standard(&mut trace);

    let send_vc = trace.element(send).vc.clone();
    let recv_vc = trace.element(recv).vc.clone();
    assert!(!send_vc.is_empty());
    assert!(!recv_vc.is_empty(), "parked receive is processed on retry");
    assert!(
        !results
            .iter()
            .any(|res| matches!(res.kind, BugKind::LeakBufferedWithoutPartner)),
        "a drained hold list leaves no leak candidates"
    );
}

#[test]
fn test_concurrent_receives_are_reported() {
    // Both values are buffered before the fork, so the two receives in
    // the children are concurrent.
    let mut builder = TraceBuilder::new(3);
    builder
        .push(
            r(1),
            1,
            10,
            "main.go",
            1,
            ElementKind::Channel(ChannelEvent::send(ch(7), o(1), 2, 0)),
        )
        .unwrap();
    builder
        .push(
            r(1),
            11,
            20,
            "main.go",
            2,
            ElementKind::Channel(ChannelEvent::send(ch(7), o(2), 2, 1)),
        )
        .unwrap();
    builder
        .push(r(1), 21, 22, "main.go", 3, ElementKind::Fork(ForkEvent { child: r(2) }))
        .unwrap();
    builder
        .push(r(1), 23, 24, "main.go", 4, ElementKind::Fork(ForkEvent { child: r(3) }))
        .unwrap();
    builder
        .push(
            r(2),
            25,
            30,
            "worker.go",
            5,
            ElementKind::Channel(ChannelEvent::recv(ch(7), o(1), 2, 2)),
        )
        .unwrap();
    builder
        .push(
            r(3),
            26,
            40,
            "worker.go",
            6,
            ElementKind::Channel(ChannelEvent::recv(ch(7), o(2), 2, 1)),
        )
        .unwrap();
    let mut trace = builder.finish().unwrap();
    let results = run_standard(&mut trace);

    let report = results
        .iter()
        .find(|res| res.kind == BugKind::ConcurrentRecv)
        .expect("A07 expected");
    assert_eq!(report.severity, Severity::Warning);
    let routines = [report.primary[0].routine(), report.secondary[0].routine()];
    assert!(routines.contains(&r(2)) && routines.contains(&r(3)));
}

#[test]
fn test_actual_recv_on_closed() {
    let mut builder = TraceBuilder::new(2);
    builder
        .push(
            r(1),
            1,
            10,
            "main.go",
            1,
            ElementKind::Channel(ChannelEvent::close(ch(8))),
        )
        .unwrap();
    builder
        .push(
            r(2),
            11,
            20,
            "worker.go",
            2,
            ElementKind::Channel(ChannelEvent::recv(ch(8), o(0), 0, 0).observed_closed()),
        )
        .unwrap();
    let mut trace = builder.finish().unwrap();
    let results = run_standard(&mut trace);

    let report = results
        .iter()
        .find(|res| res.kind == BugKind::RecvOnClosed)
        .expect("A02 expected");
    assert_eq!(report.primary[0].routine(), r(2));
    assert_eq!(report.secondary[0].routine(), r(1));
}

#[test]
fn test_rerun_is_idempotent() {
    let build = || {
        let mut builder = TraceBuilder::new(2);
        builder
            .push(r(1), 1, 2, "main.go", 1, ElementKind::Fork(ForkEvent { child: r(2) }))
            .unwrap();
        builder
            .push(
                r(1),
                5,
                0,
                "main.go",
                2,
                ElementKind::Channel(ChannelEvent::send(ch(9), o(7), 0, 0)),
            )
            .unwrap();
        builder
            .push(
                r(2),
                6,
                0,
                "worker.go",
                3,
                ElementKind::Channel(ChannelEvent::recv(ch(9), o(7), 0, 0)),
            )
            .unwrap();
        builder.finish().unwrap()
    };
    let mut trace = build();
    let first = run_standard(&mut trace);
    let second = run_standard(&mut trace);
    assert_eq!(first, second, "re-running with reset state is deterministic");
}

#[test]
fn test_event_ids_are_stable_under_analysis() {
    let mut builder = TraceBuilder::new(1);
    let id = builder
        .push(
            r(1),
            1,
            10,
            "main.go",
            1,
            ElementKind::Channel(ChannelEvent::send(ch(1), o(1), 1, 0)),
        )
        .unwrap();
    let mut trace = builder.finish().unwrap();
    run_standard(&mut trace);
    assert_eq!(id, EventId::from_index(0));
    assert_eq!(trace.element(id).t_post, 10);
}
