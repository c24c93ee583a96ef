//! All mutable engine state: current clocks and the per-primitive
//! auxiliary indices the predicates consume.
//!
//! Everything lives in one struct owned by the driver; `reset()` is the
//! explicit initialization ceremony between runs. Values stored in the
//! indices carry their captured clocks inline so predicates never chase
//! a second lookup.

use serde::Serialize;
use skein_core::types::collections::{FxHashMap, FxHashSet, SmallVec8, VecDeque};
use skein_core::types::{EventId, OpId, PrimitiveId, RoutineId};

use crate::clock::VectorClock;
use crate::trace::channel::ChannelDir;
use crate::trace::event::PartnerRef;
use crate::trace::mutex::MutexOp;

/// Read or write side of a lock hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    Read,
    Write,
}

impl LockMode {
    /// Whether holds of the two modes on the same lock can block each
    /// other (everything except read/read).
    pub fn blocks(self, other: LockMode) -> bool {
        !(self == LockMode::Read && other == LockMode::Read)
    }
}

/// Hold counters for one lock id within one routine. Concurrent readers
/// are counted so an unlock of one reader does not drop the whole hold.
#[derive(Debug, Clone, Copy, Default)]
pub struct LockHold {
    pub writers: u32,
    pub readers: u32,
}

impl LockHold {
    pub fn mode(&self) -> LockMode {
        if self.writers > 0 {
            LockMode::Write
        } else {
            LockMode::Read
        }
    }

    pub fn is_empty(&self) -> bool {
        self.writers == 0 && self.readers == 0
    }
}

/// The set of locks one routine currently holds.
#[derive(Debug, Clone, Default)]
pub struct Lockset {
    held: FxHashMap<PrimitiveId, LockHold>,
}

impl Lockset {
    pub fn acquire(&mut self, lock: PrimitiveId, mode: LockMode) {
        let hold = self.held.entry(lock).or_default();
        match mode {
            LockMode::Write => hold.writers += 1,
            LockMode::Read => hold.readers += 1,
        }
    }

    /// Release one hold. Returns false if the routine does not hold the
    /// lock in the given mode.
    pub fn release(&mut self, lock: PrimitiveId, mode: LockMode) -> bool {
        let Some(hold) = self.held.get_mut(&lock) else {
            return false;
        };
        let released = match mode {
            LockMode::Write => {
                if hold.writers == 0 {
                    false
                } else {
                    hold.writers -= 1;
                    true
                }
            }
            LockMode::Read => {
                if hold.readers == 0 {
                    false
                } else {
                    hold.readers -= 1;
                    true
                }
            }
        };
        if released && hold.is_empty() {
            self.held.remove(&lock);
        }
        released
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PrimitiveId, LockMode)> + '_ {
        self.held.iter().map(|(&id, hold)| (id, hold.mode()))
    }

    /// Inline copy for storing on snapshots and dependencies.
    pub fn snapshot(&self) -> SmallVec8<(PrimitiveId, LockMode)> {
        self.iter().collect()
    }
}

/// An event paired with its captured happens-before clock.
#[derive(Debug, Clone)]
pub struct ClockSnapshot {
    pub event: EventId,
    pub clock: VectorClock,
}

/// A completed channel operation with everything the predicates ask of it.
#[derive(Debug, Clone)]
pub struct OpSnapshot {
    pub event: PartnerRef,
    pub routine: RoutineId,
    pub clock: VectorClock,
    pub wclock: VectorClock,
    /// Locks the routine held when the op ran (mixed-deadlock analysis).
    pub lockset: SmallVec8<(PrimitiveId, LockMode)>,
}

/// The most recent successful mutex acquire on a lock id.
#[derive(Debug, Clone)]
pub struct AcquireSnapshot {
    pub event: EventId,
    pub clock: VectorClock,
    pub op: MutexOp,
}

/// One buffer position of a buffered channel. The clock persists after
/// release so the next writer of the position synchronizes with the
/// consumption of the previous value.
#[derive(Debug, Clone)]
pub struct BufSlot {
    pub occupied: bool,
    pub o_id: OpId,
    pub clock: VectorClock,
    pub wclock: VectorClock,
    pub sender: RoutineId,
}

impl BufSlot {
    fn vacant() -> Self {
        Self {
            occupied: false,
            o_id: OpId::new(0),
            clock: VectorClock::empty(),
            wclock: VectorClock::empty(),
            sender: RoutineId::new(1),
        }
    }
}

/// The buffer of one channel: fixed positions plus the occupancy count.
#[derive(Debug, Clone)]
pub struct ChannelBuffer {
    pub slots: Vec<BufSlot>,
    pub count: usize,
}

impl ChannelBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![BufSlot::vacant(); capacity.max(1)],
            count: 0,
        }
    }

    pub fn is_full(&self) -> bool {
        self.count >= self.slots.len()
    }

    pub fn is_drained(&self) -> bool {
        self.count == 0
    }
}

/// A blocked operation awaiting a partner, registered for leak analysis.
#[derive(Debug, Clone)]
pub struct LeakEntry {
    pub endpoint: PartnerRef,
    pub routine: RoutineId,
    pub dir: ChannelDir,
    pub buffered: bool,
    pub clock: VectorClock,
    pub lockset: SmallVec8<(PrimitiveId, LockMode)>,
    /// Set once a leak-with-partner result was emitted for this entry.
    pub reported: bool,
}

/// A lock acquired while other locks were held.
#[derive(Debug, Clone)]
pub struct LockDependency {
    pub routine: RoutineId,
    pub lock: PrimitiveId,
    pub mode: LockMode,
    pub lockset: SmallVec8<(PrimitiveId, LockMode)>,
    pub events: Vec<EventId>,
}

/// One recorded select case for the partner analysis.
#[derive(Debug, Clone)]
pub struct CaseRecord {
    pub select: EventId,
    pub index: usize,
    pub routine: RoutineId,
    pub channel: PrimitiveId,
    pub dir: ChannelDir,
    pub buffered: bool,
    pub clock: VectorClock,
    pub partner_found: bool,
}

/// A wait-group change with its captured clock.
#[derive(Debug, Clone)]
pub struct WgChange {
    pub event: EventId,
    pub routine: RoutineId,
    pub clock: VectorClock,
    pub delta: i64,
}

/// A mutex lock/unlock with its captured clock, for the
/// unlock-before-lock flow analysis.
#[derive(Debug, Clone)]
pub struct LockOp {
    pub event: EventId,
    pub routine: RoutineId,
    pub clock: VectorClock,
}

/// Strong and weak clock pair stored by indices that feed both updaters.
#[derive(Debug, Clone, Default)]
pub struct ClockPair {
    pub strong: VectorClock,
    pub weak: VectorClock,
}

/// Everything the engine mutates during a run.
#[derive(Debug, Default)]
pub struct EngineState {
    routines: usize,

    /// Happens-before clock per routine.
    pub current: Vec<VectorClock>,
    /// Must-happen-before clock per routine (no mutex edges).
    pub current_weak: Vec<VectorClock>,

    // ---- channels ----
    pub close_record: FxHashMap<PrimitiveId, EventId>,
    pub has_send: FxHashSet<PrimitiveId>,
    pub has_received: FxHashSet<PrimitiveId>,
    pub last_send: Vec<FxHashMap<PrimitiveId, ClockSnapshot>>,
    pub last_recv: Vec<FxHashMap<PrimitiveId, ClockSnapshot>>,
    pub most_recent_send: Vec<FxHashMap<PrimitiveId, OpSnapshot>>,
    pub most_recent_recv: Vec<FxHashMap<PrimitiveId, OpSnapshot>>,
    pub buffers: FxHashMap<PrimitiveId, ChannelBuffer>,
    pub hold_send: FxHashMap<PrimitiveId, VecDeque<PartnerRef>>,
    pub hold_recv: FxHashMap<PrimitiveId, VecDeque<PartnerRef>>,
    /// Buffer capacities from constructor records.
    pub channel_capacity: FxHashMap<PrimitiveId, u32>,

    // ---- mutexes ----
    pub rel_w: FxHashMap<PrimitiveId, VectorClock>,
    pub rel_r: FxHashMap<PrimitiveId, VectorClock>,
    pub currently_held: FxHashMap<PrimitiveId, EventId>,
    pub lockset: Vec<Lockset>,
    pub most_recent_acquire: FxHashMap<PrimitiveId, AcquireSnapshot>,
    pub all_locks: FxHashMap<PrimitiveId, Vec<LockOp>>,
    pub all_unlocks: FxHashMap<PrimitiveId, Vec<LockOp>>,
    pub lock_dependencies: FxHashMap<PrimitiveId, Vec<LockDependency>>,
    /// Set when a cross-thread release makes the resource-deadlock
    /// analysis unsound; the cycle search is skipped.
    pub deadlock_analysis_failed: bool,

    // ---- wait groups ----
    pub wg_adds: FxHashMap<PrimitiveId, Vec<WgChange>>,
    pub wg_dones: FxHashMap<PrimitiveId, Vec<WgChange>>,
    pub last_wg_change: FxHashMap<PrimitiveId, ClockPair>,

    // ---- conds ----
    pub cond_waiters: FxHashMap<PrimitiveId, VecDeque<RoutineId>>,

    // ---- onces ----
    pub once_witness: FxHashMap<PrimitiveId, ClockPair>,

    // ---- atomics ----
    pub last_atomic_write: FxHashMap<PrimitiveId, ClockPair>,

    // ---- leaks ----
    pub leaking_ops: FxHashMap<PrimitiveId, Vec<LeakEntry>>,

    // ---- selects ----
    pub select_cases: Vec<CaseRecord>,
    /// Selects whose cases are already recorded (a select reached through
    /// a partner joint and again through its own cursor records once).
    pub recorded_selects: FxHashSet<EventId>,

    // ---- routines ----
    pub all_forks: FxHashMap<RoutineId, EventId>,

    // ---- replay ----
    pub exit_code: Option<(i32, EventId)>,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routine_count(&self) -> usize {
        self.routines
    }

    /// Clear everything and size the clock vectors for a trace with
    /// `routines` routines. The root routine starts with one executed
    /// step on both clocks.
    pub fn reset(&mut self, routines: usize) {
        *self = Self::default();
        self.routines = routines;
        self.current = (0..routines).map(|_| VectorClock::new(routines)).collect();
        self.current_weak = self.current.clone();
        self.last_send = vec![FxHashMap::default(); routines];
        self.last_recv = vec![FxHashMap::default(); routines];
        self.most_recent_send = vec![FxHashMap::default(); routines];
        self.most_recent_recv = vec![FxHashMap::default(); routines];
        self.lockset = vec![Lockset::default(); routines];
        if routines > 0 {
            let root = RoutineId::new(1);
            // A fresh clock always has the root component in range.
            let _ = self.current[0].inc(root);
            let _ = self.current_weak[0].inc(root);
        }
    }

    /// The buffer for a channel, created from the recorded capacity on
    /// first touch.
    pub fn buffer_mut(&mut self, channel: PrimitiveId, q_size: u32) -> &mut ChannelBuffer {
        let capacity = self
            .channel_capacity
            .get(&channel)
            .copied()
            .unwrap_or(q_size)
            .max(q_size) as usize;
        self.buffers
            .entry(channel)
            .or_insert_with(|| ChannelBuffer::new(capacity))
    }

    /// Explicit per-table sizes, replacing any reflection-based estimate.
    pub fn size_report(&self) -> SizeReport {
        SizeReport {
            routines: self.routines,
            close_records: self.close_record.len(),
            send_snapshots: self.most_recent_send.iter().map(|m| m.len()).sum(),
            recv_snapshots: self.most_recent_recv.iter().map(|m| m.len()).sum(),
            buffered_channels: self.buffers.len(),
            held_operations: self.hold_send.values().map(|q| q.len()).sum::<usize>()
                + self.hold_recv.values().map(|q| q.len()).sum::<usize>(),
            lock_ids: self.all_locks.len(),
            lock_dependencies: self.lock_dependencies.values().map(|d| d.len()).sum(),
            wait_group_changes: self.wg_adds.values().map(|v| v.len()).sum::<usize>()
                + self.wg_dones.values().map(|v| v.len()).sum::<usize>(),
            cond_waiters: self.cond_waiters.values().map(|q| q.len()).sum(),
            leak_entries: self.leaking_ops.values().map(|v| v.len()).sum(),
            select_cases: self.select_cases.len(),
        }
    }
}

/// Per-table length counters for memory accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeReport {
    pub routines: usize,
    pub close_records: usize,
    pub send_snapshots: usize,
    pub recv_snapshots: usize,
    pub buffered_channels: usize,
    pub held_operations: usize,
    pub lock_ids: usize,
    pub lock_dependencies: usize,
    pub wait_group_changes: usize,
    pub cond_waiters: usize,
    pub leak_entries: usize,
    pub select_cases: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_marks_root_routine() {
        let mut state = EngineState::new();
        state.reset(3);
        assert_eq!(state.current[0].value(RoutineId::new(1)), 1);
        assert_eq!(state.current[1].value(RoutineId::new(2)), 0);
        assert_eq!(state.current_weak[0].value(RoutineId::new(1)), 1);
    }

    #[test]
    fn test_lockset_reader_counting() {
        let mut set = Lockset::default();
        let m = PrimitiveId::new(9);
        set.acquire(m, LockMode::Read);
        set.acquire(m, LockMode::Read);
        assert!(set.release(m, LockMode::Read));
        assert!(!set.is_empty(), "one reader still holds the lock");
        assert!(set.release(m, LockMode::Read));
        assert!(set.is_empty());
        assert!(!set.release(m, LockMode::Read));
    }

    #[test]
    fn test_lock_modes_blocking() {
        assert!(LockMode::Write.blocks(LockMode::Write));
        assert!(LockMode::Write.blocks(LockMode::Read));
        assert!(LockMode::Read.blocks(LockMode::Write));
        assert!(!LockMode::Read.blocks(LockMode::Read));
    }
}
