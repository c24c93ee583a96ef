//! Fixed-size vector clocks indexed by routine id.
//!
//! One component per routine of the trace, 1-based ids mapped onto a
//! dense `Vec<u32>`. The empty clock (length 0) is the "no prior
//! observation" sentinel; it compares `Concurrent` to every non-empty
//! clock and `Equal` only to itself.

use serde::{Deserialize, Serialize};
use skein_core::errors::ClockError;
use skein_core::types::RoutineId;

use super::ordering::HappensBefore;

/// A vector clock over the routines of one trace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorClock {
    inner: Vec<u32>,
}

impl VectorClock {
    /// All-zero clock for `routines` routines.
    pub fn new(routines: usize) -> Self {
        Self {
            inner: vec![0; routines],
        }
    }

    /// The empty sentinel clock.
    pub fn empty() -> Self {
        Self { inner: Vec::new() }
    }

    /// Number of routine components.
    pub fn size(&self) -> usize {
        self.inner.len()
    }

    /// Whether this is the empty sentinel.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// The component for `routine`, or 0 when out of range.
    pub fn value(&self, routine: RoutineId) -> u32 {
        self.inner.get(routine.index()).copied().unwrap_or(0)
    }

    /// In-place increment of the component for `routine`.
    pub fn inc(&mut self, routine: RoutineId) -> Result<(), ClockError> {
        let index = routine.index();
        match self.inner.get_mut(index) {
            Some(slot) => {
                *slot += 1;
                Ok(())
            }
            None => Err(ClockError::OutOfRange {
                index: routine.raw(),
                size: self.inner.len(),
            }),
        }
    }

    /// In-place componentwise max. `sync(self, self)` is a no-op.
    pub fn sync(&mut self, other: &VectorClock) -> Result<(), ClockError> {
        if self.inner.len() != other.inner.len() {
            return Err(ClockError::SizeMismatch {
                left: self.inner.len(),
                right: other.inner.len(),
            });
        }
        for (slot, &v) in self.inner.iter_mut().zip(other.inner.iter()) {
            if v > *slot {
                *slot = v;
            }
        }
        Ok(())
    }

    /// Pointwise comparison.
    ///
    /// Clocks of different sizes are incomparable, which makes the empty
    /// sentinel `Concurrent` to everything else.
    pub fn happens_before(&self, other: &VectorClock) -> HappensBefore {
        if self.inner.len() != other.inner.len() {
            return HappensBefore::Concurrent;
        }
        let mut less = false;
        let mut greater = false;
        for (&a, &b) in self.inner.iter().zip(other.inner.iter()) {
            if a < b {
                less = true;
            } else if a > b {
                greater = true;
            }
            if less && greater {
                return HappensBefore::Concurrent;
            }
        }
        match (less, greater) {
            (false, false) => HappensBefore::Equal,
            (true, false) => HappensBefore::Before,
            (false, true) => HappensBefore::After,
            (true, true) => HappensBefore::Concurrent,
        }
    }
}

impl std::fmt::Display for VectorClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.inner.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(id: u32) -> RoutineId {
        RoutineId::new(id)
    }

    #[test]
    fn test_new_is_all_zero() {
        let vc = VectorClock::new(3);
        assert_eq!(vc.size(), 3);
        for id in 1..=3 {
            assert_eq!(vc.value(r(id)), 0);
        }
    }

    #[test]
    fn test_inc_out_of_range() {
        let mut vc = VectorClock::new(2);
        assert!(vc.inc(r(3)).is_err());
        assert!(vc.inc(r(2)).is_ok());
        assert_eq!(vc.value(r(2)), 1);
    }

    #[test]
    fn test_sync_is_componentwise_max() {
        let mut a = VectorClock::new(3);
        let mut b = VectorClock::new(3);
        a.inc(r(1)).unwrap();
        a.inc(r(1)).unwrap();
        b.inc(r(2)).unwrap();
        a.sync(&b).unwrap();
        assert_eq!(a.value(r(1)), 2);
        assert_eq!(a.value(r(2)), 1);
    }

    #[test]
    fn test_sync_size_mismatch() {
        let mut a = VectorClock::new(3);
        let b = VectorClock::new(2);
        assert_eq!(
            a.sync(&b),
            Err(ClockError::SizeMismatch { left: 3, right: 2 })
        );
    }

    #[test]
    fn test_happens_before_orderings() {
        let mut a = VectorClock::new(2);
        let mut b = VectorClock::new(2);
        assert_eq!(a.happens_before(&b), HappensBefore::Equal);

        b.inc(r(1)).unwrap();
        assert_eq!(a.happens_before(&b), HappensBefore::Before);
        assert_eq!(b.happens_before(&a), HappensBefore::After);

        a.inc(r(2)).unwrap();
        assert_eq!(a.happens_before(&b), HappensBefore::Concurrent);
    }

    #[test]
    fn test_empty_clock_is_concurrent_to_everything() {
        let empty = VectorClock::empty();
        let vc = VectorClock::new(2);
        assert_eq!(empty.happens_before(&vc), HappensBefore::Concurrent);
        assert_eq!(vc.happens_before(&empty), HappensBefore::Concurrent);
        assert_eq!(empty.happens_before(&VectorClock::empty()), HappensBefore::Equal);
    }

    #[test]
    fn test_copy_is_independent() {
        let mut a = VectorClock::new(2);
        let snapshot = a.clone();
        a.inc(r(1)).unwrap();
        assert_eq!(snapshot.value(r(1)), 0);
    }
}
