//! # aeolus-engine::eventlist
//!
//! The time-ordered scheduler of future callbacks that drives the whole
//! simulation. Entries are kept in a `BinaryHeap` with reversed ordering so
//! it behaves as a min-heap keyed on `(due, insertion_seq)`; the insertion
//! sequence number guarantees that events scheduled for the same instant
//! fire in insertion order, which is what makes runs reproducible.
//!
//! Scheduling policy: a source may have any number of pending events at
//! once; scheduling twice dispatches twice. `cancel` removes all pending
//! events of a source at once (lazily, via an epoch counter checked at
//! pop time) and is idempotent.

use crate::sim::Simulation;
use aeolus_types::{
    errors::SimError,
    id::SourceId,
    time::{checked_add, SimTime, MAX_SIM_TIME, SIM_EPOCH},
};
use fxhash::FxHashMap;
use std::{cell::RefCell, cmp::Ordering, collections::BinaryHeap, rc::Rc};

/// Anything the event list can call back at a scheduled time.
///
/// Sources are registered once with [`EventList::attach`] and addressed by
/// their `SourceId` from then on; the heap itself never holds a borrow.
pub trait EventSource {
    /// Invoked when a scheduled event for this source comes due. The
    /// callback runs to completion and may schedule further events,
    /// including for the current instant.
    fn do_next_event(&mut self, ctx: &mut Simulation);
}

pub type EventSourceRef = Rc<RefCell<dyn EventSource>>;

/// A scheduled entry. Only `(due, seq)` participate in the ordering; `seq`
/// is unique, so the order is total.
struct Queued {
    due: SimTime,
    seq: u64,
    epoch: u64,
    source: SourceId,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    /// `BinaryHeap` is a max-heap, so the ordering is reversed to make it
    /// a min-heap: earlier due time is greater, earlier insertion breaks
    /// ties.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// The priority queue of all scheduled future events.
pub struct EventList {
    now: SimTime,
    end_time: SimTime,
    insertion_seq: u64,
    heap: BinaryHeap<Queued>,
    sources: FxHashMap<SourceId, EventSourceRef>,
    /// Cancellation epochs. An entry whose recorded epoch is older than its
    /// source's current epoch is dead and skipped at pop time.
    epochs: FxHashMap<SourceId, u64>,
}

impl EventList {
    pub fn new() -> Self {
        Self {
            now: SIM_EPOCH,
            end_time: MAX_SIM_TIME,
            insertion_seq: 0,
            heap: BinaryHeap::new(),
            sources: FxHashMap::default(),
            epochs: FxHashMap::default(),
        }
    }

    /// The current simulated time. Monotonically non-decreasing.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Sets the upper bound on simulated time; events due later never fire.
    pub fn set_end_time(&mut self, t: SimTime) {
        self.end_time = t;
    }

    /// Registers a source under its id. Must happen before the first
    /// `schedule_at` for that id.
    pub fn attach(&mut self, id: SourceId, source: EventSourceRef) {
        self.sources.insert(id, source);
    }

    /// Schedules a callback for `source` at absolute time `due`.
    /// Scheduling into the past is a simulator bug and aborts.
    pub fn schedule_at(&mut self, source: SourceId, due: SimTime) {
        assert!(
            due >= self.now,
            "{}",
            SimError::PastTimeSchedule { due, now: self.now }
        );
        let seq = self.insertion_seq;
        self.insertion_seq = seq.checked_add(1).expect("insertion seq overflow");
        let epoch = self.epochs.get(&source).copied().unwrap_or(0);
        self.heap.push(Queued {
            due,
            seq,
            epoch,
            source,
        });
    }

    /// Schedules a callback for `source` at `now + delta`.
    pub fn schedule_in(&mut self, source: SourceId, delta: SimTime) {
        let due = checked_add(self.now, delta).expect("schedule_in overflowed SimTime");
        self.schedule_at(source, due);
    }

    /// Removes every pending event of `source`. Idempotent; events the
    /// source schedules afterwards are unaffected.
    pub fn cancel(&mut self, source: SourceId) {
        *self.epochs.entry(source).or_insert(0) += 1;
    }

    /// True if no live entry remains.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Pops the earliest live entry, advances `now` to its due time and
    /// returns it together with its source. Returns `None` when the heap
    /// is exhausted or the next entry lies beyond `end_time`.
    pub(crate) fn pop_due(&mut self) -> Option<(SimTime, EventSourceRef)> {
        loop {
            let due = self.heap.peek()?.due;
            if due > self.end_time {
                return None;
            }
            let entry = self.heap.pop()?;
            let current = self.epochs.get(&entry.source).copied().unwrap_or(0);
            if entry.epoch < current {
                continue; // cancelled
            }
            let source = self
                .sources
                .get(&entry.source)
                .unwrap_or_else(|| panic!("{}", SimError::UnknownSource(entry.source)))
                .clone();
            assert!(entry.due >= self.now, "time went backwards");
            self.now = entry.due;
            return Some((entry.due, source));
        }
    }
}

impl Default for EventList {
    fn default() -> Self {
        Self::new()
    }
}
