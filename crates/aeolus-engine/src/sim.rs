//! # aeolus-engine::sim
//!
//! The `Simulation` struct is the explicit context every component works
//! against: it owns the event list, the master deterministic RNG, and the
//! monotonic ID generator. Components receive `&mut Simulation` in each
//! callback; nothing in the engine touches process-wide state.

use crate::{
    eventlist::{EventList, EventSourceRef},
    ids::IdGen,
};
use aeolus_types::{id::SourceId, time::SimTime};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// The main simulation controller.
pub struct Simulation {
    /// The priority queue of all scheduled future events.
    pub eventlist: EventList,
    /// The central source of all randomness. Seeded once; never a
    /// thread-local.
    pub rng: ChaCha20Rng,
    /// Generator of unique, monotonic IDs.
    pub ids: IdGen,
}

impl Simulation {
    /// Creates a new simulation context from an explicit seed.
    pub fn new(seed: u64) -> Self {
        Self {
            eventlist: EventList::new(),
            rng: ChaCha20Rng::seed_from_u64(seed),
            ids: IdGen::new(),
        }
    }

    /// The current simulated time.
    pub fn now(&self) -> SimTime {
        self.eventlist.now()
    }

    /// Allocates a fresh source id and registers `source` under it.
    pub fn attach(&mut self, source: EventSourceRef) -> SourceId {
        let id = self.ids.next_source_id();
        self.eventlist.attach(id, source);
        id
    }

    /// Executes the next due event. Returns `false` once the event list is
    /// exhausted or the end time has been reached.
    pub fn do_next_event(&mut self) -> bool {
        let Some((_, source)) = self.eventlist.pop_due() else {
            return false;
        };
        source.borrow_mut().do_next_event(self);
        true
    }

    /// Runs the simulation until the event queue is empty or the end time
    /// is reached.
    pub fn run(&mut self) {
        while self.do_next_event() {}
        tracing::debug!(now = self.now(), "event list drained");
    }
}
