//! # aeolus-engine::clock
//!
//! A periodic heartbeat event source. Its callback only re-arms itself,
//! which keeps time-based loggers progressing and prevents unbounded idle
//! skips. Not semantically required by the queues.

use crate::{eventlist::EventSource, sim::Simulation};
use aeolus_types::{id::SourceId, time::SimTime};

pub struct Clock {
    source_id: SourceId,
    period: SimTime,
    ticks: u64,
}

impl Clock {
    pub fn new(source_id: SourceId, period: SimTime) -> Self {
        assert!(period > 0, "clock period must be positive");
        Self {
            source_id,
            period,
            ticks: 0,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Arms the first tick, one period from now.
    pub fn start(&self, ctx: &mut Simulation) {
        ctx.eventlist.schedule_in(self.source_id, self.period);
    }
}

impl EventSource for Clock {
    fn do_next_event(&mut self, ctx: &mut Simulation) {
        self.ticks += 1;
        tracing::trace!(target: "events", now = ctx.now(), tick = self.ticks, "clock");
        ctx.eventlist.schedule_in(self.source_id, self.period);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    #[test]
    fn clock_rearms_until_the_end_time() {
        let mut sim = Simulation::new(1);
        let cid = sim.ids.next_source_id();
        let clock = Rc::new(RefCell::new(Clock::new(cid, 10)));
        sim.eventlist.attach(cid, clock.clone());
        clock.borrow().start(&mut sim);
        sim.eventlist.set_end_time(100);
        sim.run();
        assert_eq!(clock.borrow().ticks(), 10);
        assert_eq!(sim.now(), 100);
    }
}
