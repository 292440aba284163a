//! # aeolus-ndp::rtx
//!
//! The retransmission-timer scanner: a single periodic event source that
//! sweeps every registered flow instead of one timer per source.

use crate::source::NdpSrc;
use aeolus_engine::{eventlist::EventSource, sim::Simulation};
use aeolus_types::{id::SourceId, time::SimTime};
use std::{cell::RefCell, rc::Rc};

pub struct NdpRtxTimerScanner {
    source_id: SourceId,
    period: SimTime,
    srcs: Vec<Rc<RefCell<NdpSrc>>>,
}

impl NdpRtxTimerScanner {
    pub fn new(source_id: SourceId, period: SimTime) -> Self {
        assert!(period > 0, "scan period must be positive");
        Self {
            source_id,
            period,
            srcs: Vec::new(),
        }
    }

    pub fn register(&mut self, src: Rc<RefCell<NdpSrc>>) {
        self.srcs.push(src);
    }

    /// Arms the first sweep, one period from now.
    pub fn start(&self, ctx: &mut Simulation) {
        ctx.eventlist.schedule_in(self.source_id, self.period);
    }
}

impl EventSource for NdpRtxTimerScanner {
    fn do_next_event(&mut self, ctx: &mut Simulation) {
        for src in &self.srcs {
            src.borrow_mut().check_timeout(ctx);
        }
        ctx.eventlist.schedule_in(self.source_id, self.period);
    }
}
