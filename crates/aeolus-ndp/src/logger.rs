//! # aeolus-ndp::logger
//!
//! Periodic throughput sampler: every period it writes one rate record per
//! monitored sink into the run log, so throughput over time can be read
//! out of the log after the experiment.

use crate::sink::NdpSink;
use aeolus_engine::{eventlist::EventSource, logfile::LogfileRef, net::PacketSink, sim::Simulation};
use aeolus_types::{
    id::SourceId,
    time::{SimTime, PS_PER_SEC},
};
use std::{cell::RefCell, rc::Rc};

pub struct NdpSinkLoggerSampling {
    source_id: SourceId,
    period: SimTime,
    logfile: LogfileRef,
    /// Monitored sinks and the cumulative byte count at the last sample.
    sinks: Vec<(Rc<RefCell<NdpSink>>, u64)>,
}

impl NdpSinkLoggerSampling {
    pub fn new(source_id: SourceId, period: SimTime, logfile: LogfileRef) -> Self {
        assert!(period > 0, "sampling period must be positive");
        Self {
            source_id,
            period,
            logfile,
            sinks: Vec::new(),
        }
    }

    pub fn monitor_sink(&mut self, sink: Rc<RefCell<NdpSink>>) {
        self.sinks.push((sink, 0));
    }

    /// Arms the first sample, one period from now.
    pub fn start(&self, ctx: &mut Simulation) {
        ctx.eventlist.schedule_in(self.source_id, self.period);
    }
}

impl EventSource for NdpSinkLoggerSampling {
    fn do_next_event(&mut self, ctx: &mut Simulation) {
        let now = ctx.now();
        for (sink, last) in &mut self.sinks {
            let (name, cum) = {
                let s = sink.borrow();
                (s.node_name().to_string(), s.cum_bytes())
            };
            let delta = cum - *last;
            let rate_bps =
                ((delta as u128 * 8 * PS_PER_SEC as u128) / self.period as u128) as u64;
            self.logfile
                .borrow_mut()
                .write_record(now, &format!("ndp_sink {name} rate={rate_bps} cum={cum}"));
            *last = cum;
        }
        ctx.eventlist.schedule_in(self.source_id, self.period);
    }
}
