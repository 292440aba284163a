//! # aeolus-engine::net::pipe
//!
//! The propagation-delay element. A pipe never drops: on receive it parks
//! the packet for exactly `delay` and schedules itself; when the event
//! fires it hands the head packet to the next hop. The delay is constant,
//! so in-flight packets stay FIFO.

use super::{forward, PacketSink};
use crate::{eventlist::EventSource, packet::Packet, sim::Simulation};
use aeolus_types::{
    id::SourceId,
    time::{checked_add, SimTime},
};
use std::collections::VecDeque;

pub struct Pipe {
    source_id: SourceId,
    delay: SimTime,
    nodename: String,
    inflight: VecDeque<(SimTime, Packet)>,
}

impl Pipe {
    pub fn new(source_id: SourceId, delay: SimTime, nodename: String) -> Self {
        Self {
            source_id,
            delay,
            nodename,
            inflight: VecDeque::new(),
        }
    }

    pub fn delay(&self) -> SimTime {
        self.delay
    }
}

impl PacketSink for Pipe {
    fn receive_packet(&mut self, pkt: Packet, ctx: &mut Simulation) {
        let arrival = checked_add(ctx.now(), self.delay).expect("pipe arrival overflowed SimTime");
        self.inflight.push_back((arrival, pkt));
        ctx.eventlist.schedule_at(self.source_id, arrival);
    }

    fn node_name(&self) -> &str {
        &self.nodename
    }
}

impl EventSource for Pipe {
    fn do_next_event(&mut self, ctx: &mut Simulation) {
        let Some((arrival, pkt)) = self.inflight.pop_front() else {
            panic!("pipe {} fired with nothing in flight", self.nodename);
        };
        assert_eq!(arrival, ctx.now(), "pipe delivery out of order");
        forward(pkt, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::testutil::collector;
    use crate::{packet::PacketKind, route::Route};
    use aeolus_types::time::sim_from_us;
    use std::{cell::RefCell, rc::Rc};

    #[test]
    fn pipe_delivers_after_its_delay_in_fifo_order() {
        let mut sim = Simulation::new(1);
        let (c, sink) = collector("dst");
        let pid = sim.ids.next_source_id();
        let pipe = Rc::new(RefCell::new(Pipe::new(pid, sim_from_us(3), "p0".into())));
        sim.eventlist.attach(pid, pipe.clone());

        let pipe_sink: crate::net::SinkRef = pipe.clone();
        let route = Rc::new(Route::new(vec![pipe_sink, sink]));
        for seq in 0..3u64 {
            let pkt = Packet::new_data(seq, 1, seq, 1500, route.clone(), 0);
            forward(pkt, &mut sim);
        }
        sim.run();

        let c = c.borrow();
        let got = &c.got;
        assert_eq!(got.len(), 3);
        for (i, (kind, seq, t, _)) in got.iter().enumerate() {
            assert_eq!(*kind, PacketKind::Data);
            assert_eq!(*seq, i as u64);
            assert_eq!(*t, sim_from_us(3));
        }
    }
}
