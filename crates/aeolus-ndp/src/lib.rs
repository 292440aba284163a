//! # aeolus-ndp
//!
//! The NDP transport endpoints. The source sends its first window blind,
//! then relies on the switch fabric's trimming: a trimmed packet reaches
//! the sink as a bare header, the sink nacks it immediately and pulls its
//! retransmission at line rate, while acks clock new data out. Full losses
//! (first-RTT drops, control overflow) are recovered by the periodic
//! retransmission-timer scanner.
//!
//! Endpoints implement the engine's `PacketSink` capability and hang off
//! routes like any other network element; they know nothing about queue
//! internals beyond the packets they see.

mod logger;
mod path;
mod rtx;
mod sink;
mod source;

pub use logger::NdpSinkLoggerSampling;
pub use rtx::NdpRtxTimerScanner;
pub use sink::NdpSink;
pub use source::NdpSrc;

/// Default minimum retransmission timeout: 50 ms, large enough to avoid
/// spurious retransmits under incast.
pub const DEFAULT_MIN_RTO_US: u64 = 50_000;

/// Default period of the retransmission-timer scanner.
pub const DEFAULT_RTX_SCAN_MS: u64 = 10;

#[cfg(test)]
mod tests {
    use super::*;
    use aeolus_engine::{
        net::{AeolusQueue, Pipe, SinkRef},
        route::Route,
        sim::Simulation,
    };
    use aeolus_types::{
        config::{RouteStrategy, HOST_NIC_BPS},
        time::{sim_from_ms, sim_from_secs, sim_from_us},
    };
    use std::{cell::RefCell, rc::Rc};

    struct Rig {
        sim: Simulation,
        src: Rc<RefCell<NdpSrc>>,
        sink: Rc<RefCell<NdpSink>>,
        fwd_queue: Rc<RefCell<AeolusQueue>>,
    }

    /// Two hosts joined by one bidirectional link: an Aeolus queue and a
    /// 1 us pipe each way, NDP endpoints at both ends.
    fn two_host_rig(seed: u64, queue_max: u64, drop_thresh: u64, flow_bytes: u64) -> Rig {
        let mut sim = Simulation::new(seed);
        sim.eventlist.set_end_time(sim_from_secs(1.0));

        let link = |sim: &mut Simulation, tag: &str| -> (Rc<RefCell<AeolusQueue>>, SinkRef) {
            let qid = sim.ids.next_source_id();
            let q = Rc::new(RefCell::new(AeolusQueue::new(
                qid,
                HOST_NIC_BPS,
                queue_max,
                drop_thresh,
                format!("q_{tag}"),
                None,
            )));
            sim.eventlist.attach(qid, q.clone());
            let pid = sim.ids.next_source_id();
            let p = Rc::new(RefCell::new(Pipe::new(
                pid,
                sim_from_us(1),
                format!("p_{tag}"),
            )));
            sim.eventlist.attach(pid, p.clone());
            (q, p as SinkRef)
        };
        let (fwd_queue, fwd_pipe) = link(&mut sim, "fwd");
        let (rev_queue, rev_pipe) = link(&mut sim, "rev");

        let flow_id = sim.ids.next_flow_id();
        let sink_id = sim.ids.next_source_id();
        let sink = Rc::new(RefCell::new(NdpSink::new(
            sink_id,
            flow_id,
            "ndp_sink_0_1".into(),
            RouteStrategy::SinglePath,
            HOST_NIC_BPS,
        )));
        sim.eventlist.attach(sink_id, sink.clone());

        let src_id = sim.ids.next_source_id();
        let src = Rc::new(RefCell::new(NdpSrc::new(
            src_id,
            flow_id,
            "ndp_0_1".into(),
            RouteStrategy::SinglePath,
        )));
        sim.eventlist.attach(src_id, src.clone());

        let out = Rc::new(Route::new(vec![
            fwd_queue.clone() as SinkRef,
            fwd_pipe,
            sink.clone() as SinkRef,
        ]));
        let back = Rc::new(Route::new(vec![
            rev_queue.clone() as SinkRef,
            rev_pipe,
            src.clone() as SinkRef,
        ]));
        sink.borrow_mut().set_paths(vec![back]);

        let scan_id = sim.ids.next_source_id();
        let scanner = Rc::new(RefCell::new(NdpRtxTimerScanner::new(
            scan_id,
            sim_from_ms(1),
        )));
        sim.eventlist.attach(scan_id, scanner.clone());
        scanner.borrow_mut().register(src.clone());
        scanner.borrow().start(&mut sim);

        {
            let mut s = src.borrow_mut();
            s.set_flowsize(flow_bytes);
            s.set_rto(sim_from_ms(2));
            s.connect(vec![out], 0, &mut sim);
        }
        Rig {
            sim,
            src,
            sink,
            fwd_queue,
        }
    }

    #[test]
    fn uncongested_flow_completes_without_trimming() {
        let mut r = two_host_rig(13, 150_000, 0, 10 * 1500);
        r.sim.run();
        assert!(r.src.borrow().is_done());
        assert_eq!(r.sink.borrow().cum_bytes(), 15_000);
        assert_eq!(r.fwd_queue.borrow().num_stripped(), 0);
        assert_eq!(r.src.borrow().num_rtx_sent(), 0);
    }

    #[test]
    fn trimmed_burst_is_recovered_through_nack_and_pull() {
        // A 3-packet buffer against a 23-packet blind burst: most of the
        // window is trimmed, and every trimmed packet must come back via
        // the pull path.
        let mut r = two_host_rig(13, 4_500, 100_000, 20 * 1500);
        r.sim.run();
        assert!(r.src.borrow().is_done());
        assert_eq!(r.sink.borrow().cum_bytes(), 30_000);
        assert!(r.fwd_queue.borrow().num_stripped() > 0);
        assert!(r.sink.borrow().num_headers() > 0);
        assert!(r.src.borrow().num_rtx_sent() > 0);
        // Strips may outnumber admitted headers, never the reverse.
        let q = r.fwd_queue.borrow();
        assert!(q.num_stripped() >= q.num_headers());
    }

    #[test]
    fn first_rtt_drops_are_recovered_by_timeout() {
        // Threshold zero: the overflowing part of the blind burst is
        // dropped outright, so only the timer can recover it.
        let mut r = two_host_rig(13, 4_500, 0, 6 * 1500);
        r.sim.run();
        assert!(r.src.borrow().is_done());
        assert_eq!(r.sink.borrow().cum_bytes(), 9_000);
        let q = r.fwd_queue.borrow();
        assert_eq!(q.num_stripped(), 0);
        assert!(q.num_dropped_low() > 0);
        assert!(r.src.borrow().num_timeouts() > 0);
    }

    #[test]
    fn identical_seeds_give_identical_delivery_traces() {
        let run = |seed: u64| {
            let mut r = two_host_rig(seed, 4_500, 100_000, 20 * 1500);
            r.sink.borrow_mut().set_record_trace(true);
            r.sim.run();
            assert!(r.src.borrow().is_done());
            let trace = r.sink.borrow().delivery_trace().to_vec();
            let finish_time = r.src.borrow().finish_time();
            (trace, finish_time)
        };
        assert_eq!(run(13), run(13));
    }
}
