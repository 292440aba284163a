//! # aeolus-cli::run
//!
//! Wires the whole experiment together: topology, connection matrix, NDP
//! endpoints, loggers, then drives the event loop to the end time and
//! reports run totals.

use crate::{args::Cli, trace::read_trace};
use aeolus_engine::prelude::*;
use aeolus_ndp::{
    NdpRtxTimerScanner, NdpSink, NdpSinkLoggerSampling, NdpSrc, DEFAULT_RTX_SCAN_MS,
};
use anyhow::Result;
use fxhash::FxHashMap;
use serde::Serialize;
use std::{cell::RefCell, rc::Rc};

/// End-of-run totals, printed and optionally serialized.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub nodes: u32,
    pub conns: usize,
    pub seed: u64,
    pub flows_total: usize,
    pub flows_completed: usize,
    pub mean_fct_secs: Option<f64>,
    pub queues: AeolusCounters,
}

pub fn exec(args: Cli) -> Result<()> {
    let summary = run_sim(&args)?;

    tracing::info!(
        completed = summary.flows_completed,
        total = summary.flows_total,
        packets = summary.queues.packets,
        stripped = summary.queues.stripped,
        "run finished"
    );
    println!(
        "flows {}/{} completed, mean fct {}",
        summary.flows_completed,
        summary.flows_total,
        summary
            .mean_fct_secs
            .map_or_else(|| "n/a".to_string(), |f| format!("{f:.6}s"))
    );

    if let Some(path) = &args.summary {
        std::fs::write(path, serde_json::to_string_pretty(&summary)?)?;
        tracing::info!(path = %path.display(), "summary written");
    }
    Ok(())
}

/// Builds and runs one simulation, returning its totals.
pub(crate) fn run_sim(args: &Cli) -> Result<RunSummary> {
    if args.conns == 0 {
        return Err(ConfigError::Validation {
            message: "number of connections must be positive".into(),
        }
        .into());
    }
    let flows = read_trace(&args.trace)?;
    if flows.is_empty() {
        return Err(ConfigError::Validation {
            message: format!("flow trace {} is empty", args.trace.display()),
        }
        .into());
    }

    tracing::info!(
        conns = args.conns,
        nodes = args.nodes,
        cwnd = args.cwnd,
        queue_pkts = args.queue,
        subflows = args.subflows,
        seed = args.seed,
        strat = ?args.strat,
        "starting run"
    );

    let mut sim = Simulation::new(args.seed);
    sim.eventlist.set_end_time(sim_from_secs(args.end));

    let logfile: LogfileRef = Rc::new(RefCell::new(Logfile::new(&args.out)?));
    {
        let mut lg = logfile.borrow_mut();
        lg.set_start_time(SIM_EPOCH);
        lg.write_param("pktsize", DEFAULT_MTU_BYTES);
        lg.write_param("subflows", args.subflows);
        lg.write_param("hostnicrate", HOST_NIC_BPS);
        lg.write_param("corelinkrate", HOST_NIC_BPS * CORE_TO_HOST);
        lg.write_param(
            "rtt",
            format!("{:.9}", sim_as_secs(sim_from_us(DEFAULT_LINK_DELAY_US))),
        );
    }

    let clock_id = sim.ids.next_source_id();
    let clock = Rc::new(RefCell::new(Clock::new(clock_id, sim_from_ms(100))));
    sim.eventlist.attach(clock_id, clock.clone());
    clock.borrow().start(&mut sim);

    let spec = QueueSpec::aeolus(
        mem_from_pkts(args.queue),
        mem_from_pkts(args.drop_thresh),
    );
    let topo = FatTreeTopology::build(
        args.nodes,
        &spec,
        sim_from_us(DEFAULT_LINK_DELAY_US),
        None,
        &mut sim,
    );
    tracing::info!(hosts = topo.num_hosts(), k = topo.k(), "topology ready");

    let mut conns = ConnectionMatrix::new(topo.num_hosts());
    conns.set_random(args.conns, &mut sim.rng);

    let scan_id = sim.ids.next_source_id();
    let scanner = Rc::new(RefCell::new(NdpRtxTimerScanner::new(
        scan_id,
        sim_from_ms(DEFAULT_RTX_SCAN_MS),
    )));
    sim.eventlist.attach(scan_id, scanner.clone());
    scanner.borrow().start(&mut sim);

    let sampler_id = sim.ids.next_source_id();
    let sampler = Rc::new(RefCell::new(NdpSinkLoggerSampling::new(
        sampler_id,
        sim_from_ms(10),
        logfile.clone(),
    )));
    sim.eventlist.attach(sampler_id, sampler.clone());
    sampler.borrow().start(&mut sim);

    let strategy: RouteStrategy = args.strat.into();
    let mut path_cache: FxHashMap<(NodeId, NodeId), Vec<Rc<Route>>> = FxHashMap::default();
    let mut srcs: Vec<Rc<RefCell<NdpSrc>>> = Vec::new();

    for (i, (src_host, dst_host)) in conns.pairs().enumerate() {
        let flow_spec = flows[i % flows.len()];
        let raw_out = path_cache
            .entry((src_host, dst_host))
            .or_insert_with(|| topo.paths(src_host, dst_host))
            .clone();
        let raw_back = path_cache
            .entry((dst_host, src_host))
            .or_insert_with(|| topo.paths(dst_host, src_host))
            .clone();

        let flow_id = sim.ids.next_flow_id();
        let sink_id = sim.ids.next_source_id();
        let sink = Rc::new(RefCell::new(NdpSink::new(
            sink_id,
            flow_id,
            format!("ndp_sink_{src_host}_{dst_host}"),
            strategy,
            HOST_NIC_BPS,
        )));
        sim.eventlist.attach(sink_id, sink.clone());

        let src_id = sim.ids.next_source_id();
        let src = Rc::new(RefCell::new(NdpSrc::new(
            src_id,
            flow_id,
            format!("ndp_{src_host}_{dst_host}"),
            strategy,
        )));
        sim.eventlist.attach(src_id, src.clone());

        let out_routes: Vec<Rc<Route>> = raw_out
            .iter()
            .map(|r| Rc::new(r.extended_with(sink.clone() as SinkRef)))
            .collect();
        let back_routes: Vec<Rc<Route>> = raw_back
            .iter()
            .map(|r| Rc::new(r.extended_with(src.clone() as SinkRef)))
            .collect();
        sink.borrow_mut().set_paths(back_routes);

        {
            let mut s = src.borrow_mut();
            s.set_cwnd(args.cwnd as u64 * DEFAULT_MTU_BYTES as u64);
            s.set_flowsize(flow_spec.size_bytes);
            s.set_logfile(logfile.clone());
            s.connect(out_routes, sim_from_secs(flow_spec.start_secs), &mut sim);
        }

        scanner.borrow_mut().register(src.clone());
        sampler.borrow_mut().monitor_sink(sink.clone());
        {
            let mut lg = logfile.borrow_mut();
            lg.write_name(&format!("ndp_{src_host}_{dst_host}"));
            lg.write_name(&format!("ndp_sink_{src_host}_{dst_host}"));
        }
        tracing::info!(
            conn = i + 1,
            src = src_host,
            dst = dst_host,
            bytes = flow_spec.size_bytes,
            start = flow_spec.start_secs,
            "connection"
        );
        srcs.push(src);
    }
    let conn_count = srcs.len();
    tracing::info!(
        loaded = conn_count,
        mean_subflows = args.subflows,
        "connections loaded"
    );

    // GO!
    sim.run();

    let mut queues = AeolusCounters::default();
    for (_, q) in topo.aeolus_queues() {
        queues.accumulate(&q.borrow().counters());
    }
    let completed: Vec<f64> = srcs
        .iter()
        .filter_map(|s| s.borrow().fct().map(sim_as_secs))
        .collect();
    let mean_fct_secs = if completed.is_empty() {
        None
    } else {
        Some(completed.iter().sum::<f64>() / completed.len() as f64)
    };

    logfile.borrow_mut().flush();

    Ok(RunSummary {
        nodes: topo.num_hosts(),
        conns: conn_count,
        seed: args.seed,
        flows_total: conn_count,
        flows_completed: completed.len(),
        mean_fct_secs,
        queues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{LogFormat, Strat};
    use std::io::Write;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("aeolus-run-{}-{name}", std::process::id()))
    }

    fn test_args(name: &str, conns: u32, seed: u64) -> Cli {
        let trace = temp_path(&format!("{name}.trace"));
        let mut f = std::fs::File::create(&trace).unwrap();
        writeln!(f, "150000 0.0").unwrap();
        writeln!(f, "75000 0.001").unwrap();
        Cli {
            out: temp_path(&format!("{name}.log")),
            subflows: 1,
            conns,
            nodes: 16,
            cwnd: 23,
            queue: 8,
            trace,
            strat: Strat::Perm,
            seed,
            end: 1.0,
            drop_thresh: 0,
            summary: None,
            log: LogFormat::Human,
        }
    }

    #[test]
    fn small_run_completes_every_flow() {
        let args = test_args("small", 4, 13);
        let summary = run_sim(&args).unwrap();
        assert_eq!(summary.nodes, 16);
        assert_eq!(summary.flows_total, 4);
        assert_eq!(summary.flows_completed, 4);
        assert!(summary.queues.packets > 0);
        let log = std::fs::read_to_string(&args.out).unwrap();
        assert!(log.contains("# pktsize=1500"));
        assert!(log.contains("finished"));
    }

    #[test]
    fn zero_connections_is_a_configuration_error() {
        let args = test_args("zero", 0, 13);
        assert!(run_sim(&args).is_err());
    }

    #[test]
    fn same_seed_same_inputs_reproduce_the_same_totals() {
        let a = run_sim(&test_args("det-a", 6, 13)).unwrap();
        let b = run_sim(&test_args("det-b", 6, 13)).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
