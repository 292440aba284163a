//! # aeolus-engine::logfile
//!
//! The run's text log. One record per line, prefixed with the simulated
//! time in seconds; `# key=value` preamble lines record the run
//! parameters. The log is owned by the run and handed to components as an
//! `Rc<RefCell<..>>`; there is no process-wide log singleton.

use crate::net::{QueueEvent, QueueLogger};
use crate::packet::Packet;
use aeolus_types::{
    errors::ConfigError,
    time::{sim_as_secs, SimTime, SIM_EPOCH},
};
use std::{
    cell::RefCell,
    fmt::Display,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    rc::Rc,
};

pub struct Logfile {
    out: BufWriter<File>,
    start_time: SimTime,
}

pub type LogfileRef = Rc<RefCell<Logfile>>;

impl Logfile {
    pub fn new(path: &Path) -> Result<Self, ConfigError> {
        let file = File::create(path)?;
        Ok(Self {
            out: BufWriter::new(file),
            start_time: SIM_EPOCH,
        })
    }

    /// Records before this time are suppressed.
    pub fn set_start_time(&mut self, t: SimTime) {
        self.start_time = t;
    }

    /// Writes a `# key=value` preamble line.
    pub fn write_param(&mut self, key: &str, value: impl Display) {
        self.write_line(format_args!("# {key}={value}"));
    }

    /// Records an object's name, so records can refer to it tersely.
    pub fn write_name(&mut self, name: &str) {
        self.write_line(format_args!("# name={name}"));
    }

    /// Writes one timestamped record line.
    pub fn write_record(&mut self, t: SimTime, record: &str) {
        if t < self.start_time {
            return;
        }
        self.write_line(format_args!("{:.9} {record}", sim_as_secs(t)));
    }

    pub fn flush(&mut self) {
        if let Err(e) = self.out.flush() {
            tracing::warn!(error = %e, "log flush failed");
        }
    }

    fn write_line(&mut self, line: std::fmt::Arguments) {
        if let Err(e) = writeln!(self.out, "{line}") {
            tracing::warn!(error = %e, "log write failed");
        }
    }
}

/// The plain per-packet queue logger: one record per queue event.
pub struct QueueLoggerSimple {
    logfile: LogfileRef,
}

impl QueueLoggerSimple {
    pub fn new(logfile: LogfileRef) -> Self {
        Self { logfile }
    }
}

impl QueueLogger for QueueLoggerSimple {
    fn log_queue(&mut self, t: SimTime, queue: &str, ev: QueueEvent, pkt: &Packet) {
        self.logfile.borrow_mut().write_record(
            t,
            &format!(
                "q {queue} {} {} flow={} seq={} size={}",
                ev.label(),
                pkt.kind().label(),
                pkt.flow_id(),
                pkt.seq_no(),
                pkt.size_bytes()
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeolus_types::time::sim_from_ms;

    #[test]
    fn preamble_and_records_honor_the_start_time() {
        let path = std::env::temp_dir().join(format!("aeolus-logfile-{}.log", std::process::id()));
        {
            let mut log = Logfile::new(&path).unwrap();
            log.set_start_time(sim_from_ms(10));
            log.write_param("pktsize", 1500);
            log.write_record(sim_from_ms(5), "too early");
            log.write_record(sim_from_ms(20), "kept");
            log.flush();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("# pktsize=1500"));
        assert!(!content.contains("too early"));
        assert!(content.contains("0.020000000 kept"));
        let _ = std::fs::remove_file(&path);
    }
}
