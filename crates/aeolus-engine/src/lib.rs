//! # aeolus-engine
//!
//! The discrete-event simulation core: the event list and clock, packets
//! and routes, the pipe and queue network elements (including the
//! dual-priority trimming queue that NDP relies on), the fat-tree topology
//! builder, the connection matrix, and the run log writer.
//!
//! All state is owned by an explicit [`sim::Simulation`] context; there are
//! no process-wide singletons. Network elements are shared single-threaded
//! via `Rc<RefCell<..>>` behind two small capabilities: [`net::PacketSink`]
//! for anything that can receive a packet, and [`eventlist::EventSource`]
//! for anything the event list can call back.

pub mod clock;
pub mod eventlist;
pub mod ids;
pub mod logfile;
pub mod matrix;
pub mod net;
pub mod packet;
pub mod prelude;
pub mod route;
pub mod sim;
pub mod topology;
