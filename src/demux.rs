//! PID routing: one [`SectionAccumulator`] per PID, completed sections fanned out
//! to global observers and then to the PID's handler.
//!
//! Handlers receive a mutable reference to caller-owned state `S` so table
//! decoders can publish what they find without the demultiplexer knowing about it.

use std::collections::HashMap;

use crate::accumulator::{AccumulatorEvent, ContinuityError, SectionAccumulator};
use crate::constants::NULL_PID;
use crate::error::TableFormatError;
use crate::packet::TsPacket;
use crate::stats::{DemuxCounters, PidStats};

/// Receives every completed section on one PID.
pub trait SectionHandler<S> {
    fn on_section(&mut self, pid: u16, data: &[u8], state: &mut S) -> Result<(), TableFormatError>;
}

impl<S, F> SectionHandler<S> for F
where
    F: FnMut(u16, &[u8], &mut S) -> Result<(), TableFormatError>,
{
    fn on_section(&mut self, pid: u16, data: &[u8], state: &mut S) -> Result<(), TableFormatError> {
        self(pid, data, state)
    }
}

pub type BoxedHandler<S> = Box<dyn SectionHandler<S> + Send>;
pub type SectionObserver = Box<dyn FnMut(u16, &[u8]) + Send>;
pub type ContinuityObserver = Box<dyn FnMut(&ContinuityError) + Send>;

pub struct Demultiplexer<S> {
    accumulators: HashMap<u16, SectionAccumulator>,
    handlers: HashMap<u16, BoxedHandler<S>>,
    section_observers: Vec<SectionObserver>,
    continuity_observers: Vec<ContinuityObserver>,
    counters: DemuxCounters,
}

impl<S> Default for Demultiplexer<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Demultiplexer<S> {
    pub fn new() -> Self {
        Self {
            accumulators: HashMap::new(),
            handlers: HashMap::new(),
            section_observers: Vec::new(),
            continuity_observers: Vec::new(),
            counters: DemuxCounters::default(),
        }
    }

    /// Installs the handler for `pid`, replacing any previous one.
    pub fn register_handler<H>(&mut self, pid: u16, handler: H)
    where
        H: SectionHandler<S> + Send + 'static,
    {
        if self.handlers.insert(pid, Box::new(handler)).is_some() {
            log::debug!("PID 0x{pid:04X}: handler replaced");
        }
    }

    pub fn unregister_handler(&mut self, pid: u16) -> bool {
        self.handlers.remove(&pid).is_some()
    }

    pub fn has_handler(&self, pid: u16) -> bool {
        self.handlers.contains_key(&pid)
    }

    /// Observers see every completed section, before the PID handler does.
    pub fn add_section_observer<F>(&mut self, observer: F)
    where
        F: FnMut(u16, &[u8]) + Send + 'static,
    {
        self.section_observers.push(Box::new(observer));
    }

    pub fn add_continuity_observer<F>(&mut self, observer: F)
    where
        F: FnMut(&ContinuityError) + Send + 'static,
    {
        self.continuity_observers.push(Box::new(observer));
    }

    pub fn counters(&self) -> &DemuxCounters {
        &self.counters
    }

    pub fn pid_stats(&self) -> Vec<PidStats> {
        let mut stats: Vec<PidStats> = self
            .accumulators
            .values()
            .map(|acc| PidStats {
                pid: acc.pid(),
                packets_accumulated: acc.packets_accumulated(),
                bytes_accumulated: acc.bytes_accumulated(),
                has_handler: self.handlers.contains_key(&acc.pid()),
            })
            .collect();
        stats.sort_unstable_by_key(|s| s.pid);
        stats
    }

    pub fn accept(&mut self, packet: &TsPacket<'_>, state: &mut S) {
        self.counters.packets_seen += 1;
        if packet.pid == NULL_PID {
            self.counters.null_packets += 1;
            return;
        }

        let accumulator = self
            .accumulators
            .entry(packet.pid)
            .or_insert_with(|| SectionAccumulator::new(packet.pid));

        match accumulator.push(packet) {
            None => {}
            Some(AccumulatorEvent::SectionComplete { pid, data }) => {
                self.dispatch_section(pid, &data, state);
            }
            Some(AccumulatorEvent::ContinuityError(err)) => {
                self.counters.continuity_errors += 1;
                log::debug!(
                    "continuity error on PID 0x{:04X} [{}->{}], {} errors in {} packets",
                    err.pid,
                    err.previous,
                    err.actual,
                    self.counters.continuity_errors,
                    self.counters.packets_seen
                );
                for observer in &mut self.continuity_observers {
                    observer(&err);
                }
            }
        }
    }

    fn dispatch_section(&mut self, pid: u16, data: &[u8], state: &mut S) {
        self.counters.sections_completed += 1;
        for observer in &mut self.section_observers {
            observer(pid, data);
        }
        let Some(handler) = self.handlers.get_mut(&pid) else {
            return;
        };
        if let Err(err) = handler.on_section(pid, data, state) {
            self.counters.table_errors += 1;
            log::warn!("PID 0x{pid:04X}: dropping section of {} bytes: {err}", data.len());
        }
    }
}
