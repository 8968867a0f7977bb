//! Running counters for the demultiplexer and per-PID accumulators

use serde::Serialize;

/// Totals kept by the demultiplexer
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DemuxCounters {
    pub packets_seen: u64,
    pub null_packets: u64,
    pub continuity_errors: u64,
    pub sections_completed: u64,
    /// Sections a decoder refused
    pub table_errors: u64,
}

/// Snapshot of one PID's accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PidStats {
    pub pid: u16,
    pub packets_accumulated: usize,
    pub bytes_accumulated: usize,
    pub has_handler: bool,
}

/// Aggregate counters exposed by the stream context
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamCounters {
    #[serde(flatten)]
    pub demux: DemuxCounters,
    /// Frames rejected before reaching the demultiplexer
    pub frame_errors: u64,
    /// PMT/EIT PIDs announced by the stream that clashed with an installed decoder
    pub refused_registrations: u64,
}

impl StreamCounters {
    /// Share of packets that broke continuity
    pub fn continuity_error_rate(&self) -> f64 {
        if self.demux.packets_seen == 0 {
            return 0.0;
        }
        self.demux.continuity_errors as f64 / self.demux.packets_seen as f64
    }
}
