//! Per-PID section reassembly.
//!
//! A section starts in a packet with payload_unit_start set and ends when the next
//! such packet arrives on the same PID. Packet loss is detected through the 4-bit
//! continuity counter; a gap throws the partial section away and the accumulator
//! waits for the next unit start.

use bytes::{Bytes, BytesMut};

use crate::packet::TsPacket;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorState {
    AwaitingStart,
    Accumulating,
}

/// A gap in the continuity counter sequence of one PID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ContinuityError {
    pub pid: u16,
    /// Counter of the last packet accepted before the gap.
    pub previous: u8,
    pub actual: u8,
}

impl ContinuityError {
    pub fn expected(&self) -> u8 {
        (self.previous + 1) & 0x0F
    }
}

/// Output of feeding one packet. At most one event results from a packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccumulatorEvent {
    SectionComplete { pid: u16, data: Bytes },
    ContinuityError(ContinuityError),
}

#[derive(Debug)]
pub struct SectionAccumulator {
    pid: u16,
    state: AccumulatorState,
    buffer: BytesMut,
    continuity_counter: u8,
    packets_accumulated: usize,
    bytes_accumulated: usize,
}

impl SectionAccumulator {
    pub fn new(pid: u16) -> Self {
        Self {
            pid,
            state: AccumulatorState::AwaitingStart,
            buffer: BytesMut::new(),
            continuity_counter: 0,
            packets_accumulated: 0,
            bytes_accumulated: 0,
        }
    }

    pub fn pid(&self) -> u16 {
        self.pid
    }

    pub fn state(&self) -> AccumulatorState {
        self.state
    }

    pub fn packets_accumulated(&self) -> usize {
        self.packets_accumulated
    }

    pub fn bytes_accumulated(&self) -> usize {
        self.bytes_accumulated
    }

    pub fn push(&mut self, packet: &TsPacket<'_>) -> Option<AccumulatorEvent> {
        match self.state {
            AccumulatorState::AwaitingStart => {
                self.try_start(packet);
                None
            }
            AccumulatorState::Accumulating => {
                let expected = (self.continuity_counter + 1) & 0x0F;
                if packet.continuity_counter != expected {
                    let err = ContinuityError {
                        pid: self.pid,
                        previous: self.continuity_counter,
                        actual: packet.continuity_counter,
                    };
                    self.reset();
                    self.try_start(packet);
                    return Some(AccumulatorEvent::ContinuityError(err));
                }
                self.continuity_counter = packet.continuity_counter;

                if !packet.payload_unit_start {
                    self.buffer.extend_from_slice(packet.payload);
                    self.packets_accumulated += 1;
                    self.bytes_accumulated += packet.payload.len();
                    return None;
                }

                if let Some(tail) = packet.trailing_payload {
                    self.buffer.extend_from_slice(tail);
                    self.bytes_accumulated += tail.len();
                }
                let data = self.buffer.split().freeze();
                self.reset();
                self.try_start(packet);
                Some(AccumulatorEvent::SectionComplete { pid: self.pid, data })
            }
        }
    }

    fn try_start(&mut self, packet: &TsPacket<'_>) {
        if !packet.payload_unit_start {
            return; // joined mid-section
        }
        assert!(
            self.buffer.is_empty(),
            "PID 0x{:04X}: section start with {} bytes still buffered",
            self.pid,
            self.buffer.len()
        );
        self.buffer.extend_from_slice(packet.payload);
        self.packets_accumulated = 1;
        self.bytes_accumulated = packet.payload.len();
        self.continuity_counter = packet.continuity_counter;
        self.state = AccumulatorState::Accumulating;
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.state = AccumulatorState::AwaitingStart;
        self.packets_accumulated = 0;
        self.bytes_accumulated = 0;
    }
}
