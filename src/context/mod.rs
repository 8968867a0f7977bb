//! Stream context: frames packets, routes them through the demultiplexer and
//! keeps what the PSI/PSIP tables announce.
//!
//! The PAT handler is always installed on PID 0 and the PSIP handler on 0x1FFB.
//! PMT and EIT decoders are added as the PAT and MGT announce their PIDs, unless
//! the announced PID is reserved or already carries a decoder of another kind.

mod state;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

pub use state::{Registration, StreamState};

use crate::accumulator::ContinuityError;
use crate::constants::{NULL_PID, PAT_PID, PSIP_PID, TS_PACKET_SIZE};
use crate::demux::{Demultiplexer, SectionHandler};
use crate::error::{FrameFormatError, TableFormatError};
use crate::packet::TsPacket;
use crate::psi::{
    EitDecoder, EventInformationTable, PatDecoder, PmtDecoder, ProgramAssociationTable,
    ProgramMapTable, PsipDecoder, PsipTable, TableHandler,
};
use crate::stats::{PidStats, StreamCounters};
use crate::types::{Channel, ChannelNumber, StreamEvent};

/// Which decoders the context wires up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextConfig {
    /// Install a PMT decoder for every program in the PAT.
    pub decode_pmt: bool,
    /// Decode MGT/VCT/STT on the PSIP base PID.
    pub decode_psip: bool,
    /// Install EIT decoders for the PIDs the MGT announces.
    pub decode_eit: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            decode_pmt: true,
            decode_psip: true,
            decode_eit: true,
        }
    }
}

pub type EventListener = Box<dyn FnMut(&StreamEvent) + Send>;

pub struct StreamContext {
    demux: Demultiplexer<StreamState>,
    state: StreamState,
    config: ContextConfig,
    listeners: Vec<EventListener>,
    /// Stream-driven decoders currently on the demultiplexer
    installed: BTreeMap<u16, Registration>,
    frame_errors: u64,
    refused_registrations: u64,
}

impl Default for StreamContext {
    fn default() -> Self {
        Self::new(ContextConfig::default())
    }
}

impl StreamContext {
    pub fn new(config: ContextConfig) -> Self {
        let mut demux = Demultiplexer::new();

        let decode_pmt = config.decode_pmt;
        demux.register_handler(
            PAT_PID,
            TableHandler::new(
                PatDecoder,
                move |pat: ProgramAssociationTable, state: &mut StreamState| -> Result<(), TableFormatError> {
                    state.accept_pat(pat, decode_pmt);
                    Ok(())
                },
            ),
        );

        if config.decode_psip {
            let decode_eit = config.decode_eit;
            demux.register_handler(
                PSIP_PID,
                TableHandler::new(
                    PsipDecoder,
                    move |table: PsipTable, state: &mut StreamState| -> Result<(), TableFormatError> {
                        deliver_psip(table, state, decode_eit);
                        Ok(())
                    },
                ),
            );
        }

        Self {
            demux,
            state: StreamState::default(),
            config,
            listeners: Vec::new(),
            installed: BTreeMap::new(),
            frame_errors: 0,
            refused_registrations: 0,
        }
    }

    /// Feeds one 188-byte packet. A bad frame is counted and returned; the
    /// session carries on with the next one.
    pub fn accept(&mut self, bytes: &[u8]) -> Result<(), FrameFormatError> {
        let packet = match TsPacket::parse(bytes) {
            Ok(packet) => packet,
            Err(err) => {
                self.frame_errors += 1;
                log::debug!("dropping packet: {err}");
                return Err(err);
            }
        };
        self.demux.accept(&packet, &mut self.state);
        self.apply_registrations();
        self.flush_events();
        Ok(())
    }

    /// Feeds every whole packet in `buf`; returns how many were rejected.
    /// A trailing partial packet counts as one rejected frame.
    pub fn accept_buffer(&mut self, buf: &[u8]) -> usize {
        buf.chunks(TS_PACKET_SIZE)
            .filter(|chunk| self.accept(chunk).is_err())
            .count()
    }

    /// Why `registration` cannot be installed, if it cannot.
    fn conflict(&self, registration: Registration) -> Option<String> {
        let pid = registration.pid();
        match pid {
            PAT_PID => return Some("PID is reserved for the PAT".into()),
            PSIP_PID => return Some("PID is reserved for PSIP".into()),
            NULL_PID => return Some("PID is the null PID".into()),
            _ => {}
        }
        match (self.installed.get(&pid), registration) {
            // left behind when the MGT moved its table elsewhere
            (Some(&Registration::Eit { table_number: held, .. }), _) if self.state.eit_pid(held) != Some(pid) => None,
            (Some(Registration::Pmt { .. }), Registration::Pmt { .. }) => None,
            (Some(Registration::Eit { table_number: held, .. }), Registration::Eit { table_number, .. })
                if *held == table_number =>
            {
                None
            }
            (Some(held), _) => Some(format!("PID already carries {held:?}")),
            (None, _) if self.demux.has_handler(pid) => Some("PID carries a caller handler".into()),
            (None, _) => None,
        }
    }

    fn apply_registrations(&mut self) {
        for registration in self.state.take_registrations() {
            if let Some(reason) = self.conflict(registration) {
                log::warn!("refusing {registration:?}: {reason}");
                self.refused_registrations += 1;
                self.state.refused(registration);
                continue;
            }
            match registration {
                Registration::Pmt { pid, program_number } => {
                    log::debug!("PMT decoder for program {program_number} on PID 0x{pid:04X}");
                    self.demux.register_handler(
                        pid,
                        TableHandler::new(
                            PmtDecoder::new(program_number, pid),
                            |pmt: Option<ProgramMapTable>, state: &mut StreamState| -> Result<(), TableFormatError> {
                                if let Some(pmt) = pmt {
                                    state.accept_pmt(pmt);
                                }
                                Ok(())
                            },
                        ),
                    );
                }
                Registration::Eit { pid, table_number } => {
                    log::debug!("EIT-{table_number} decoder on PID 0x{pid:04X}");
                    self.demux.register_handler(
                        pid,
                        TableHandler::new(
                            EitDecoder::new(table_number, pid),
                            |eit: EventInformationTable, state: &mut StreamState| state.accept_eit(eit),
                        ),
                    );
                }
            }
            self.installed.insert(registration.pid(), registration);
            self.state.installed(registration);
        }
    }

    fn flush_events(&mut self) {
        let events = self.state.take_events();
        if self.listeners.is_empty() {
            return;
        }
        for event in &events {
            for listener in &mut self.listeners {
                listener(event);
            }
        }
    }

    /// Listeners see table-level events in the order they were decoded.
    pub fn on_event<F>(&mut self, listener: F)
    where
        F: FnMut(&StreamEvent) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Runs for every completed section on any PID, before its handler.
    pub fn on_section<F>(&mut self, observer: F)
    where
        F: FnMut(u16, &[u8]) + Send + 'static,
    {
        self.demux.add_section_observer(observer);
    }

    pub fn on_continuity_error<F>(&mut self, observer: F)
    where
        F: FnMut(&ContinuityError) + Send + 'static,
    {
        self.demux.add_continuity_observer(observer);
    }

    /// Installs a caller handler, replacing any decoder on that PID.
    pub fn register_handler<H>(&mut self, pid: u16, handler: H)
    where
        H: SectionHandler<StreamState> + Send + 'static,
    {
        self.release(pid);
        self.demux.register_handler(pid, handler);
    }

    pub fn unregister_handler(&mut self, pid: u16) -> bool {
        self.release(pid);
        self.demux.unregister_handler(pid)
    }

    fn release(&mut self, pid: u16) {
        if self.installed.remove(&pid).is_some() {
            self.state.released(pid);
        }
    }

    pub fn has_handler(&self, pid: u16) -> bool {
        self.demux.has_handler(pid)
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.state.channels()
    }

    pub fn channel(&self, number: ChannelNumber) -> Option<&Channel> {
        self.state.channel(number)
    }

    pub fn system_time(&self) -> Option<DateTime<Utc>> {
        self.state.system_time()
    }

    pub fn pat(&self) -> Option<&ProgramAssociationTable> {
        self.state.pat()
    }

    pub fn programs(&self) -> impl Iterator<Item = &ProgramMapTable> {
        self.state.programs()
    }

    /// PMT PID → program number, for every PMT decoder installed so far
    pub fn pmt_decoders(&self) -> &BTreeMap<u16, u16> {
        self.state.pmt_decoders()
    }

    pub fn eit_pid(&self, table_number: u8) -> Option<u16> {
        self.state.eit_pid(table_number)
    }

    pub fn psip_present(&self) -> bool {
        self.state.psip_present()
    }

    pub fn counters(&self) -> StreamCounters {
        StreamCounters {
            demux: *self.demux.counters(),
            frame_errors: self.frame_errors,
            refused_registrations: self.refused_registrations,
        }
    }

    pub fn pid_stats(&self) -> Vec<PidStats> {
        self.demux.pid_stats()
    }
}

fn deliver_psip(table: PsipTable, state: &mut StreamState, decode_eit: bool) {
    match table {
        PsipTable::Mgt(mgt) => state.accept_mgt(&mgt, decode_eit),
        PsipTable::Vct(channels) => {
            for channel in channels {
                state.accept_channel(channel);
            }
        }
        PsipTable::Stt(stt) => state.accept_system_time(stt.system_time),
        PsipTable::Rrt => log::trace!("RRT ignored"),
        PsipTable::Other(tid) => {
            log::debug!("unexpected PSIP table 0x{tid:02X} on PID 0x{PSIP_PID:04X}")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::packet::tests::make_packet;
    use crate::psi::mgt::tests::mgt_section;
    use crate::psi::section::tests::long_section;

    /// Section → one PUSI packet with pointer 0, plus a flush packet so the
    /// accumulator completes it.
    fn feed_section(ctx: &mut StreamContext, pid: u16, cc: &mut u8, section: &[u8]) {
        let mut payload = vec![0x00];
        payload.extend_from_slice(section);
        ctx.accept(&make_packet(pid, true, *cc, &payload)).unwrap();
        *cc = (*cc + 1) % 16;
    }

    fn flush(ctx: &mut StreamContext, pid: u16, cc: &mut u8) {
        ctx.accept(&make_packet(pid, true, *cc, &[0x00, 0xFF])).unwrap();
        *cc = (*cc + 1) % 16;
    }

    #[test]
    fn bad_frames_are_counted() {
        let mut ctx = StreamContext::default();
        let mut raw = make_packet(0x100, false, 0, &[]);
        raw[0] = 0x48;
        assert_eq!(ctx.accept(&raw), Err(FrameFormatError::BadSync(0x48)));
        assert_eq!(ctx.accept(&raw[..100]), Err(FrameFormatError::BadLength(100)));
        assert_eq!(ctx.counters().frame_errors, 2);
        assert_eq!(ctx.counters().demux.packets_seen, 0);
    }

    #[test]
    fn accept_buffer_splits_packets() {
        let mut ctx = StreamContext::default();
        let mut buf = Vec::new();
        for cc in 0..3 {
            buf.extend_from_slice(&make_packet(0x100, false, cc, &[]));
        }
        buf.extend_from_slice(&[0x47, 0x01]);
        assert_eq!(ctx.accept_buffer(&buf), 1);
        assert_eq!(ctx.counters().demux.packets_seen, 3);
    }

    #[test]
    fn pat_spawns_pmt_decoder() {
        let mut ctx = StreamContext::default();
        let events = Arc::new(Mutex::new(Vec::new()));
        let e = events.clone();
        ctx.on_event(move |event| e.lock().unwrap().push(event.clone()));

        let mut cc = 0;
        feed_section(&mut ctx, PAT_PID, &mut cc, &long_section(0x00, 1, 0, &[0x00, 0x01, 0xE0, 0x30]));
        assert!(!ctx.has_handler(0x30));
        flush(&mut ctx, PAT_PID, &mut cc);

        assert!(ctx.has_handler(0x30));
        assert_eq!(ctx.pmt_decoders().get(&0x30), Some(&1));
        assert_eq!(ctx.pat().unwrap().pmt_pid(1), Some(0x30));
        assert!(matches!(
            events.lock().unwrap().as_slice(),
            [StreamEvent::PatUpdated { version: 0, .. }]
        ));
    }

    #[test]
    fn config_disables_decoders() {
        let config = ContextConfig {
            decode_pmt: false,
            decode_psip: false,
            decode_eit: false,
        };
        let mut ctx = StreamContext::new(config);
        assert!(!ctx.has_handler(PSIP_PID));

        let mut cc = 0;
        feed_section(&mut ctx, PAT_PID, &mut cc, &long_section(0x00, 1, 0, &[0x00, 0x01, 0xE0, 0x30]));
        flush(&mut ctx, PAT_PID, &mut cc);
        assert!(ctx.pat().is_some());
        assert!(!ctx.has_handler(0x30));
    }

    #[test]
    fn mgt_without_eit_decoding_records_slots() {
        let mut ctx = StreamContext::new(ContextConfig {
            decode_eit: false,
            ..ContextConfig::default()
        });
        let mut cc = 0;
        feed_section(&mut ctx, PSIP_PID, &mut cc, &mgt_section(0, &[(0x100, 0x1D00)]));
        flush(&mut ctx, PSIP_PID, &mut cc);

        assert!(ctx.psip_present());
        assert_eq!(ctx.eit_pid(0), Some(0x1D00));
        assert!(!ctx.has_handler(0x1D00));
    }

    #[test]
    fn caller_handler_replaces_decoder() {
        let mut ctx = StreamContext::default();
        let hits = Arc::new(Mutex::new(0));
        let h = hits.clone();
        ctx.register_handler(PAT_PID, move |_: u16, _: &[u8], _: &mut StreamState| -> Result<(), TableFormatError> {
            *h.lock().unwrap() += 1;
            Ok(())
        });

        let mut cc = 0;
        feed_section(&mut ctx, PAT_PID, &mut cc, &long_section(0x00, 1, 0, &[0x00, 0x01, 0xE0, 0x30]));
        flush(&mut ctx, PAT_PID, &mut cc);

        assert_eq!(*hits.lock().unwrap(), 1);
        assert!(ctx.pat().is_none());
        assert!(ctx.unregister_handler(PAT_PID));
    }
}
