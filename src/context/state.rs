//! Session state that table handlers write into.
//!
//! Handlers run inside the demultiplexer and cannot register new handlers on it,
//! so PMT and EIT decoders they ask for are queued here as [`Registration`]s and
//! wired up by the context once the packet has been dispatched. The context may
//! refuse one; refused registrations are remembered and not requested again.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::constants::EIT_SLOT_COUNT;
use crate::error::TableFormatError;
use crate::psi::{EventInformationTable, MasterGuideTable, ProgramAssociationTable, ProgramMapTable};
use crate::types::{Channel, ChannelNumber, StreamEvent};

/// A decoder a handler wants installed on the demultiplexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Registration {
    Pmt { pid: u16, program_number: u16 },
    Eit { pid: u16, table_number: u8 },
}

impl Registration {
    pub fn pid(&self) -> u16 {
        match *self {
            Registration::Pmt { pid, .. } | Registration::Eit { pid, .. } => pid,
        }
    }
}

pub struct StreamState {
    pat: Option<ProgramAssociationTable>,
    /// PMT PID → program number of the decoder installed there
    pmt_decoders: BTreeMap<u16, u16>,
    programs: BTreeMap<u16, ProgramMapTable>,
    channels: BTreeMap<ChannelNumber, Channel>,
    /// PID of the decoder installed for each EIT-k (announced PID when EIT
    /// decoding is off); used to skip repeated MGT announcements
    eit_pids: [Option<u16>; EIT_SLOT_COUNT],
    system_time: Option<DateTime<Utc>>,
    psip_present: bool,
    pending: Vec<Registration>,
    refused: BTreeSet<Registration>,
    events: Vec<StreamEvent>,
}

impl Default for StreamState {
    fn default() -> Self {
        Self {
            pat: None,
            pmt_decoders: BTreeMap::new(),
            programs: BTreeMap::new(),
            channels: BTreeMap::new(),
            eit_pids: [None; EIT_SLOT_COUNT],
            system_time: None,
            psip_present: false,
            pending: Vec::new(),
            refused: BTreeSet::new(),
            events: Vec::new(),
        }
    }
}

impl StreamState {
    /// A PAT is only acted on when its version changes. Programs it no longer
    /// lists keep their PMT decoders.
    pub(crate) fn accept_pat(&mut self, pat: ProgramAssociationTable, spawn_pmt: bool) {
        if self.pat.as_ref().is_some_and(|held| held.version == pat.version) {
            return;
        }
        log::info!(
            "PAT v{} (TSID 0x{:04X}): {} programs",
            pat.version,
            pat.transport_stream_id,
            pat.programs.len()
        );

        if spawn_pmt {
            for (&program_number, &pid) in &pat.programs {
                let registration = Registration::Pmt { pid, program_number };
                if self.pmt_decoders.get(&pid) == Some(&program_number) || self.refused.contains(&registration) {
                    continue;
                }
                self.pending.push(registration);
            }
        }

        self.events.push(StreamEvent::PatUpdated {
            version: pat.version,
            programs: pat.programs.clone(),
        });
        self.pat = Some(pat);
    }

    pub(crate) fn accept_pmt(&mut self, pmt: ProgramMapTable) {
        if self.programs.get(&pmt.program_number) == Some(&pmt) {
            return;
        }
        log::debug!(
            "PMT v{} program {}: PCR 0x{:04X}, {} streams",
            pmt.version,
            pmt.program_number,
            pmt.pcr_pid,
            pmt.streams.len()
        );
        self.programs.insert(pmt.program_number, pmt.clone());
        self.events.push(StreamEvent::ProgramMap(pmt));
    }

    pub(crate) fn accept_mgt(&mut self, mgt: &MasterGuideTable, spawn_eit: bool) {
        self.psip_present = true;
        for entry in &mgt.tables {
            if let Some(table_number) = entry.eit_table_number() {
                if self.eit_pids[table_number as usize] == Some(entry.pid) {
                    continue;
                }
                let registration = Registration::Eit {
                    pid: entry.pid,
                    table_number,
                };
                if !spawn_eit {
                    self.announce_eit(table_number, entry.pid);
                } else if !self.refused.contains(&registration) {
                    self.pending.push(registration);
                }
            } else if let Some(table_number) = entry.ett_table_number() {
                log::debug!("ETT-{table_number} on PID 0x{:04X} (not decoded)", entry.pid);
            }
        }
    }

    fn announce_eit(&mut self, table_number: u8, pid: u16) {
        log::info!("EIT-{table_number} on PID 0x{pid:04X}");
        self.eit_pids[table_number as usize] = Some(pid);
        self.events.push(StreamEvent::EitDiscovered { table_number, pid });
    }

    /// Records a decoder the context has installed.
    pub(crate) fn installed(&mut self, registration: Registration) {
        match registration {
            Registration::Pmt { pid, program_number } => {
                self.pmt_decoders.insert(pid, program_number);
            }
            Registration::Eit { pid, table_number } => self.announce_eit(table_number, pid),
        }
    }

    pub(crate) fn refused(&mut self, registration: Registration) {
        self.refused.insert(registration);
    }

    /// Forgets the stream-driven decoder on `pid` once something else owns it.
    pub(crate) fn released(&mut self, pid: u16) {
        self.pmt_decoders.remove(&pid);
        for slot in &mut self.eit_pids {
            if *slot == Some(pid) {
                *slot = None;
            }
        }
    }

    /// First channel seen under a number wins; returns whether it was new.
    pub(crate) fn accept_channel(&mut self, channel: Channel) -> bool {
        if self.channels.contains_key(&channel.number) {
            return false;
        }
        log::info!(
            "channel {} {} (source {}, program {})",
            channel.number,
            channel.callsign,
            channel.source_id,
            channel.program_number
        );
        self.channels.insert(channel.number, channel.clone());
        self.events.push(StreamEvent::ChannelDiscovered(channel));
        true
    }

    pub(crate) fn accept_system_time(&mut self, time: DateTime<Utc>) {
        if self.system_time == Some(time) {
            return;
        }
        self.system_time = Some(time);
        self.events.push(StreamEvent::TimeChanged { time });
    }

    /// Publishes what was decoded, then reports a title that stopped the loop.
    pub(crate) fn accept_eit(&mut self, eit: EventInformationTable) -> Result<(), TableFormatError> {
        for event in eit.events {
            log::debug!(
                "EIT-{} source {}: {} {}",
                eit.table_number,
                eit.source_id,
                event.start_time,
                event.title
            );
            self.events.push(StreamEvent::Schedule {
                table_number: eit.table_number,
                source_id: eit.source_id,
                event,
            });
        }
        match eit.aborted {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub(crate) fn take_registrations(&mut self) -> Vec<Registration> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn take_events(&mut self) -> Vec<StreamEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pat(&self) -> Option<&ProgramAssociationTable> {
        self.pat.as_ref()
    }

    pub fn pmt_decoders(&self) -> &BTreeMap<u16, u16> {
        &self.pmt_decoders
    }

    pub fn programs(&self) -> impl Iterator<Item = &ProgramMapTable> {
        self.programs.values()
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn channel(&self, number: ChannelNumber) -> Option<&Channel> {
        self.channels.get(&number)
    }

    pub fn eit_pid(&self, table_number: u8) -> Option<u16> {
        self.eit_pids.get(table_number as usize).copied().flatten()
    }

    pub fn system_time(&self) -> Option<DateTime<Utc>> {
        self.system_time
    }

    pub fn psip_present(&self) -> bool {
        self.psip_present
    }
}
