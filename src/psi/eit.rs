// psi/eit.rs
//! ATSC Event Information Table (0xCB), one decoder per EIT-k PID.

use bitstream_io::BitRead;

use crate::constants::table_id;
use crate::error::TableFormatError;
use crate::psi::mss::decode_mss;
use crate::psi::section::{Section, TableDecoder, read_protocol_version, skip_bytes};
use crate::psi::stt::gps_to_utc;
use crate::types::ScheduleEvent;

#[derive(Debug)]
pub struct EventInformationTable {
    pub pid: u16,
    pub table_number: u8,
    /// table_id_extension
    pub source_id: u16,
    pub version: u8,
    pub events: Vec<ScheduleEvent>,
    /// Set when an undecodable title stopped the event loop early
    pub aborted: Option<TableFormatError>,
}

#[derive(Debug, Clone, Copy)]
pub struct EitDecoder {
    table_number: u8,
    pid: u16,
}

impl EitDecoder {
    pub fn new(table_number: u8, pid: u16) -> Self {
        Self { table_number, pid }
    }
}

impl TableDecoder for EitDecoder {
    type Output = EventInformationTable;

    fn decode(&mut self, section: &Section<'_>) -> Result<Self::Output, TableFormatError> {
        if section.table_id() != table_id::EIT {
            return Err(TableFormatError::UnexpectedTableId {
                table: "EIT",
                found: section.table_id(),
            });
        }
        let mut r = section.reader();
        read_protocol_version(&mut r)?;

        let mut table = EventInformationTable {
            pid: self.pid,
            table_number: self.table_number,
            source_id: section.header.table_id_extension()?,
            version: section.header.version_number()?,
            events: Vec::new(),
            aborted: None,
        };

        let event_count = r.read::<8, u8>()?;
        for _ in 0..event_count {
            let event_id = r.read::<16, u16>()? & 0x3FF;
            let start_time = gps_to_utc(r.read::<32, u32>()?);
            r.skip(4)?; // reserved, ETM_location
            let duration_secs = r.read::<20, u32>()?;
            let title_length = r.read::<8, u8>()?;
            let mut field = vec![0u8; title_length as usize];
            r.read_bytes(&mut field)?;

            // no way to tell where the next event starts once the title is suspect
            let title = match decode_mss(&field) {
                Ok(title) => title,
                Err(err) => {
                    table.aborted = Some(err);
                    break;
                }
            };

            r.skip(4)?;
            let descriptors_length = r.read::<12, u16>()?;
            skip_bytes(&mut r, descriptors_length as usize)?;

            table.events.push(ScheduleEvent {
                event_id,
                start_time,
                duration_secs,
                title,
            });
        }
        Ok(table)
    }
}
