// psi/stt.rs
//! System Time Table (0xCD) and the GPS-epoch clock shared with the EIT.

use bitstream_io::BitRead;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::constants::{GPS_LEAP_SECONDS, table_id};
use crate::error::TableFormatError;
use crate::psi::section::{Section, read_protocol_version};

/// 1980-01-06T00:00:00Z as a Unix timestamp
const GPS_EPOCH_UNIX: i64 = 315_964_800;

/// GPS seconds → UTC, with the leap-second offset fixed at 14 s.
pub fn gps_to_utc(gps_seconds: u32) -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
        + TimeDelta::seconds(GPS_EPOCH_UNIX - GPS_LEAP_SECONDS + gps_seconds as i64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SystemTimeTable {
    pub gps_seconds: u32,
    /// As broadcast; informational only, [`gps_to_utc`] does not use it
    pub gps_utc_offset: u8,
    pub system_time: DateTime<Utc>,
}

pub fn parse_stt(section: &Section<'_>) -> Result<SystemTimeTable, TableFormatError> {
    if section.table_id() != table_id::STT {
        return Err(TableFormatError::UnexpectedTableId {
            table: "STT",
            found: section.table_id(),
        });
    }
    let mut r = section.reader();
    read_protocol_version(&mut r)?;

    let extension = section.header.table_id_extension()?;
    if extension != 0 {
        return Err(TableFormatError::TableIdExtension {
            expected: 0,
            found: extension,
        });
    }

    let gps_seconds = r.read::<32, u32>()?;
    let gps_utc_offset = r.read::<8, u8>()?;
    // daylight_saving and descriptors follow; not decoded

    Ok(SystemTimeTable {
        gps_seconds,
        gps_utc_offset,
        system_time: gps_to_utc(gps_seconds),
    })
}
