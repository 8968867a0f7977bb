// psi/vct.rs
//! Terrestrial (0xC8) and cable (0xC9) virtual channel tables.

use bitstream_io::BitRead;

use crate::constants::table_id;
use crate::error::TableFormatError;
use crate::psi::section::{Section, read_protocol_version, skip_bytes};
use crate::types::{Channel, ChannelNumber};

const SHORT_NAME_UNITS: usize = 7;

pub fn parse_vct(section: &Section<'_>) -> Result<Vec<Channel>, TableFormatError> {
    let tid = section.table_id();
    if tid != table_id::TVCT && tid != table_id::CVCT {
        return Err(TableFormatError::UnexpectedTableId {
            table: "TVCT/CVCT",
            found: tid,
        });
    }
    let mut r = section.reader();
    read_protocol_version(&mut r)?;

    let channel_count = r.read::<8, u8>()?;
    let mut channels = Vec::with_capacity(channel_count as usize);
    for _ in 0..channel_count {
        let mut units = [0u16; SHORT_NAME_UNITS];
        for unit in &mut units {
            *unit = r.read::<16, u16>()?;
        }
        r.skip(4)?;
        let major = r.read::<10, u16>()?;
        let minor = r.read::<10, u16>()?;
        let modulation_mode = r.read::<8, u8>()?;
        let _carrier_frequency = r.read::<32, u32>()?;
        let transport_stream_id = r.read::<16, u16>()?;
        let program_number = r.read::<16, u16>()?;
        // ETM_location, access_controlled, hidden, hide_guide, service_type
        r.skip(16)?;
        let source_id = r.read::<16, u16>()?;
        r.skip(6)?;
        let descriptors_length = r.read::<10, u16>()?;
        skip_bytes(&mut r, descriptors_length as usize)?;

        channels.push(Channel {
            number: ChannelNumber { major, minor },
            callsign: decode_short_name(&units),
            transport_stream_id,
            program_number,
            source_id,
            modulation_mode,
        });
    }
    Ok(channels)
}

/// UTF-16 short name, NUL padding dropped
fn decode_short_name(units: &[u16]) -> String {
    char::decode_utf16(units.iter().copied())
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect::<String>()
        .trim_end_matches('\0')
        .to_string()
}
