use bitstream_io::BitRead;
use serde::Serialize;

use crate::constants::{MGT_EIT_END, MGT_EIT_FIRST, MGT_ETT_END, MGT_ETT_FIRST, table_id};
use crate::error::TableFormatError;
use crate::psi::section::{Section, read_protocol_version, skip_bytes};

/// ─────────── MGT ───────────
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MasterGuideTable {
    pub version: u8,
    pub tables: Vec<MgtEntry>,
}

/// One table announced by the MGT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MgtEntry {
    pub table_type: u16,
    pub pid: u16,
    pub version: u8,
    pub number_bytes: u32,
}

impl MgtEntry {
    /// EIT-k for table types 0x100..0x180
    pub fn eit_table_number(&self) -> Option<u8> {
        (MGT_EIT_FIRST..MGT_EIT_END)
            .contains(&self.table_type)
            .then(|| (self.table_type - MGT_EIT_FIRST) as u8)
    }

    pub fn ett_table_number(&self) -> Option<u8> {
        (MGT_ETT_FIRST..MGT_ETT_END)
            .contains(&self.table_type)
            .then(|| (self.table_type - MGT_ETT_FIRST) as u8)
    }
}

pub fn parse_mgt(section: &Section<'_>) -> Result<MasterGuideTable, TableFormatError> {
    if section.table_id() != table_id::MGT {
        return Err(TableFormatError::UnexpectedTableId {
            table: "MGT",
            found: section.table_id(),
        });
    }
    let mut r = section.reader();
    read_protocol_version(&mut r)?;

    let table_count = r.read::<16, u16>()?;
    let mut tables = Vec::with_capacity(table_count as usize);
    for _ in 0..table_count {
        let table_type = r.read::<16, u16>()?;
        r.skip(3)?;
        let pid = r.read::<13, u16>()?;
        r.skip(3)?;
        let version = r.read::<5, u8>()?;
        let number_bytes = r.read::<32, u32>()?;
        r.skip(4)?;
        let descriptors_length = r.read::<12, u16>()?;
        skip_bytes(&mut r, descriptors_length as usize)?;

        tables.push(MgtEntry {
            table_type,
            pid,
            version,
            number_bytes,
        });
    }

    Ok(MasterGuideTable {
        version: section.header.version_number()?,
        tables,
    })
}
