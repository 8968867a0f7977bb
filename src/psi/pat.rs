use std::collections::BTreeMap;

use bitstream_io::BitRead;
use serde::Serialize;

use crate::constants::{LONG_FORM_OVERHEAD, table_id};
use crate::error::TableFormatError;
use crate::psi::section::{Section, TableDecoder};

/// ─────────── PAT ───────────
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgramAssociationTable {
    pub version: u8,
    pub transport_stream_id: u16,
    /// program_number → PMT PID (program 0 excluded)
    pub programs: BTreeMap<u16, u16>,
    pub network_pid: Option<u16>,
}

impl ProgramAssociationTable {
    pub fn pmt_pid(&self, program_number: u16) -> Option<u16> {
        self.programs.get(&program_number).copied()
    }
}

pub fn parse_pat(section: &Section<'_>) -> Result<ProgramAssociationTable, TableFormatError> {
    if section.table_id() != table_id::PAT {
        return Err(TableFormatError::UnexpectedTableId {
            table: "PAT",
            found: section.table_id(),
        });
    }
    let section_length = section.header.section_length;
    let entries = (section_length as usize)
        .checked_sub(LONG_FORM_OVERHEAD)
        .ok_or(TableFormatError::BadSectionLength(section_length))?
        / 4;

    let mut r = section.reader();
    let mut programs = BTreeMap::new();
    let mut network_pid = None;
    for _ in 0..entries {
        let program_number = r.read::<16, u16>()?;
        r.skip(3)?;
        let pid = r.read::<13, u16>()?;
        if program_number == 0 {
            network_pid = Some(pid);
        } else {
            programs.insert(program_number, pid);
        }
    }

    Ok(ProgramAssociationTable {
        version: section.header.version_number()?,
        transport_stream_id: section.header.table_id_extension()?,
        programs,
        network_pid,
    })
}

#[derive(Debug, Default)]
pub struct PatDecoder;

impl TableDecoder for PatDecoder {
    type Output = ProgramAssociationTable;

    fn decode(&mut self, section: &Section<'_>) -> Result<Self::Output, TableFormatError> {
        parse_pat(section)
    }
}
