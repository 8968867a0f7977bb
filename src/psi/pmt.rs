use bitstream_io::BitRead;
use serde::Serialize;

use crate::constants::table_id;
use crate::error::TableFormatError;
use crate::psi::section::{BodyReader, Section, TableDecoder, skip_bytes};

/// ─────────── PMT ───────────
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgramMapTable {
    pub pid: u16,
    pub program_number: u16,
    pub version: u8,
    pub pcr_pid: u16,
    pub streams: Vec<ElementaryStream>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ElementaryStream {
    pub stream_type: u8,
    pub elementary_pid: u16,
}

/// PCR_PID + program_info_length, counted by section_length
const PMT_FIXED_BODY: usize = 4;

/// Bound at construction to the program announced by the PAT.
#[derive(Debug, Clone, Copy)]
pub struct PmtDecoder {
    program_number: u16,
    pid: u16,
}

impl PmtDecoder {
    pub fn new(program_number: u16, pid: u16) -> Self {
        Self { program_number, pid }
    }

    pub fn program_number(&self) -> u16 {
        self.program_number
    }

    pub fn pid(&self) -> u16 {
        self.pid
    }
}

impl TableDecoder for PmtDecoder {
    /// `None` for the vendor-private sections that share PMT PIDs
    type Output = Option<ProgramMapTable>;

    fn decode(&mut self, section: &Section<'_>) -> Result<Self::Output, TableFormatError> {
        match section.table_id() {
            table_id::PRIVATE_C0 | table_id::PRIVATE_C1 => return Ok(None),
            table_id::PMT => {}
            found => return Err(TableFormatError::UnexpectedTableId { table: "PMT", found }),
        }

        let header = &section.header;
        let extension = header.table_id_extension()?;
        if extension != self.program_number {
            return Err(TableFormatError::TableIdExtension {
                expected: self.program_number,
                found: extension,
            });
        }
        let (section_number, last_section_number) =
            (header.section_number()?, header.last_section_number()?);
        if section_number != 0 || last_section_number != 0 {
            return Err(TableFormatError::MultiSection {
                section_number,
                last_section_number,
            });
        }

        let mut r = section.reader();
        r.skip(3)?;
        let pcr_pid = r.read::<13, u16>()?;
        r.skip(4)?;
        let program_info_length = r.read::<12, u16>()? as usize;
        skip_descriptor_loop(&mut r, program_info_length)?;

        let mut remaining = (header.section_length as usize)
            .checked_sub(crate::constants::LONG_FORM_OVERHEAD + PMT_FIXED_BODY + program_info_length)
            .ok_or(TableFormatError::BadSectionLength(header.section_length))?;

        let mut streams = Vec::new();
        while remaining > 0 {
            let stream_type = r.read::<8, u8>()?;
            r.skip(3)?;
            let elementary_pid = r.read::<13, u16>()?;
            r.skip(4)?;
            let es_info_length = r.read::<12, u16>()? as usize;
            skip_bytes(&mut r, es_info_length)?;
            streams.push(ElementaryStream { stream_type, elementary_pid });

            remaining = remaining
                .checked_sub(5 + es_info_length)
                .ok_or_else(TableFormatError::truncated)?;
        }

        Ok(Some(ProgramMapTable {
            pid: self.pid,
            program_number: self.program_number,
            version: header.version_number()?,
            pcr_pid,
            streams,
        }))
    }
}

/// Walks `(tag, length, payload)` descriptors totalling `length` bytes.
fn skip_descriptor_loop(r: &mut BodyReader<'_>, length: usize) -> Result<(), TableFormatError> {
    let mut remaining = length;
    while remaining > 0 {
        let _tag = r.read::<8, u8>()?;
        let len = r.read::<8, u8>()? as usize;
        skip_bytes(r, len)?;
        remaining = remaining
            .checked_sub(2 + len)
            .ok_or_else(TableFormatError::truncated)?;
    }
    Ok(())
}
