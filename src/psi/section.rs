// psi/section.rs
//! Common PSI / PSIP section header and the decoder contract.
//!
//! [`Section::parse`] reads the header shared by every table; the table-specific
//! part is handed to a [`TableDecoder`]. CRC-32 is carried but not checked.

use bitstream_io::{BigEndian, BitReader};

use crate::demux::SectionHandler;
use crate::error::TableFormatError;

pub type BodyReader<'a> = BitReader<&'a [u8], BigEndian>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    pub table_id: u8,
    pub section_syntax_indicator: bool,
    /// Bytes following the length field, CRC included
    pub section_length: u16,
    long_form: Option<LongForm>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LongForm {
    table_id_extension: u16,
    version_number: u8,
    current_next_indicator: bool,
    section_number: u8,
    last_section_number: u8,
}

impl SectionHeader {
    pub fn is_long_form(&self) -> bool {
        self.long_form.is_some()
    }

    fn long_form(&self, field: &'static str) -> Result<&LongForm, TableFormatError> {
        self.long_form
            .as_ref()
            .ok_or(TableFormatError::ShortFormSection(field))
    }

    pub fn table_id_extension(&self) -> Result<u16, TableFormatError> {
        Ok(self.long_form("table_id_extension")?.table_id_extension)
    }

    pub fn version_number(&self) -> Result<u8, TableFormatError> {
        Ok(self.long_form("version_number")?.version_number)
    }

    pub fn current_next_indicator(&self) -> Result<bool, TableFormatError> {
        Ok(self.long_form("current_next_indicator")?.current_next_indicator)
    }

    pub fn section_number(&self) -> Result<u8, TableFormatError> {
        Ok(self.long_form("section_number")?.section_number)
    }

    pub fn last_section_number(&self) -> Result<u8, TableFormatError> {
        Ok(self.long_form("last_section_number")?.last_section_number)
    }
}

/// One complete section as delivered by the demultiplexer.
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
    pub pid: u16,
    pub header: SectionHeader,
    /// table_id through the end of section_length; stuffing is cut off
    pub data: &'a [u8],
    pub body_offset: usize,
}

impl<'a> Section<'a> {
    pub fn parse(pid: u16, data: &'a [u8]) -> Result<Self, TableFormatError> {
        if data.len() < 3 {
            return Err(TableFormatError::truncated());
        }
        let table_id = data[0];
        let section_syntax_indicator = data[1] & 0x80 != 0;
        let section_length = ((((data[1] & 0x0F) as u16) << 8) | data[2] as u16) & 0x0FFF;

        let end = 3 + section_length as usize;
        if end > data.len() {
            return Err(TableFormatError::truncated());
        }
        let data = &data[..end];

        let (long_form, body_offset) = if section_syntax_indicator {
            if data.len() < 8 {
                return Err(TableFormatError::BadSectionLength(section_length));
            }
            let lf = LongForm {
                table_id_extension: u16::from_be_bytes([data[3], data[4]]),
                version_number: (data[5] >> 1) & 0x1F,
                current_next_indicator: data[5] & 0x01 != 0,
                section_number: data[6],
                last_section_number: data[7],
            };
            (Some(lf), 8)
        } else {
            (None, 3)
        };

        Ok(Self {
            pid,
            header: SectionHeader {
                table_id,
                section_syntax_indicator,
                section_length,
                long_form,
            },
            data,
            body_offset,
        })
    }

    pub fn table_id(&self) -> u8 {
        self.header.table_id
    }

    /// Bytes after the header, up to and including the (unchecked) CRC
    pub fn body(&self) -> &'a [u8] {
        &self.data[self.body_offset..]
    }

    pub fn reader(&self) -> BodyReader<'a> {
        BitReader::endian(self.body(), BigEndian)
    }
}

/// Decodes the body of one kind of table.
pub trait TableDecoder {
    type Output;

    fn decode(&mut self, section: &Section<'_>) -> Result<Self::Output, TableFormatError>;
}

/// Adapts a [`TableDecoder`] into a demultiplexer handler: header decode, body
/// decode, then `deliver` with the caller's state.
pub struct TableHandler<D, F> {
    decoder: D,
    deliver: F,
}

impl<D, F> TableHandler<D, F> {
    pub fn new(decoder: D, deliver: F) -> Self {
        Self { decoder, deliver }
    }
}

impl<S, D, F> SectionHandler<S> for TableHandler<D, F>
where
    D: TableDecoder,
    F: FnMut(D::Output, &mut S) -> Result<(), TableFormatError>,
{
    fn on_section(&mut self, pid: u16, data: &[u8], state: &mut S) -> Result<(), TableFormatError> {
        let section = Section::parse(pid, data)?;
        let output = self.decoder.decode(&section)?;
        (self.deliver)(output, state)
    }
}

/// Skips a descriptor loop of `length` bytes without interpreting it.
pub(crate) fn skip_bytes(reader: &mut BodyReader<'_>, length: usize) -> Result<(), TableFormatError> {
    use bitstream_io::BitRead;
    reader.skip(length as u32 * 8)?;
    Ok(())
}

/// Rejects anything but ATSC protocol_version 0.
pub(crate) fn read_protocol_version(reader: &mut BodyReader<'_>) -> Result<(), TableFormatError> {
    use bitstream_io::BitRead;
    let version = reader.read::<8, u8>()?;
    if version != 0 {
        return Err(TableFormatError::ProtocolVersion(version));
    }
    Ok(())
}
