//! Error kinds raised by untrusted stream input.
//!
//! Both kinds are recoverable: a [`FrameFormatError`] drops one packet, a
//! [`TableFormatError`] drops one section. Neither ever ends a session.

use std::io;

/// A 188-byte frame that cannot be interpreted as a transport packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FrameFormatError {
    #[error("packet is {0} bytes, expected 188")]
    BadLength(usize),

    #[error("bad sync byte 0x{0:02X}")]
    BadSync(u8),

    #[error("transport error indicator set")]
    TransportError,

    #[error("payload offset {0} out of range")]
    OffsetOutOfRange(usize),
}

/// A completed section that a table decoder refused.
#[derive(Debug, thiserror::Error)]
pub enum TableFormatError {
    #[error("unexpected table_id 0x{found:02X} for {table}")]
    UnexpectedTableId { table: &'static str, found: u8 },

    #[error("ATSC protocol version {0}, expected 0")]
    ProtocolVersion(u8),

    #[error("table_id_extension {found}, expected {expected}")]
    TableIdExtension { expected: u16, found: u16 },

    #[error("multi-section table (section {section_number} of {last_section_number})")]
    MultiSection {
        section_number: u8,
        last_section_number: u8,
    },

    #[error("{0} not present in a short-form section")]
    ShortFormSection(&'static str),

    #[error("section_length {0} too small")]
    BadSectionLength(u16),

    #[error("unsupported MSS text: {0}")]
    UnsupportedTextFormat(&'static str),

    #[error("section truncated")]
    Truncated(#[from] io::Error),
}

impl TableFormatError {
    pub(crate) fn truncated() -> Self {
        TableFormatError::Truncated(io::ErrorKind::UnexpectedEof.into())
    }
}
