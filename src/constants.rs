//! Constants for MPEG-TS framing and ATSC PSIP decoding

/// MPEG-TS packet constants
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_SYNC_BYTE: u8 = 0x47;
/// First payload byte after the fixed 4-byte header
pub const TS_HEADER_SIZE: usize = 4;

/// Well-known PIDs
pub const PAT_PID: u16 = 0x0000;
pub const PSIP_PID: u16 = 0x1FFB; // ATSC base PID
pub const NULL_PID: u16 = 0x1FFF;

/// Table ids handled by the decoders
pub mod table_id {
    pub const PAT: u8 = 0x00;
    pub const PMT: u8 = 0x02;
    /// Vendor-private sections observed on PMT PIDs in the wild
    pub const PRIVATE_C0: u8 = 0xC0;
    pub const PRIVATE_C1: u8 = 0xC1;
    pub const MGT: u8 = 0xC7;
    pub const TVCT: u8 = 0xC8;
    pub const CVCT: u8 = 0xC9;
    pub const RRT: u8 = 0xCA;
    pub const EIT: u8 = 0xCB;
    pub const STT: u8 = 0xCD;
}

/// Long-form header fields (5 bytes) plus CRC-32 (4 bytes), counted by section_length
pub const LONG_FORM_OVERHEAD: usize = 9;

/// MGT table_type ranges
pub const MGT_EIT_FIRST: u16 = 0x0100;
pub const MGT_EIT_END: u16 = 0x0180;
pub const MGT_ETT_FIRST: u16 = 0x0200;
pub const MGT_ETT_END: u16 = 0x0280;

/// One slot per EIT-k announced by the MGT
pub const EIT_SLOT_COUNT: usize = (MGT_EIT_END - MGT_EIT_FIRST) as usize;

/// GPS seconds in STT/EIT are offset by this many leap seconds from UTC
pub const GPS_LEAP_SECONDS: i64 = 14;
