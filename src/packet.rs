//! Transport packet framing: one 188-byte buffer → header fields + payload slices.

use crate::constants::{TS_HEADER_SIZE, TS_PACKET_SIZE, TS_SYNC_BYTE};
use crate::error::FrameFormatError;

/// A parsed transport packet. Payload slices borrow from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TsPacket<'a> {
    pub pid: u16,
    pub payload_unit_start: bool,
    pub scrambling_control: u8,
    pub adaptation_field_control: u8,
    pub continuity_counter: u8,
    /// Bytes from the (new) payload start to the end of the packet.
    pub payload: &'a [u8],
    /// Tail of the previous section, when the pointer field is non-zero.
    pub trailing_payload: Option<&'a [u8]>,
}

impl<'a> TsPacket<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, FrameFormatError> {
        if data.len() != TS_PACKET_SIZE {
            return Err(FrameFormatError::BadLength(data.len()));
        }
        if data[0] != TS_SYNC_BYTE {
            return Err(FrameFormatError::BadSync(data[0]));
        }
        if data[1] & 0x80 != 0 {
            return Err(FrameFormatError::TransportError);
        }

        let pid = (((data[1] & 0x1F) as u16) << 8) | (data[2] as u16);
        let payload_unit_start = data[1] & 0x40 != 0;
        let scrambling_control = (data[3] >> 6) & 0x03;
        let adaptation_field_control = (data[3] >> 4) & 0x03;
        let continuity_counter = data[3] & 0x0F;

        let mut offset = TS_HEADER_SIZE;
        if adaptation_field_control & 0x02 != 0 {
            offset += 1 + data[4] as usize;
        }
        check_offset(offset)?;

        let mut trailing_payload = None;
        if payload_unit_start {
            // pointer field needs one byte of its own
            let Some(&pointer) = data.get(offset) else {
                return Err(FrameFormatError::OffsetOutOfRange(offset + 1));
            };
            let pointer = pointer as usize;
            let start = offset + 1 + pointer;
            check_offset(start)?;
            if pointer != 0 {
                trailing_payload = Some(&data[offset + 1..start]);
            }
            offset = start;
        }

        Ok(TsPacket {
            pid,
            payload_unit_start,
            scrambling_control,
            adaptation_field_control,
            continuity_counter,
            payload: &data[offset..],
            trailing_payload,
        })
    }

    pub fn has_adaptation_field(&self) -> bool {
        self.adaptation_field_control & 0x02 != 0
    }
}

fn check_offset(offset: usize) -> Result<(), FrameFormatError> {
    if (TS_HEADER_SIZE..=TS_PACKET_SIZE).contains(&offset) {
        Ok(())
    } else {
        Err(FrameFormatError::OffsetOutOfRange(offset))
    }
}
