//! ATSC multiple string structure, restricted to the single-string Latin-1 form
//! broadcasters use for titles in practice.

use crate::error::TableFormatError;

/// number_strings, ISO 639 code, number_segments, compression, mode
const MSS_PREAMBLE: usize = 7;

/// Decodes one title field. Fields too short to carry a string decode to `""`.
pub fn decode_mss(field: &[u8]) -> Result<String, TableFormatError> {
    if field.len() < MSS_PREAMBLE {
        return Ok(String::new());
    }
    if field[0] != 1 {
        return Err(TableFormatError::UnsupportedTextFormat("multiple strings"));
    }
    // field[1..4] is the language code
    if field[4] != 1 {
        return Err(TableFormatError::UnsupportedTextFormat("multiple segments"));
    }
    if field[5] != 0 {
        return Err(TableFormatError::UnsupportedTextFormat("compressed string"));
    }
    if field[6] != 0 {
        return Err(TableFormatError::UnsupportedTextFormat("non Latin-1 mode"));
    }
    // a 7-byte field has no number_bytes; same as the short case
    let Some(&len) = field.get(MSS_PREAMBLE) else {
        return Ok(String::new());
    };
    let text = field
        .get(MSS_PREAMBLE + 1..MSS_PREAMBLE + 1 + len as usize)
        .ok_or_else(TableFormatError::truncated)?;
    Ok(text.iter().map(|&b| b as char).collect())
}
