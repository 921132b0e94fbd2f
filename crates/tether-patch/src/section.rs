//! Top-level section walk.
//!
//! A container is a fixed 8-byte header followed by sections, each an id
//! byte and a size-prefixed payload. The walk only ever moves forward; a
//! search for a later section continues from wherever the previous one
//! ended instead of re-scanning from the start.

use crate::cursor::Cursor;

/// Section id of the table section.
pub const SECTION_TABLE: u8 = 4;
/// Section id of the export section.
pub const SECTION_EXPORT: u8 = 7;

/// Where in a matched section the returned cursor should point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seek {
    /// At the section's id byte.
    Header,
    /// At the first byte of the section's payload.
    Payload,
}

/// Why a section search stopped without a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Miss {
    /// Clean end of stream — the section simply is not there. A valid,
    /// non-erroneous outcome.
    Absent,
    /// The stream ended inside a section header or payload.
    Truncated,
}

/// Walk `(id, size)` headers from `cursor` looking for section `id`.
///
/// Non-matching sections are skipped over by their declared size. On a
/// match the returned cursor points at the header byte or first payload
/// byte per `seek`.
pub fn find_section(mut cursor: Cursor<'_>, id: u8, seek: Seek) -> Result<Cursor<'_>, Miss> {
    loop {
        if cursor.remaining() == 0 {
            return Err(Miss::Absent);
        }
        let header = cursor.clone();
        let section_id = cursor.next_byte().ok_or(Miss::Truncated)?;
        let size = cursor.next_var_u32().ok_or(Miss::Truncated)? as usize;
        if section_id == id {
            return Ok(match seek {
                Seek::Header => header,
                Seek::Payload => cursor,
            });
        }
        cursor.skip(size).ok_or(Miss::Truncated)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_section_payload() {
        // Section 1 (2 bytes), section 7 (1 byte).
        let bytes = [1, 2, 0xaa, 0xbb, 7, 1, 0xcc];
        let found = find_section(Cursor::new(&bytes), SECTION_EXPORT, Seek::Payload).unwrap();
        assert_eq!(found.pos(), 6);

        let header = find_section(Cursor::new(&bytes), SECTION_EXPORT, Seek::Header).unwrap();
        assert_eq!(header.pos(), 4);
    }

    #[test]
    fn absence_is_not_an_error() {
        let bytes = [1, 2, 0xaa, 0xbb, 3, 0];
        let miss = find_section(Cursor::new(&bytes), SECTION_EXPORT, Seek::Payload).unwrap_err();
        assert_eq!(miss, Miss::Absent);

        let miss = find_section(Cursor::new(&[]), SECTION_TABLE, Seek::Header).unwrap_err();
        assert_eq!(miss, Miss::Absent);
    }

    #[test]
    fn truncated_payload_is_detected() {
        // Declared size runs past the end of the buffer.
        let bytes = [1, 9, 0xaa];
        let miss = find_section(Cursor::new(&bytes), SECTION_EXPORT, Seek::Payload).unwrap_err();
        assert_eq!(miss, Miss::Truncated);
    }

    #[test]
    fn truncated_header_is_detected() {
        // Id byte present, size varint cut off.
        let bytes = [1, 0x80];
        let miss = find_section(Cursor::new(&bytes), SECTION_EXPORT, Seek::Payload).unwrap_err();
        assert_eq!(miss, Miss::Truncated);
    }
}
