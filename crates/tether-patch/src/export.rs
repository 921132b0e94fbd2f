//! The table-export patch itself.
//!
//! Walks Table section → Export section → export entries, decides whether
//! table 0 is already exported, and if not splices one new export entry
//! into place. Anything unexpected — missing sections, more than one table,
//! truncated bytes — leaves the input untouched.

use std::borrow::Cow;

use log::debug;

use crate::cursor::{var_u32_len, write_var_u32, Cursor};
use crate::section::{find_section, Miss, Seek, SECTION_EXPORT, SECTION_TABLE};

/// The name the wasm toolchain gives the indirect-call table when it is
/// exported; the spliced entry uses the same name so the host-side lookup
/// works regardless of which path produced the export.
pub const TABLE_EXPORT_NAME: &str = "__indirect_function_table";

/// Export kind tag for tables.
const EXPORT_KIND_TABLE: u8 = 0x01;

/// `\0asm` magic plus version 1.
const HEADER: [u8; 8] = [0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];

/// What [`ensure_table_export`] did, for logging and tests. Every variant
/// except `Patched` means the input came back byte-identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// A new table export was spliced in.
    Patched,
    /// Table 0 is already exported; nothing to do.
    AlreadyExported,
    /// No table section — the module never needs the patch.
    NoTable,
    /// Zero or multiple declared tables; out of scope, left alone.
    UnsupportedTableCount(u32),
    /// No export section to splice into. Synthesizing one from scratch is
    /// a documented non-feature.
    NoExportSection,
    /// Bad header or a read ran off the end of the stream.
    Malformed,
}

/// Ensure the module's indirect-call table is exported, reporting what
/// happened alongside the (possibly new) bytes.
pub fn ensure_table_export(input: &[u8]) -> (Cow<'_, [u8]>, PatchOutcome) {
    let (bytes, outcome) = match plan(input) {
        Ok(Some(splice)) => (Cow::Owned(apply(input, &splice)), PatchOutcome::Patched),
        Ok(None) => (Cow::Borrowed(input), PatchOutcome::AlreadyExported),
        Err(outcome) => (Cow::Borrowed(input), outcome),
    };
    debug!("table export patch: {outcome:?}");
    (bytes, outcome)
}

/// [`ensure_table_export`] without the outcome report.
pub fn patch(input: &[u8]) -> Cow<'_, [u8]> {
    ensure_table_export(input).0
}

/// Everything `apply` needs to splice the new entry, recorded during the
/// inspection pass.
struct Splice {
    /// Offset of the export section's size varint.
    size_pos: usize,
    /// Declared export-section payload size.
    size: usize,
    /// Offset of the export-count varint (start of the payload).
    count_pos: usize,
    /// Byte length of the old count encoding.
    count_len: usize,
    /// Declared export count.
    count: u32,
    /// End of the export payload — where the new entry goes.
    payload_end: usize,
}

/// Inspect the container. `Ok(Some(_))` means splice, `Ok(None)` means the
/// table is already exported, `Err(_)` means leave the input alone.
fn plan(input: &[u8]) -> Result<Option<Splice>, PatchOutcome> {
    if input.len() < HEADER.len() || input[..HEADER.len()] != HEADER {
        return Err(PatchOutcome::Malformed);
    }
    let mut cursor = Cursor::new(input);
    cursor.skip(HEADER.len()).ok_or(PatchOutcome::Malformed)?;

    // Table section: exactly one declared table, or the module is out of
    // scope for this patch.
    let mut table = match find_section(cursor, SECTION_TABLE, Seek::Header) {
        Ok(found) => found,
        Err(Miss::Absent) => return Err(PatchOutcome::NoTable),
        Err(Miss::Truncated) => return Err(PatchOutcome::Malformed),
    };
    table.next_byte().ok_or(PatchOutcome::Malformed)?;
    let table_size = table.next_var_u32().ok_or(PatchOutcome::Malformed)? as usize;
    let table_count = table
        .clone()
        .next_var_u32()
        .ok_or(PatchOutcome::Malformed)?;
    if table_count != 1 {
        return Err(PatchOutcome::UnsupportedTableCount(table_count));
    }

    // The export section always comes after the table section, so the
    // search continues from here rather than from the start.
    table.skip(table_size).ok_or(PatchOutcome::Malformed)?;
    let mut export = match find_section(table, SECTION_EXPORT, Seek::Header) {
        Ok(found) => found,
        Err(Miss::Absent) => return Err(PatchOutcome::NoExportSection),
        Err(Miss::Truncated) => return Err(PatchOutcome::Malformed),
    };

    export.next_byte().ok_or(PatchOutcome::Malformed)?;
    let size_pos = export.pos();
    let size = export.next_var_u32().ok_or(PatchOutcome::Malformed)? as usize;
    let count_pos = export.pos();
    let count = export.next_var_u32().ok_or(PatchOutcome::Malformed)?;
    let count_len = export.pos() - count_pos;
    let payload_end = count_pos.checked_add(size).ok_or(PatchOutcome::Malformed)?;
    if payload_end > input.len() {
        return Err(PatchOutcome::Malformed);
    }

    // Scan every entry: (name length, name bytes, kind, index).
    for _ in 0..count {
        let name_len = export.next_var_u32().ok_or(PatchOutcome::Malformed)? as usize;
        export.skip(name_len).ok_or(PatchOutcome::Malformed)?;
        let kind = export.next_byte().ok_or(PatchOutcome::Malformed)?;
        let index = export.next_var_u32().ok_or(PatchOutcome::Malformed)?;
        if export.pos() > payload_end {
            return Err(PatchOutcome::Malformed);
        }
        if kind == EXPORT_KIND_TABLE && index == 0 {
            return Ok(None);
        }
    }
    // The declared size must be exactly the entries scanned, or the
    // insertion point cannot be trusted.
    if export.pos() != payload_end {
        return Err(PatchOutcome::Malformed);
    }

    Ok(Some(Splice {
        size_pos,
        size,
        count_pos,
        count_len,
        count,
        payload_end,
    }))
}

/// Rebuild the container with the new export entry appended to the export
/// payload. The output is assembled sequentially so every offset reflects
/// the varints already re-encoded before it; nothing is patched at a
/// recorded absolute offset.
fn apply(input: &[u8], splice: &Splice) -> Vec<u8> {
    let mut entry = Vec::with_capacity(TABLE_EXPORT_NAME.len() + 3);
    write_var_u32(&mut entry, TABLE_EXPORT_NAME.len() as u32);
    entry.extend_from_slice(TABLE_EXPORT_NAME.as_bytes());
    entry.push(EXPORT_KIND_TABLE);
    entry.push(0x00); // table index 0

    // Re-encoding count+1 can grow the varint; the section size must absorb
    // both the new entry and that growth.
    let new_count_len = var_u32_len(splice.count + 1);
    let new_size = splice.size + entry.len() + new_count_len - splice.count_len;

    let mut out = Vec::with_capacity(input.len() + entry.len() + 2);
    out.extend_from_slice(&input[..splice.size_pos]);
    write_var_u32(&mut out, new_size as u32);
    write_var_u32(&mut out, splice.count + 1);
    out.extend_from_slice(&input[splice.count_pos + splice.count_len..splice.payload_end]);
    out.extend_from_slice(&entry);
    out.extend_from_slice(&input[splice.payload_end..]);
    out
}
