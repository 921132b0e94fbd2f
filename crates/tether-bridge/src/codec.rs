//! Pair-descriptor and payload codec.
//!
//! A variable-length payload crosses the boundary as JSON text referenced
//! by an `(offset, length)` pair. The pair may itself be boxed into an
//! 8-byte descriptor in guest memory when only one integer fits through
//! the call. Every span is single-use: the consuming side releases it
//! exactly once, with one deliberate exception noted on [`decode_json`].

use log::warn;
use serde_json::Value;

use crate::guest::Guest;

/// Byte size of a boxed `(offset, length)` descriptor.
pub const PAIR_SIZE: u32 = 8;

/// Read `len` bytes at `ptr` as text without releasing the span.
///
/// Each byte becomes one code unit (Latin-1). Multi-byte text is mis-read
/// by this mapping; a preserved limitation of the wire format, not a bug
/// to fix silently.
pub fn read_string(guest: &impl Guest, ptr: u32, len: u32) -> String {
    guest.read_bytes(ptr, len).into_iter().map(char::from).collect()
}

/// Read a string span and release it.
pub fn decode_string(guest: &mut impl Guest, ptr: u32, len: u32) -> String {
    let text = read_string(guest, ptr, len);
    guest.free(ptr, len);
    text
}

/// Read a JSON payload span, parse it, and release it.
///
/// On parse failure this returns `Value::Null` and **leaks the span on
/// purpose**: a payload that does not parse means something upstream
/// already corrupted memory, and releasing a suspect span risks a double
/// free on top of it.
pub fn decode_json(guest: &mut impl Guest, ptr: u32, len: u32) -> Value {
    let text = read_string(guest, ptr, len);
    match serde_json::from_str(&text) {
        Ok(value) => {
            guest.free(ptr, len);
            value
        }
        Err(err) => {
            warn!("unparseable payload at ({ptr}, {len}), leaking the span: {err}");
            Value::Null
        }
    }
}

/// Serialize `value` into a fresh guest span, returning its `(ptr, len)`.
///
/// `None` is the "no value" case and maps to the `(0, 0)` sentinel without
/// touching guest memory.
pub fn encode_payload(guest: &mut impl Guest, value: Option<&Value>) -> (u32, u32) {
    let Some(value) = value else {
        return (0, 0);
    };
    let text = value.to_string();
    let bytes = text.as_bytes();
    let len = bytes.len() as u32;
    let ptr = guest.alloc(len);
    guest.write(ptr, bytes);
    (ptr, len)
}

/// Serialize `value` and box its `(ptr, len)` into a fresh 8-byte
/// descriptor, returning the descriptor's address. `None` maps to the
/// address sentinel `0`.
pub fn encode_pair(guest: &mut impl Guest, value: Option<&Value>) -> u32 {
    let Some(value) = value else {
        return 0;
    };
    let (ptr, len) = encode_payload(guest, Some(value));
    let pair = guest.alloc(PAIR_SIZE);
    guest.write_u32(pair, ptr);
    guest.write_u32(pair + 4, len);
    pair
}

/// Unbox an 8-byte descriptor, releasing it, and return the payload's
/// `(ptr, len)`. The payload span itself is still live and still owed a
/// release by the caller.
pub fn decode_pair(guest: &mut impl Guest, pair: u32) -> (u32, u32) {
    let ptr = guest.read_u32(pair);
    let len = guest.read_u32(pair + 4);
    guest.free(pair, PAIR_SIZE);
    (ptr, len)
}
