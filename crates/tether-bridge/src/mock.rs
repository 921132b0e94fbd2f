//! A scriptable in-memory guest for exercising the bridge without a wasm
//! engine.
//!
//! `MockGuest` plays the guest's half of the wire contract: a linear
//! memory with a bump allocator, an installed table entry point, and a
//! callback handler the test scripts. The allocator tracks every live
//! span and panics on a double release, which is what makes the
//! "released exactly once" law testable.

use std::collections::HashMap;

use serde_json::Value;

use crate::guest::{guest_op, Guest, LANDING_PAD_SIZE};

/// Table index the mock's entry point lives at. Arbitrary but fixed, so
/// tests can install it via opcode 0 and the mock can reject calls through
/// any other index.
const ENTRY_INDEX: u32 = 7;

/// Spans start above address 0; 0 is the "no value" sentinel and must
/// never be a real allocation.
const HEAP_BASE: u32 = 8;

type CallbackHandler = Box<dyn FnMut(u32, Value) -> Option<Value>>;

/// In-memory stand-in for an instantiated guest module.
pub struct MockGuest {
    memory: Vec<u8>,
    next: u32,
    live: HashMap<u32, u32>,
    handler: Option<CallbackHandler>,
    calls: Vec<(u32, Value)>,
}

impl MockGuest {
    pub fn new() -> Self {
        Self {
            memory: vec![0; 64 * 1024],
            next: HEAP_BASE,
            live: HashMap::new(),
            handler: None,
            calls: Vec::new(),
        }
    }

    /// The table index of the mock's callback entry point, for opcode 0.
    pub fn table_entry(&self) -> u32 {
        ENTRY_INDEX
    }

    /// Script the guest-side callback handler: receives the callback
    /// handle and the decoded payload, returns the callback's result
    /// (`None` = no value, reported to the host as descriptor address 0).
    pub fn on_callback(&mut self, f: impl FnMut(u32, Value) -> Option<Value> + 'static) {
        self.handler = Some(Box::new(f));
    }

    /// Every reverse dispatch observed so far, as (handle, payload).
    pub fn callback_calls(&self) -> &[(u32, Value)] {
        &self.calls
    }

    /// Live (unreleased) spans, sorted by address. Empty means every span
    /// in the conversation was released exactly once.
    pub fn live_spans(&self) -> Vec<(u32, u32)> {
        let mut spans: Vec<_> = self.live.iter().map(|(&p, &l)| (p, l)).collect();
        spans.sort_unstable();
        spans
    }

    /// Guest-role helper for tests: serialize `value` into a fresh span,
    /// as the guest does when staging a call envelope.
    pub fn stage_json(&mut self, value: &Value) -> (u32, u32) {
        let text = value.to_string();
        let len = text.len() as u32;
        let ptr = self.alloc(len);
        self.write(ptr, text.as_bytes());
        (ptr, len)
    }

    /// Guest-role helper for tests: consume a pair descriptor returned by
    /// the host — unbox it, release it, read and release the payload, and
    /// parse the JSON — exactly what the real guest does with a call
    /// result.
    pub fn consume_pair(&mut self, pair: u32) -> Value {
        let ptr = self.read_u32(pair);
        let len = self.read_u32(pair + 4);
        self.free(pair, 8);
        let bytes = self.read_bytes(ptr, len);
        self.free(ptr, len);
        serde_json::from_slice(&bytes).expect("host returned unparseable payload")
    }

    /// Run the scripted callback handler for the landing pad at `pad`.
    /// The handler side consumes the pad and the payload span.
    fn run_callback(&mut self, pad: u32) -> u32 {
        let handle = self.read_u32(pad);
        let ptr = self.read_u32(pad + 4);
        let len = self.read_u32(pad + 8);
        self.free(pad, LANDING_PAD_SIZE);

        let bytes = self.read_bytes(ptr, len);
        self.free(ptr, len);
        let payload: Value =
            serde_json::from_slice(&bytes).expect("host sent unparseable callback payload");
        self.calls.push((handle, payload.clone()));

        let mut handler = self
            .handler
            .take()
            .expect("reverse dispatch without a scripted callback handler");
        let result = handler(handle, payload);
        self.handler = Some(handler);

        match result {
            None => 0,
            Some(value) => {
                let (ptr, len) = self.stage_json(&value);
                let pair = self.alloc(8);
                self.write_u32(pair, ptr);
                self.write_u32(pair + 4, len);
                pair
            }
        }
    }
}

impl Default for MockGuest {
    fn default() -> Self {
        Self::new()
    }
}

impl Guest for MockGuest {
    fn read(&self, offset: u32, buf: &mut [u8]) {
        let start = offset as usize;
        buf.copy_from_slice(&self.memory[start..start + buf.len()]);
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) {
        let start = offset as usize;
        self.memory[start..start + bytes.len()].copy_from_slice(bytes);
    }

    fn alloc(&mut self, size: u32) -> u32 {
        let ptr = self.next;
        self.next += size.max(1);
        if self.next as usize > self.memory.len() {
            self.memory.resize(self.next as usize, 0);
        }
        self.live.insert(ptr, size);
        ptr
    }

    fn free(&mut self, ptr: u32, len: u32) {
        match self.live.remove(&ptr) {
            Some(recorded) if recorded == len => {}
            Some(recorded) => panic!(
                "span at {ptr} released with length {len} but allocated with {recorded}"
            ),
            None => panic!("span at {ptr} released twice or never allocated"),
        }
    }

    fn call_table(&mut self, index: u32, op: u32, a: u32, b: u32) -> u32 {
        assert_eq!(index, ENTRY_INDEX, "no guest function at table index {index}");
        match op {
            guest_op::ALLOC => self.alloc(a),
            guest_op::DEALLOC => {
                self.free(a, b);
                0
            }
            guest_op::CALLBACK => self.run_callback(a),
            _ => u32::MAX,
        }
    }
}
