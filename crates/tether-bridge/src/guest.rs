//! Host-side view of an instantiated guest.
//!
//! Instantiation itself (engine, imports, binary retrieval) is the
//! embedder's job; the bridge only needs the four capabilities below. The
//! trait maps one-to-one onto the guest's exports: linear memory, `alloc`,
//! `dealloc`, and the indirect-call table the patcher made reachable. The
//! guest's `entrypoint` export is run once by the embedder at bootstrap
//! and never called through the bridge, so it stays outside the trait.

/// Opcodes understood by the guest's table-dispatched entry point.
pub mod guest_op {
    /// Allocate `a` bytes, returns the new span's address.
    pub const ALLOC: u32 = 0;
    /// Release the span `(a, b)`.
    pub const DEALLOC: u32 = 1;
    /// Run the callback named by the landing pad at `a`; returns a
    /// pair-descriptor address or 0.
    pub const CALLBACK: u32 = 2;
}

/// Byte size of a reverse-call landing pad: `(handle, payload_ptr,
/// payload_len)` as three little-endian u32s.
pub const LANDING_PAD_SIZE: u32 = 12;

/// An instantiated guest module, as the bridge sees it.
///
/// Memory access carries no bounds checking beyond what the implementation
/// itself enforces; an out-of-range offset is the implementation's to trap
/// or panic on, matching the guest's own unchecked-pointer contract.
pub trait Guest {
    /// Copy `buf.len()` bytes of linear memory at `offset` into `buf`.
    fn read(&self, offset: u32, buf: &mut [u8]);

    /// Copy `bytes` into linear memory at `offset`.
    fn write(&mut self, offset: u32, bytes: &[u8]);

    /// Ask the guest's allocator for a span of `size` bytes.
    fn alloc(&mut self, size: u32) -> u32;

    /// Return the span `(ptr, len)` to the guest's allocator. Must be
    /// called exactly once per span.
    fn free(&mut self, ptr: u32, len: u32);

    /// Invoke the function at `index` in the guest's exported table with
    /// the `(op, a, b)` convention.
    fn call_table(&mut self, index: u32, op: u32, a: u32, b: u32) -> u32;

    /// Read a little-endian u32 at `offset`.
    fn read_u32(&self, offset: u32) -> u32 {
        let mut buf = [0u8; 4];
        self.read(offset, &mut buf);
        u32::from_le_bytes(buf)
    }

    /// Write `value` little-endian at `offset`.
    fn write_u32(&mut self, offset: u32, value: u32) {
        self.write(offset, &value.to_le_bytes());
    }

    /// Read `len` bytes at `offset` into a fresh buffer.
    fn read_bytes(&self, offset: u32, len: u32) -> Vec<u8> {
        let mut buf = vec![0u8; len as usize];
        self.read(offset, &mut buf);
        buf
    }
}
