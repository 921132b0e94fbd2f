//! Marshaling and dispatch across the guest/host boundary.
//!
//! # Architecture
//!
//! The guest reaches the host through one imported function with a
//! four-integer calling convention, `host_call(op, a, b) → u32`. This crate
//! decodes that convention into structured operations — module creation,
//! function registration, calls, and reverse calls back into the guest —
//! and encodes structured results back into single integers.
//!
//! ## Host-call opcodes (guest → host)
//! - `0` — install the guest's callback entry point (`a` = table index)
//! - `1` — create a module, returns its handle
//! - `2` — register a function (`a`,`b` = span of JSON `{id, name, code}`)
//! - `3` — register a callback (`a`,`b` = span of `{module, callback, name}`)
//! - `4` — call a function (`a`,`b` = span of `{id, name, args}`), returns
//!   a pair-descriptor address or `0`
//!
//! ## Sentinels
//! `0` = no return value, `-1` = no host state yet, `-2` = unknown opcode.
//! All three are disjoint and must never be conflated.
//!
//! ## Wire format
//! Variable-length payloads travel as JSON text referenced by an 8-byte
//! `(offset, length)` pair descriptor in guest memory; every span is
//! single-use and released exactly once by whichever side consumes it.
//!
//! The guest side of this contract — allocator, deallocator, entrypoint,
//! and the table-dispatched callback handler — is abstracted behind the
//! [`Guest`] trait; instantiation of a real wasm engine lives outside this
//! crate (the [`mock`] module ships a scriptable in-memory stand-in).

pub mod catalog;
pub mod codec;
pub mod dispatch;
pub mod error;
pub mod guest;
pub mod mock;
pub mod registry;

pub use catalog::HostFunctions;
pub use dispatch::{opcode, Bridge, BAD_OPCODE, NO_STATE, NO_VALUE};
pub use error::{BridgeError, BridgeResult};
pub use guest::Guest;
pub use mock::MockGuest;
pub use registry::{HostFn, Registry};
