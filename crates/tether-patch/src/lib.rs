//! Pre-instantiation patcher for guest `.wasm` binaries.
//!
//! The bridge calls into the guest through its indirect-call table, so the
//! table must be reachable from the host side before instantiation. Rust's
//! wasm toolchain does not export it by default; this crate rewrites the raw
//! container bytes to add the missing export.
//!
//! # Contract
//!
//! [`ensure_table_export`] is a pure byte transform. It either:
//!
//! - returns the input **unchanged** (the table is already exported, the
//!   module has no table, the module's shape is unsupported, or the bytes
//!   are malformed), or
//! - returns a new buffer identical to the input except for one extra entry
//!   in the export section: `("__indirect_function_table", table, 0)`.
//!
//! It never returns a partially edited container and never panics on
//! malformed input. Only the two section kinds the task needs (Table and
//! Export) are understood; everything else is opaque payload to skip over.

pub mod cursor;
pub mod export;
pub mod section;

pub use cursor::Cursor;
pub use export::{ensure_table_export, patch, PatchOutcome, TABLE_EXPORT_NAME};
