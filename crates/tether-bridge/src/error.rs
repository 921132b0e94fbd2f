//! Bridge error types.

use thiserror::Error;

/// Errors surfaced by a single dispatched call.
///
/// These fail the call that raised them, not the loader: the embedder turns
/// an `Err` into a trap for that call and keeps serving. Corrupted payload
/// JSON is deliberately *not* here — it decodes to `null` and leaks its span
/// (see [`crate::codec::decode_json`]).
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A module handle the registry never issued. The guest is trusted to
    /// only pass back handles it was given, so this fails fast.
    #[error("unknown module handle: {0}")]
    UnknownModule(u32),

    /// No function or callback registered under this name.
    #[error("module {module} has no function {name:?}")]
    UnknownFunction { module: u32, name: String },

    /// A register-function request named code the catalog does not carry.
    #[error("no host function in the catalog for code key {0:?}")]
    UnknownCode(String),

    /// An envelope span decoded to something that is not the expected
    /// JSON shape.
    #[error("malformed call envelope: {0}")]
    MalformedEnvelope(#[source] serde_json::Error),

    /// A reverse call was attempted before the guest installed its
    /// callback entry point (opcode 0).
    #[error("no callback entry point installed")]
    NoCallbackEntry,

    /// The module faulted earlier and its state can no longer be trusted.
    #[error("module {0} is poisoned by an earlier fault")]
    ModulePoisoned(u32),

    /// A registered function raised. Fatal for the owning module: it is
    /// marked poisoned and no rollback is attempted.
    #[error("module {module} function {name:?} faulted: {message}")]
    FunctionFault {
        module: u32,
        name: String,
        message: String,
    },
}

/// Bridge result type alias.
pub type BridgeResult<T> = Result<T, BridgeError>;
