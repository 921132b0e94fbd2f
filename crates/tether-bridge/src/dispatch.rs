//! The host-call dispatcher.
//!
//! Decodes the single `(op, a, b)` entry point into registry and codec
//! operations and encodes the result back into one integer. One bridge
//! instance serves one guest; all state lives on the instance, never in a
//! process-wide global.

use log::{debug, error};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::catalog::HostFunctions;
use crate::codec;
use crate::error::{BridgeError, BridgeResult};
use crate::guest::{guest_op, Guest, LANDING_PAD_SIZE};
use crate::registry::{Registered, Registry};

/// Host-call opcodes (guest → host).
pub mod opcode {
    /// Install the guest's callback entry point; `a` is its table index.
    pub const INSTALL_CALLBACK_ENTRY: u32 = 0;
    /// Create a module; returns the new handle.
    pub const CREATE_MODULE: u32 = 1;
    /// Register a function from a `{id, name, code}` envelope.
    pub const REGISTER_FN: u32 = 2;
    /// Register a callback from a `{module, callback, name}` envelope.
    pub const REGISTER_CB: u32 = 3;
    /// Call a function from a `{id, name, args}` envelope; returns a
    /// pair-descriptor address or 0.
    pub const CALL_FN: u32 = 4;
}

/// "No return value" — also the null payload address.
pub const NO_VALUE: u32 = 0;
/// "Host state not attached yet" (`-1` as u32).
pub const NO_STATE: u32 = u32::MAX;
/// "Unknown opcode" (`-2` as u32).
pub const BAD_OPCODE: u32 = u32::MAX - 1;

/// `{id, name, code}` — register a host function into module `id`.
#[derive(Deserialize)]
struct RegisterFn {
    id: u32,
    name: String,
    code: String,
}

/// `{module, callback, name}` — register guest callback handle `callback`
/// into module `module`.
#[derive(Deserialize)]
struct RegisterCallback {
    module: u32,
    callback: u32,
    name: String,
}

/// `{id, name, args}` — call `name` in module `id`.
#[derive(Deserialize)]
struct CallFn {
    id: u32,
    name: String,
    #[serde(default)]
    args: Value,
}

/// Live dispatcher state: the registry, the function catalog, and the
/// guest's installed callback entry point.
struct BridgeState {
    registry: Registry,
    catalog: HostFunctions,
    /// Table index of the guest's callback handler, once opcode 0 has
    /// installed it.
    entry: Option<u32>,
}

/// One guest's host-side bridge.
pub struct Bridge {
    state: Option<BridgeState>,
}

impl Bridge {
    /// A live bridge backed by `catalog`.
    pub fn new(catalog: HostFunctions) -> Self {
        Self {
            state: Some(BridgeState {
                registry: Registry::new(),
                catalog,
                entry: None,
            }),
        }
    }

    /// A bridge with no state attached. Models the window where the guest
    /// can already call out but the loader has not finished bootstrapping;
    /// every stateful opcode answers [`NO_STATE`].
    pub fn detached() -> Self {
        Self { state: None }
    }

    /// Attach live state to a detached bridge.
    pub fn attach(&mut self, catalog: HostFunctions) {
        self.state = Some(BridgeState {
            registry: Registry::new(),
            catalog,
            entry: None,
        });
    }

    /// Whether state is attached.
    pub fn is_live(&self) -> bool {
        self.state.is_some()
    }

    /// The installed callback entry point, if opcode 0 has run.
    pub fn callback_entry(&self) -> Option<u32> {
        self.state.as_ref().and_then(|s| s.entry)
    }

    /// Handle one guest → host call.
    ///
    /// In-band sentinels ([`NO_VALUE`], [`NO_STATE`], [`BAD_OPCODE`]) come
    /// back as `Ok`; an `Err` is that call's fatal result and the embedder
    /// is expected to raise it as a trap without tearing the bridge down.
    pub fn dispatch<G: Guest>(
        &mut self,
        guest: &mut G,
        op: u32,
        a: u32,
        b: u32,
    ) -> BridgeResult<u32> {
        let Some(state) = self.state.as_mut() else {
            // Unknown opcodes keep their own sentinel even before attach.
            return Ok(if op <= opcode::CALL_FN { NO_STATE } else { BAD_OPCODE });
        };

        match op {
            opcode::INSTALL_CALLBACK_ENTRY => {
                debug!("callback entry point installed at table index {a}");
                state.entry = Some(a);
                Ok(NO_VALUE)
            }
            opcode::CREATE_MODULE => {
                let handle = state.registry.create();
                debug!("created module {handle}");
                Ok(handle)
            }
            opcode::REGISTER_FN => {
                let env: RegisterFn = decode_envelope(guest, a, b)?;
                let f = state
                    .catalog
                    .resolve(&env.code)
                    .ok_or_else(|| BridgeError::UnknownCode(env.code.clone()))?;
                state.registry.get_mut(env.id)?.register_host(env.name, f);
                Ok(NO_VALUE)
            }
            opcode::REGISTER_CB => {
                let env: RegisterCallback = decode_envelope(guest, a, b)?;
                state
                    .registry
                    .get_mut(env.module)?
                    .register_callback(env.name, env.callback);
                Ok(NO_VALUE)
            }
            opcode::CALL_FN => {
                let env: CallFn = decode_envelope(guest, a, b)?;
                let args = normalize_args(env.args);
                let result = call_function(state, guest, env.id, &env.name, &args)?;
                Ok(codec::encode_pair(guest, result.as_ref()))
            }
            _ => Ok(BAD_OPCODE),
        }
    }
}

/// Decode an envelope span into its JSON shape. The span is released on a
/// successful parse (see [`codec::decode_json`]); a shape mismatch is a
/// malformed-envelope error for this call.
fn decode_envelope<G: Guest, T: DeserializeOwned>(
    guest: &mut G,
    ptr: u32,
    len: u32,
) -> BridgeResult<T> {
    let value = codec::decode_json(guest, ptr, len);
    serde_json::from_value(value).map_err(BridgeError::MalformedEnvelope)
}

/// Calls always take a positional list; a bare value is a one-element call.
fn normalize_args(args: Value) -> Vec<Value> {
    match args {
        Value::Array(items) => items,
        other => vec![other],
    }
}

/// Dispatch a call to whatever `name` resolves to in module `id`.
fn call_function<G: Guest>(
    state: &mut BridgeState,
    guest: &mut G,
    id: u32,
    name: &str,
    args: &[Value],
) -> BridgeResult<Option<Value>> {
    let registered = {
        let table = state.registry.get_mut(id)?;
        if table.poisoned() {
            return Err(BridgeError::ModulePoisoned(id));
        }
        table
            .get(name)
            .cloned()
            .ok_or_else(|| BridgeError::UnknownFunction {
                module: id,
                name: name.to_string(),
            })?
    };

    match registered {
        Registered::Host(f) => {
            let table = state.registry.get_mut(id)?;
            match f(&mut table.slot, args) {
                Ok(value) => Ok(value),
                Err(message) => {
                    // Fatal for this module: its state can no longer be
                    // trusted, so it is poisoned rather than rolled back.
                    table.mark_poisoned();
                    error!("module {id} function {name:?} faulted: {message}");
                    Err(BridgeError::FunctionFault {
                        module: id,
                        name: name.to_string(),
                        message,
                    })
                }
            }
        }
        Registered::Callback(handle) => reverse_call(state.entry, guest, handle, args),
    }
}

/// Call back into the guest: marshal the arguments into one JSON payload,
/// stage a landing pad, and invoke the installed entry point.
///
/// The pad and the payload both transfer to the guest handler, which
/// consumes them; the host must not release either. A returned descriptor
/// address of 0 means the guest produced no value.
fn reverse_call<G: Guest>(
    entry: Option<u32>,
    guest: &mut G,
    handle: u32,
    args: &[Value],
) -> BridgeResult<Option<Value>> {
    let entry = entry.ok_or(BridgeError::NoCallbackEntry)?;

    let payload = match args {
        [single] => single.clone(),
        many => Value::Array(many.to_vec()),
    };
    let (ptr, len) = codec::encode_payload(guest, Some(&payload));

    let pad = guest.alloc(LANDING_PAD_SIZE);
    guest.write_u32(pad, handle);
    guest.write_u32(pad + 4, ptr);
    guest.write_u32(pad + 8, len);

    let ret = guest.call_table(entry, guest_op::CALLBACK, pad, 0);
    if ret == 0 {
        return Ok(None);
    }
    let (ret_ptr, ret_len) = codec::decode_pair(guest, ret);
    Ok(Some(codec::decode_json(guest, ret_ptr, ret_len)))
}
