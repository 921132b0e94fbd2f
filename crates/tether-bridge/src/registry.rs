//! Module registry and per-module function tables.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{BridgeError, BridgeResult};

/// A host function: receives the owning module's persistent data slot and
/// positional arguments, returns a value or `None` for "no return value"
/// (the `(0, 0)` sentinel — distinct from JSON `null`).
pub type HostFn =
    dyn Fn(&mut Value, &[Value]) -> Result<Option<Value>, String> + Send + Sync;

/// What a name resolves to inside a module.
#[derive(Clone)]
pub enum Registered {
    /// A host-side function from the catalog.
    Host(Arc<HostFn>),
    /// A guest callback handle; invocation becomes a reverse call.
    Callback(u32),
}

/// One host-side module: a name → function map plus the shared data slot
/// its functions see across calls.
pub struct ModuleTable {
    functions: HashMap<String, Registered>,
    /// Persistent per-module state, the implicit receiver of every host
    /// function registered here.
    pub slot: Value,
    poisoned: bool,
}

impl ModuleTable {
    fn new() -> Self {
        Self {
            functions: HashMap::new(),
            slot: Value::Null,
            poisoned: false,
        }
    }

    /// Install a host function under `name`, replacing any prior entry.
    pub fn register_host(&mut self, name: String, f: Arc<HostFn>) {
        self.functions.insert(name, Registered::Host(f));
    }

    /// Install a guest callback under `name`, replacing any prior entry.
    pub fn register_callback(&mut self, name: String, handle: u32) {
        self.functions.insert(name, Registered::Callback(handle));
    }

    /// Look up a name.
    pub fn get(&self, name: &str) -> Option<&Registered> {
        self.functions.get(name)
    }

    /// Whether an earlier fault left this module's state untrustworthy.
    pub fn poisoned(&self) -> bool {
        self.poisoned
    }

    /// Mark the module possibly inconsistent. There is no un-poisoning:
    /// a faulted module never silently continues.
    pub fn mark_poisoned(&mut self) {
        self.poisoned = true;
    }
}

/// Issues module handles and owns the module tables. Owned by one bridge
/// instance — there is no process-wide registry, and independent bridges
/// never share state.
pub struct Registry {
    /// Next handle to issue. Starts above zero so handles never collide
    /// with the boundary sentinels; monotonic, never reused.
    next_handle: u32,
    modules: HashMap<u32, ModuleTable>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            modules: HashMap::new(),
        }
    }

    /// Create an empty module and return its handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle space is exhausted: the top two values of the
    /// range are the `-1`/`-2` boundary sentinels and must never be issued
    /// as handles.
    pub fn create(&mut self) -> u32 {
        let handle = self.next_handle;
        assert!(handle < u32::MAX - 1, "module handle space exhausted");
        self.next_handle += 1;
        self.modules.insert(handle, ModuleTable::new());
        handle
    }

    /// Look up a module. An unknown handle fails fast: the guest only
    /// ever sees handles this registry issued, so a miss is a contract
    /// violation, not an empty module.
    pub fn get_mut(&mut self, handle: u32) -> BridgeResult<&mut ModuleTable> {
        self.modules
            .get_mut(&handle)
            .ok_or(BridgeError::UnknownModule(handle))
    }

    /// Number of live modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
