//! Build-time catalog of host functions.
//!
//! The original boundary let the guest register host functions as source
//! text compiled at runtime. A Rust host has no such capability, so the
//! `code` string in a register-function request is instead a key into this
//! catalog of closures fixed at build time. A deliberate capability
//! trade-off: the wire shape is unchanged, only the interpretation of
//! `code` narrows.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::registry::HostFn;

/// Named host closures available for registration.
#[derive(Default, Clone)]
pub struct HostFunctions {
    entries: HashMap<String, Arc<HostFn>>,
}

impl HostFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a closure under `key`, replacing any prior entry.
    pub fn insert<F>(&mut self, key: impl Into<String>, f: F)
    where
        F: Fn(&mut Value, &[Value]) -> Result<Option<Value>, String> + Send + Sync + 'static,
    {
        self.entries.insert(key.into(), Arc::new(f));
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with<F>(mut self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut Value, &[Value]) -> Result<Option<Value>, String> + Send + Sync + 'static,
    {
        self.insert(key, f);
        self
    }

    /// Resolve a `code` key to its closure.
    pub fn resolve(&self, key: &str) -> Option<Arc<HostFn>> {
        self.entries.get(key).cloned()
    }
}
