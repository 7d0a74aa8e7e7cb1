//! Callback registry
//!
//! A name → [`Callback`] table. Names are resolved once with
//! [`CallbackRegistry::link`] into a [`LinkedCallbacks`] table; after
//! linking, dispatch is an indexed call with no hash lookup.

use rustc_hash::FxHashMap;

use refract_core::{Callback, ReflectError, ReflectResult, Value};

use crate::resolver::Resolver;

/// Name → callback table
#[derive(Debug, Clone, Default)]
pub struct CallbackRegistry {
    callbacks: FxHashMap<String, Callback>,
}

impl CallbackRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback by name, replacing any previous one.
    ///
    /// Invalid callbacks are ignored.
    pub fn register(&mut self, name: &str, callback: Callback) {
        if !callback.is_valid() {
            tracing::warn!(name, "Ignoring invalid callback");
            return;
        }
        if self.callbacks.insert(name.to_string(), callback).is_some() {
            tracing::debug!(name, "Replaced callback");
        }
    }

    /// Get a callback by name
    pub fn get(&self, name: &str) -> Option<Callback> {
        self.callbacks.get(name).cloned()
    }

    /// Check if a callback is registered
    pub fn contains(&self, name: &str) -> bool {
        self.callbacks.contains_key(name)
    }

    /// Remove a callback
    pub fn remove(&mut self, name: &str) -> Option<Callback> {
        self.callbacks.remove(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.callbacks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Get the number of registered callbacks
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Invoke the callback registered as `name`
    pub fn invoke(&self, name: &str, args: &[Value]) -> ReflectResult<Value> {
        let callback = self.callbacks.get(name).ok_or_else(|| ReflectError::NotFound {
            kind: "callback",
            name: name.to_string(),
        })?;
        callback.invoke(args)
    }

    /// Resolve `names` into an indexed table.
    ///
    /// Fails on the first name that is not registered.
    pub fn link<S: AsRef<str>>(&self, names: &[S]) -> ReflectResult<LinkedCallbacks> {
        let mut callbacks = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            match self.get(name) {
                Some(callback) => callbacks.push(callback),
                None => {
                    return Err(ReflectError::NotFound {
                        kind: "callback",
                        name: name.to_string(),
                    });
                }
            }
        }
        Ok(LinkedCallbacks { callbacks })
    }
}

impl Resolver for CallbackRegistry {
    fn resolve(&self, name: &str) -> Option<Callback> {
        self.get(name)
    }
}

/// Callbacks resolved from a registry, dispatched by position
#[derive(Debug, Clone, Default)]
pub struct LinkedCallbacks {
    callbacks: Vec<Callback>,
}

impl LinkedCallbacks {
    /// Create an empty table
    pub fn empty() -> Self {
        Self::default()
    }

    /// Invoke the callback at `index`
    pub fn call(&self, index: usize, args: &[Value]) -> ReflectResult<Value> {
        match self.callbacks.get(index) {
            Some(callback) => callback.invoke(args),
            None => Err(ReflectError::NotFound {
                kind: "linked callback",
                name: index.to_string(),
            }),
        }
    }

    /// Get the number of linked callbacks
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Check if there are no linked callbacks
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}
