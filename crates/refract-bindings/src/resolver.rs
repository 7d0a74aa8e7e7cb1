//! Name resolution for rendering collaborators
//!
//! A renderer sees bindings only by name. Each [`Resolver`] maps a name to
//! a [`Callback`]; the renderer invokes it and formats the resulting
//! [`Value`].

use refract_core::{
    Callback, MetaIndex, MetaObject, MetaRegistry, ReflectError, ReflectResult, Signature,
    SlotReceiver, TypeKey, Value,
};

/// Look up named bindings as callbacks
pub trait Resolver: Send + Sync {
    /// Callback bound to `name`, if any
    fn resolve(&self, name: &str) -> Option<Callback>;

    /// Resolve `name` and invoke it with `args`
    fn call(&self, name: &str, args: &[Value]) -> ReflectResult<Value> {
        match self.resolve(name) {
            Some(callback) => callback.invoke(args),
            None => Err(ReflectError::NotFound {
                kind: "binding",
                name: name.to_string(),
            }),
        }
    }
}

// ============================================================================
// Chain
// ============================================================================

/// Ordered list of resolvers; the first one that knows a name wins
#[derive(Default)]
pub struct ResolverChain {
    resolvers: Vec<Box<dyn Resolver>>,
}

impl ResolverChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resolver (consulted after the existing ones)
    pub fn push(&mut self, resolver: impl Resolver + 'static) {
        self.resolvers.push(Box::new(resolver));
    }

    /// Builder form of [`push`](Self::push)
    pub fn with(mut self, resolver: impl Resolver + 'static) -> Self {
        self.push(resolver);
        self
    }

    /// Number of resolvers in the chain
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    /// Check if the chain has no resolvers
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl Resolver for ResolverChain {
    fn resolve(&self, name: &str) -> Option<Callback> {
        self.resolvers.iter().find_map(|r| r.resolve(name))
    }
}

impl std::fmt::Debug for ResolverChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverChain")
            .field("resolvers", &self.resolvers.len())
            .finish()
    }
}

// ============================================================================
// Reflected object
// ============================================================================

/// Resolves names against one reflected instance.
///
/// A name resolves to the method of that name bound to the instance
/// (searching bases), or else to a zero-argument reader of the field.
#[derive(Debug, Clone)]
pub struct ObjectResolver {
    registry: MetaRegistry,
    class: MetaIndex,
    instance: Value,
}

impl ObjectResolver {
    /// Resolver for `instance`, described by its native type.
    ///
    /// Returns `None` if the registry has no object for the value's type.
    pub fn new(registry: &MetaRegistry, instance: Value) -> Option<Self> {
        let class_name = registry.describe(&instance)?.class_name().to_string();
        Self::for_class(registry, &class_name, instance)
    }

    /// Resolver for `instance` described as `class_name`
    pub fn for_class(registry: &MetaRegistry, class_name: &str, instance: Value) -> Option<Self> {
        let class = registry.index_of(class_name)?;
        Some(Self {
            registry: registry.clone(),
            class,
            instance,
        })
    }

    /// The reflected class of the instance
    pub fn meta(&self) -> Option<&MetaObject> {
        self.registry.get(self.class)
    }

    /// The wrapped instance
    pub fn instance(&self) -> &Value {
        &self.instance
    }
}

impl Resolver for ObjectResolver {
    fn resolve(&self, name: &str) -> Option<Callback> {
        let meta = self.meta()?;
        if let Some(method) = self.registry.lookup_method(meta, name) {
            let callback = method.callback(&self.instance);
            return callback.is_valid().then_some(callback);
        }
        let field = self.registry.lookup_field(meta, name)?;
        let callback = field.reader_callback(&self.instance);
        callback.is_valid().then_some(callback)
    }
}

impl SlotReceiver for ObjectResolver {
    fn slot_signature(&self, name: &str) -> Option<Signature> {
        let meta = self.meta()?;
        if let Some(method) = self.registry.lookup_method(meta, name) {
            return method.signature().cloned();
        }
        self.registry
            .lookup_field(meta, name)
            .filter(|field| field.is_readable())
            .map(|_| Signature::new(TypeKey::of::<Value>(), Vec::new()))
    }

    fn call_slot(&self, name: &str, args: Vec<Value>) -> ReflectResult<Value> {
        let callback = self.resolve(name).ok_or_else(|| ReflectError::NotFound {
            kind: "slot",
            name: name.to_string(),
        })?;
        callback.call(args)
    }
}
