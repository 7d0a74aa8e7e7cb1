//! MetaRegistry - read-only collection of meta objects
//!
//! Built once through [`MetaRegistryBuilder`], then shared as a cheap
//! `Arc` handle. Base class names are resolved to indices at build time;
//! inheritance-aware lookups walk those links breadth-first.

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use super::member::{Annotated, MetaEnum, MetaField, MetaMethod};
use super::object::MetaObject;
use crate::defaults::DEFAULT_STRICT_BASES;
use crate::error::{ReflectError, ReflectResult};
use crate::types::TypeKey;
use crate::value::Value;

/// Registry build options
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Fail the build when a declared base is not registered
    /// (otherwise a warning is logged and the base is skipped)
    pub strict_bases: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            strict_bases: DEFAULT_STRICT_BASES,
        }
    }
}

/// Position of a meta object in its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetaIndex(usize);

impl MetaIndex {
    /// Raw position
    pub fn get(self) -> usize {
        self.0
    }
}

struct RegistryInner {
    objects: Vec<MetaObject>,
    /// Resolved bases per object, in declaration order
    bases: Vec<Vec<usize>>,
    by_name: FxHashMap<String, usize>,
    by_type: FxHashMap<TypeKey, usize>,
}

/// Read-only registry of meta objects
#[derive(Clone)]
pub struct MetaRegistry {
    inner: Arc<RegistryInner>,
}

/// Collects meta objects and resolves them into a [`MetaRegistry`]
#[derive(Default)]
pub struct MetaRegistryBuilder {
    config: RegistryConfig,
    objects: Vec<MetaObject>,
    by_name: FxHashMap<String, usize>,
}

impl MetaRegistryBuilder {
    /// Builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder with explicit configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Add a meta object. Class names must be unique.
    pub fn register(&mut self, object: MetaObject) -> ReflectResult<MetaIndex> {
        if self.by_name.contains_key(object.class_name()) {
            return Err(ReflectError::DuplicateType(object.class_name().to_string()));
        }
        let index = self.objects.len();
        tracing::debug!(class = object.class_name(), index, "Registered meta object");
        self.by_name.insert(object.class_name().to_string(), index);
        self.objects.push(object);
        Ok(MetaIndex(index))
    }

    /// Add several meta objects
    pub fn register_all(
        &mut self,
        objects: impl IntoIterator<Item = MetaObject>,
    ) -> ReflectResult<()> {
        for object in objects {
            self.register(object)?;
        }
        Ok(())
    }

    /// Number of objects registered so far
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if nothing has been registered
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Resolve bases and freeze the registry
    pub fn build(self) -> ReflectResult<MetaRegistry> {
        let mut bases = Vec::with_capacity(self.objects.len());
        for object in &self.objects {
            let mut resolved = Vec::with_capacity(object.bases().len());
            for base in object.bases() {
                match self.by_name.get(base) {
                    Some(index) => resolved.push(*index),
                    None if self.config.strict_bases => {
                        return Err(ReflectError::UnknownBase {
                            class: object.class_name().to_string(),
                            base: base.clone(),
                        });
                    }
                    None => {
                        tracing::warn!(
                            class = object.class_name(),
                            base = base.as_str(),
                            "Unknown base class, skipping"
                        );
                    }
                }
            }
            bases.push(resolved);
        }

        let mut by_type = FxHashMap::default();
        for (index, object) in self.objects.iter().enumerate() {
            if let Some(key) = object.type_key() {
                if by_type.insert(key, index).is_some() {
                    return Err(ReflectError::DuplicateType(key.name()));
                }
            }
        }

        tracing::debug!(types = self.objects.len(), "Built meta registry");

        Ok(MetaRegistry {
            inner: Arc::new(RegistryInner {
                objects: self.objects,
                bases,
                by_name: self.by_name,
                by_type,
            }),
        })
    }
}

impl MetaRegistry {
    /// Start building a registry
    pub fn builder() -> MetaRegistryBuilder {
        MetaRegistryBuilder::new()
    }

    /// An empty registry
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                objects: Vec::new(),
                bases: Vec::new(),
                by_name: FxHashMap::default(),
                by_type: FxHashMap::default(),
            }),
        }
    }

    // ========================================================================
    // Direct access
    // ========================================================================

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.inner.objects.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.inner.objects.is_empty()
    }

    /// Meta object at `index`
    pub fn get(&self, index: MetaIndex) -> Option<&MetaObject> {
        self.inner.objects.get(index.0)
    }

    /// Index of the type called `class_name`
    pub fn index_of(&self, class_name: &str) -> Option<MetaIndex> {
        self.inner.by_name.get(class_name).copied().map(MetaIndex)
    }

    /// Meta object called `class_name`
    pub fn by_name(&self, class_name: &str) -> Option<&MetaObject> {
        self.index_of(class_name).and_then(|index| self.get(index))
    }

    /// Meta object describing the native type `key`
    pub fn by_type(&self, key: TypeKey) -> Option<&MetaObject> {
        let index = *self.inner.by_type.get(&key)?;
        self.inner.objects.get(index)
    }

    /// Meta object describing `T`
    pub fn by_type_of<T: 'static>(&self) -> Option<&MetaObject> {
        self.by_type(TypeKey::of::<T>())
    }

    /// Meta object describing the runtime type of `value`
    pub fn describe(&self, value: &Value) -> Option<&MetaObject> {
        self.by_type(value.type_key())
    }

    /// All meta objects in registration order
    pub fn all(&self) -> impl Iterator<Item = &MetaObject> + Clone {
        self.inner.objects.iter()
    }

    /// Resolved bases of `object`, in declaration order
    pub fn bases_of(&self, object: &MetaObject) -> Vec<&MetaObject> {
        self.position_of(object)
            .map(|index| {
                self.inner.bases[index]
                    .iter()
                    .map(|base| &self.inner.objects[*base])
                    .collect()
            })
            .unwrap_or_default()
    }

    fn position_of(&self, object: &MetaObject) -> Option<usize> {
        self.inner.by_name.get(object.class_name()).copied()
    }

    // ========================================================================
    // Inheritance-aware lookup
    // ========================================================================

    /// The object followed by its ancestors, breadth-first.
    ///
    /// Bases of one class are visited in declaration order and each class
    /// at most once.
    fn lineage(&self, start: usize) -> impl Iterator<Item = &MetaObject> + '_ {
        let mut queue = VecDeque::from([start]);
        let mut visited = FxHashSet::default();
        std::iter::from_fn(move || {
            while let Some(index) = queue.pop_front() {
                if !visited.insert(index) {
                    continue;
                }
                queue.extend(self.inner.bases[index].iter().copied());
                return Some(&self.inner.objects[index]);
            }
            None
        })
    }

    fn lookup<'a, T: 'a>(
        &'a self,
        object: &MetaObject,
        find: impl Fn(&'a MetaObject) -> Option<&'a T>,
    ) -> Option<&'a T> {
        let start = self.position_of(object)?;
        self.lineage(start).find_map(find)
    }

    /// Method called `name` on `object` or its bases.
    ///
    /// Own methods shadow inherited ones. Among bases, the first declared
    /// base that provides the name wins.
    pub fn lookup_method(&self, object: &MetaObject, name: &str) -> Option<&MetaMethod> {
        self.lookup(object, |o| o.method(name))
    }

    /// Field called `name` on `object` or its bases
    pub fn lookup_field(&self, object: &MetaObject, name: &str) -> Option<&MetaField> {
        self.lookup(object, |o| o.field(name))
    }

    /// Enumeration called `name` on `object` or its bases
    pub fn lookup_enum(&self, object: &MetaObject, name: &str) -> Option<&MetaEnum> {
        self.lookup(object, |o| o.enumeration(name))
    }

    /// Every field visible on `object`: own fields first, then those of
    /// its ancestors breadth-first. Shadowed names appear once.
    ///
    /// An object that is not registered yields its own fields only.
    pub fn fields_of<'a>(&'a self, object: &'a MetaObject) -> Vec<&'a MetaField> {
        let Some(start) = self.position_of(object) else {
            return object.fields().iter().collect();
        };
        let mut seen = FxHashSet::default();
        self.lineage(start)
            .flat_map(MetaObject::fields)
            .filter(|&field| seen.insert(field.name()))
            .collect()
    }

    /// Check if `object` is `base` or inherits from it, directly or not
    pub fn inherits(&self, object: &MetaObject, base: &str) -> bool {
        self.position_of(object)
            .is_some_and(|start| self.lineage(start).any(|o| o.class_name() == base))
    }

    /// Types inheriting from `base`, directly or transitively, in
    /// registration order. `base` itself is not included.
    pub fn types_inheriting<'a>(
        &'a self,
        base: &'a str,
    ) -> impl Iterator<Item = &'a MetaObject> + Clone + 'a {
        self.inner
            .objects
            .iter()
            .filter(move |o| o.class_name() != base && self.inherits(o, base))
    }

    /// Types carrying an annotation called `name`, in registration order
    pub fn types_with_annotation<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a MetaObject> + Clone + 'a {
        self.inner
            .objects
            .iter()
            .filter(move |o| o.has_annotation(name))
    }

    // ========================================================================
    // Name-based invocation
    // ========================================================================

    /// Invoke the method `method` of class `class_name` on `instance`
    pub fn invoke_by_name(
        &self,
        class_name: &str,
        method: &str,
        instance: &Value,
        args: &[Value],
    ) -> ReflectResult<Value> {
        let object = self.by_name(class_name).ok_or_else(|| ReflectError::NotFound {
            kind: "type",
            name: class_name.to_string(),
        })?;
        let method = self
            .lookup_method(object, method)
            .ok_or_else(|| ReflectError::NotFound {
                kind: "method",
                name: format!("{class_name}::{method}"),
            })?;
        method.invoke(instance, args)
    }
}

impl std::fmt::Debug for MetaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaRegistry")
            .field("types", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::MetaObjectBuilder;

    fn static_returning(name: &str, tag: &'static str) -> MetaMethod {
        MetaMethod::static_fn(name, move || tag)
    }

    fn object(name: &str, bases: &[&str], methods: Vec<MetaMethod>) -> MetaObject {
        let mut builder = MetaObjectBuilder::new(name);
        for base in bases {
            builder = builder.base(base);
        }
        for method in methods {
            builder = builder.method(method);
        }
        builder.finish().unwrap()
    }

    fn tag_of(registry: &MetaRegistry, class: &str, method: &str) -> Option<String> {
        let object = registry.by_name(class)?;
        let method = registry.lookup_method(object, method)?;
        method.invoke(&Value::null(), &[]).ok()?.to::<String>().ok()
    }

    #[test]
    fn test_duplicate_type() {
        let mut builder = MetaRegistry::builder();
        builder.register(object("A", &[], vec![])).unwrap();
        let err = builder.register(object("A", &[], vec![])).unwrap_err();
        assert!(matches!(err, ReflectError::DuplicateType(name) if name == "A"));
    }

    #[test]
    fn test_unknown_base_lenient_and_strict() {
        let mut lenient = MetaRegistry::builder();
        lenient.register(object("A", &["Ghost"], vec![])).unwrap();
        let registry = lenient.build().unwrap();
        assert!(registry.bases_of(registry.by_name("A").unwrap()).is_empty());

        let mut strict = MetaRegistryBuilder::with_config(RegistryConfig { strict_bases: true });
        strict.register(object("A", &["Ghost"], vec![])).unwrap();
        assert!(matches!(
            strict.build(),
            Err(ReflectError::UnknownBase { .. })
        ));
    }

    #[test]
    fn test_derived_shadows_base() {
        let mut builder = MetaRegistry::builder();
        builder
            .register(object(
                "Base",
                &[],
                vec![
                    static_returning("name", "base"),
                    static_returning("only_base", "base"),
                ],
            ))
            .unwrap();
        builder
            .register(object("Derived", &["Base"], vec![static_returning("name", "derived")]))
            .unwrap();
        let registry = builder.build().unwrap();

        assert_eq!(tag_of(&registry, "Derived", "name").as_deref(), Some("derived"));
        assert_eq!(tag_of(&registry, "Derived", "only_base").as_deref(), Some("base"));
        assert_eq!(tag_of(&registry, "Base", "name").as_deref(), Some("base"));
        assert!(tag_of(&registry, "Derived", "missing").is_none());
    }

    #[test]
    fn test_first_declared_base_wins() {
        let mut builder = MetaRegistry::builder();
        builder
            .register(object("Left", &[], vec![static_returning("who", "left")]))
            .unwrap();
        builder
            .register(object("Right", &[], vec![static_returning("who", "right")]))
            .unwrap();
        builder
            .register(object("Both", &["Left", "Right"], vec![]))
            .unwrap();
        builder
            .register(object("BothReversed", &["Right", "Left"], vec![]))
            .unwrap();
        let registry = builder.build().unwrap();

        assert_eq!(tag_of(&registry, "Both", "who").as_deref(), Some("left"));
        assert_eq!(tag_of(&registry, "BothReversed", "who").as_deref(), Some("right"));
    }

    #[test]
    fn test_fields_of_includes_bases() {
        use crate::meta::FieldAccess;

        let mut builder = MetaRegistry::builder();
        builder
            .register(
                MetaObjectBuilder::new("Base")
                    .field(MetaField::described("id", "i64", FieldAccess::ReadOnly))
                    .field(MetaField::described("name", "String", FieldAccess::ReadOnly))
                    .finish()
                    .unwrap(),
            )
            .unwrap();
        builder
            .register(
                MetaObjectBuilder::new("Derived")
                    .base("Base")
                    .field(MetaField::described("name", "String", FieldAccess::ReadWrite))
                    .field(MetaField::described("extra", "bool", FieldAccess::ReadWrite))
                    .finish()
                    .unwrap(),
            )
            .unwrap();
        let registry = builder.build().unwrap();

        let derived = registry.by_name("Derived").unwrap();
        let fields = registry.fields_of(derived);
        let names: Vec<&str> = fields.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["name", "extra", "id"]);
        assert!(!fields[0].is_read_only());

        let loose = object("Loose", &["Base"], vec![]);
        assert!(registry.fields_of(&loose).is_empty());
    }

    #[test]
    fn test_diamond_and_cycle_terminate() {
        let mut builder = MetaRegistry::builder();
        builder.register(object("Top", &["Bottom"], vec![])).unwrap();
        builder.register(object("Mid1", &["Top"], vec![])).unwrap();
        builder.register(object("Mid2", &["Top"], vec![])).unwrap();
        builder.register(object("Bottom", &["Mid1", "Mid2"], vec![])).unwrap();
        let registry = builder.build().unwrap();

        let bottom = registry.by_name("Bottom").unwrap();
        assert!(registry.lookup_method(bottom, "nothing").is_none());
        assert!(registry.inherits(bottom, "Top"));
    }

    #[test]
    fn test_types_inheriting_is_transitive_and_restartable() {
        let mut builder = MetaRegistry::builder();
        builder.register(object("Animal", &[], vec![])).unwrap();
        builder.register(object("Dog", &["Animal"], vec![])).unwrap();
        builder.register(object("Rock", &[], vec![])).unwrap();
        builder.register(object("Puppy", &["Dog"], vec![])).unwrap();
        let registry = builder.build().unwrap();

        let iter = registry.types_inheriting("Animal");
        let names: Vec<&str> = iter.clone().map(MetaObject::class_name).collect();
        assert_eq!(names, vec!["Dog", "Puppy"]);
        assert_eq!(iter.count(), 2);
        assert_eq!(registry.types_inheriting("Nothing").count(), 0);
    }

    #[test]
    fn test_invoke_by_name_not_found() {
        let registry = MetaRegistry::empty();
        assert!(matches!(
            registry.invoke_by_name("Ghost", "boo", &Value::null(), &[]),
            Err(ReflectError::NotFound { kind: "type", .. })
        ));
    }
}
