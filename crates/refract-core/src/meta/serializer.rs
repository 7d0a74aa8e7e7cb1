//! Serializer - reflected instances to and from string-keyed value maps
//!
//! Fields are read and written through the registry's meta objects,
//! including inherited ones. Plain field values (numbers, bools, strings,
//! lists, maps and null) are stored as they are. A field whose value is
//! itself a reflected type becomes a nested map, as deep as the
//! [`RecursionDepth`] allows; anything else goes through the value
//! converter, to `String` when serializing and to the field's type when
//! populating.
//!
//! Fields that could not be handled are collected in
//! [`Serializer::failed_fields`], which is reset by every top-level call.
//!
//! # Example
//!
//! ```ignore
//! let mut serializer = Serializer::new(&registry).exclude(["password"]);
//! let map = serializer.serialize_as(&user, "User")?;
//! let copy = serializer.deserialize_as(&map, "User")?;
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use super::member::MetaField;
use super::object::MetaObject;
use super::registry::MetaRegistry;
use crate::error::{ReflectError, ReflectResult};
use crate::types::TypeKey;
use crate::value::{Value, ValueList, ValueMap};

/// Creates the instance a map is deserialized into
pub type InstanceCreator = Arc<dyn Fn(&MetaObject, &ValueMap) -> ReflectResult<Value> + Send + Sync>;

/// Fallback conversion of a value to a target type; `None` rejects it
pub type ValueConverter = Arc<dyn Fn(&Value, TypeKey) -> Option<Value> + Send + Sync>;

/// How many levels of nested reflected values are followed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecursionDepth {
    /// Nested reflected values are skipped
    #[default]
    NoRecursion,
    /// Follow up to this many nested levels
    Levels(usize),
    /// Follow every level. Cyclic object graphs do not terminate.
    Infinite,
}

impl RecursionDepth {
    fn levels(self) -> Option<usize> {
        match self {
            RecursionDepth::NoRecursion => Some(0),
            RecursionDepth::Levels(n) => Some(n),
            RecursionDepth::Infinite => None,
        }
    }
}

/// Outcome of handling one field
enum FieldOutcome {
    Done,
    Ignored,
    Failed,
}

fn is_plain(value: &Value) -> bool {
    let key = value.type_key();
    value.is_null()
        || key.is::<bool>()
        || key.is::<i32>()
        || key.is::<i64>()
        || key.is::<u32>()
        || key.is::<u64>()
        || key.is::<f32>()
        || key.is::<f64>()
        || key.is::<String>()
        || key.is::<Vec<String>>()
        || key.is::<ValueList>()
        || key.is::<ValueMap>()
}

/// Converts reflected instances to and from [`ValueMap`]s
pub struct Serializer<'r> {
    registry: &'r MetaRegistry,
    excluded: BTreeSet<String>,
    allowed_types: BTreeSet<String>,
    depth: RecursionDepth,
    creator: InstanceCreator,
    converter: ValueConverter,
    failed: Vec<String>,
}

impl<'r> Serializer<'r> {
    /// Serializer over `registry` with the default creator and converter.
    ///
    /// The default creator calls the first constructor taking no
    /// arguments; the default converter uses the type table.
    pub fn new(registry: &'r MetaRegistry) -> Self {
        Self {
            registry,
            excluded: BTreeSet::new(),
            allowed_types: BTreeSet::new(),
            depth: RecursionDepth::default(),
            creator: Arc::new(|meta: &MetaObject, _: &ValueMap| meta.instantiate(&[])),
            converter: Arc::new(|value: &Value, target: TypeKey| value.convert_to(target).ok()),
            failed: Vec::new(),
        }
    }

    /// Skip fields with these names
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded = names.into_iter().map(Into::into).collect();
        self
    }

    /// Store values of fields declared with these type names as they are
    pub fn allow_types<I, S>(mut self, type_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_types = type_names.into_iter().map(Into::into).collect();
        self
    }

    /// Set how deep nested reflected values are followed
    pub fn with_recursion_depth(mut self, depth: RecursionDepth) -> Self {
        self.depth = depth;
        self
    }

    /// Replace the instance creator used by `deserialize` and nested maps
    pub fn with_instance_creator(
        mut self,
        creator: impl Fn(&MetaObject, &ValueMap) -> ReflectResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.creator = Arc::new(creator);
        self
    }

    /// Replace the fallback value converter
    pub fn with_converter(
        mut self,
        converter: impl Fn(&Value, TypeKey) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        self.converter = Arc::new(converter);
        self
    }

    /// Excluded field names, sorted
    pub fn excluded(&self) -> impl Iterator<Item = &str> + '_ {
        self.excluded.iter().map(String::as_str)
    }

    /// Additional type names stored as they are, sorted
    pub fn allowed_types(&self) -> impl Iterator<Item = &str> + '_ {
        self.allowed_types.iter().map(String::as_str)
    }

    /// Configured recursion depth
    pub fn recursion_depth(&self) -> RecursionDepth {
        self.depth
    }

    /// Fields that failed during the last top-level call
    pub fn failed_fields(&self) -> &[String] {
        &self.failed
    }

    fn fields(&self, meta: &'r MetaObject) -> Vec<&'r MetaField> {
        self.registry
            .fields_of(meta)
            .into_iter()
            .filter(|field| !self.excluded.contains(field.name()))
            .collect()
    }

    fn meta_of(&self, type_name: &str) -> ReflectResult<&'r MetaObject> {
        self.registry
            .by_name(type_name)
            .ok_or_else(|| ReflectError::NotFound {
                kind: "type",
                name: type_name.to_string(),
            })
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    /// Read every field of `instance` into a map
    pub fn serialize(&mut self, instance: &Value, meta: &'r MetaObject) -> ValueMap {
        self.failed.clear();
        let map = self.serialize_level(instance, meta, self.depth.levels());
        if !self.failed.is_empty() {
            tracing::debug!(
                class = meta.class_name(),
                failed = ?self.failed,
                "Fields left out of serialized map"
            );
        }
        map
    }

    /// [`Serializer::serialize`] with the meta object looked up by name
    pub fn serialize_as(&mut self, instance: &Value, type_name: &str) -> ReflectResult<ValueMap> {
        let meta = self.meta_of(type_name)?;
        Ok(self.serialize(instance, meta))
    }

    fn serialize_level(
        &mut self,
        instance: &Value,
        meta: &'r MetaObject,
        remaining: Option<usize>,
    ) -> ValueMap {
        let mut map = ValueMap::new();
        for field in self.fields(meta) {
            match self.read_field(instance, field, remaining, &mut map) {
                FieldOutcome::Done | FieldOutcome::Ignored => {}
                FieldOutcome::Failed => self.failed.push(field.name().to_string()),
            }
        }
        map
    }

    fn read_field(
        &mut self,
        instance: &Value,
        field: &MetaField,
        remaining: Option<usize>,
        map: &mut ValueMap,
    ) -> FieldOutcome {
        let Ok(value) = field.read(instance) else {
            return FieldOutcome::Failed;
        };

        if is_plain(&value) || self.allowed_types.contains(field.type_name()) {
            map.insert(field.name().to_string(), value);
            return FieldOutcome::Done;
        }

        if let Some(nested) = self.registry.describe(&value) {
            if remaining == Some(0) {
                return FieldOutcome::Ignored;
            }
            let inner = self.serialize_level(&value, nested, remaining.map(|n| n - 1));
            map.insert(field.name().to_string(), Value::new(inner));
            return FieldOutcome::Done;
        }

        match (self.converter)(&value, TypeKey::of::<String>()) {
            Some(converted) => {
                map.insert(field.name().to_string(), converted);
                FieldOutcome::Done
            }
            None => FieldOutcome::Failed,
        }
    }

    // ========================================================================
    // Population
    // ========================================================================

    /// Write the fields present in `data` into `instance`.
    ///
    /// Returns `true` if no field failed. Keys missing from `data` and
    /// null values leave the field untouched.
    pub fn populate(&mut self, instance: &Value, meta: &'r MetaObject, data: &ValueMap) -> bool {
        self.failed.clear();
        self.populate_level(instance, meta, data, self.depth.levels())
    }

    /// [`Serializer::populate`] with the meta object looked up by name
    pub fn populate_as(
        &mut self,
        instance: &Value,
        type_name: &str,
        data: &ValueMap,
    ) -> ReflectResult<bool> {
        let meta = self.meta_of(type_name)?;
        Ok(self.populate(instance, meta, data))
    }

    /// Create an instance with the instance creator and populate it.
    ///
    /// Field failures do not fail the call; see
    /// [`Serializer::failed_fields`].
    pub fn deserialize(&mut self, data: &ValueMap, meta: &'r MetaObject) -> ReflectResult<Value> {
        self.failed.clear();
        let instance = (self.creator)(meta, data)?;
        if !self.populate_level(&instance, meta, data, self.depth.levels()) {
            tracing::debug!(
                class = meta.class_name(),
                failed = ?self.failed,
                "Deserialized with failed fields"
            );
        }
        Ok(instance)
    }

    /// [`Serializer::deserialize`] with the meta object looked up by name
    pub fn deserialize_as(&mut self, data: &ValueMap, type_name: &str) -> ReflectResult<Value> {
        let meta = self.meta_of(type_name)?;
        self.deserialize(data, meta)
    }

    fn populate_level(
        &mut self,
        instance: &Value,
        meta: &'r MetaObject,
        data: &ValueMap,
        remaining: Option<usize>,
    ) -> bool {
        let failed_before = self.failed.len();
        for field in self.fields(meta) {
            match self.write_field(instance, field, data, remaining) {
                FieldOutcome::Done | FieldOutcome::Ignored => {}
                FieldOutcome::Failed => self.failed.push(field.name().to_string()),
            }
        }
        self.failed.len() == failed_before
    }

    fn write_field(
        &mut self,
        instance: &Value,
        field: &MetaField,
        data: &ValueMap,
        remaining: Option<usize>,
    ) -> FieldOutcome {
        let Some(value) = data.get(field.name()).filter(|v| !v.is_null()) else {
            return FieldOutcome::Done;
        };

        let target = field.type_name();
        let value = if value.type_name() == target || target == "Value" {
            value.clone()
        } else if let (Some(nested), Some(map)) =
            (self.registry.by_name(target), value.read_as::<ValueMap>())
        {
            if remaining == Some(0) {
                return FieldOutcome::Ignored;
            }
            let Ok(child) = (self.creator)(nested, &map) else {
                return FieldOutcome::Failed;
            };
            if !self.populate_level(&child, nested, &map, remaining.map(|n| n - 1)) {
                return FieldOutcome::Failed;
            }
            child
        } else if let Some(key) = crate::types::type_by_name(target) {
            match (self.converter)(value, key) {
                Some(converted) => converted,
                None => return FieldOutcome::Failed,
            }
        } else {
            // Unknown to the type table: the field's writer converts
            value.clone()
        };

        match field.write(instance, &value) {
            Ok(()) => FieldOutcome::Done,
            Err(_) => FieldOutcome::Failed,
        }
    }
}

impl fmt::Debug for Serializer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serializer")
            .field("excluded", &self.excluded)
            .field("allowed_types", &self.allowed_types)
            .field("depth", &self.depth)
            .field("failed", &self.failed)
            .finish()
    }
}
