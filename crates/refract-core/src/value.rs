//! Value - type-erased container for one value of any type
//!
//! A `Value` pairs a runtime type identity ([`TypeKey`]) with its payload.
//! The payload is either owned (immutable and reference counted, so clones
//! are independent logical values) or a shared instance handle
//! ([`Shared<T>`]) whose clones alias the same live object.
//!
//! # Conversion
//!
//! `to::<T>()` and `convert_to()` resolve through the process-wide type
//! table: identity, then a direct converter, then a chain through at most
//! one intermediate type.
//!
//! # Sequences
//!
//! Values holding a registered list or map type can be iterated lazily
//! with [`Value::iter`] and [`Value::entries`]. For other types these
//! return `None` instead of failing.

use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{ReflectError, ReflectResult};
use crate::types::{self, SequenceAccess, SequenceKind, TypeKey};

/// Shared, lockable instance handle used for bound methods and fields.
pub type Shared<T> = Arc<RwLock<T>>;

/// List of values, the sequence type of variadic callbacks.
pub type ValueList = Vec<Value>;

/// String-keyed map of values.
pub type ValueMap = BTreeMap<String, Value>;

/// Wrap `value` into a new shared instance handle.
pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(RwLock::new(value))
}

type AnyArc = Arc<dyn Any + Send + Sync>;
type SharedReader = fn(&(dyn Any + Send + Sync), &mut dyn FnMut(&dyn Any));
type SharedWriter = fn(&(dyn Any + Send + Sync), &mut dyn FnMut(&mut dyn Any));

#[derive(Clone)]
enum Payload {
    Null,
    Owned(AnyArc),
    Shared {
        cell: AnyArc,
        read: SharedReader,
        write: SharedWriter,
    },
}

fn read_shared<T: Any + Send + Sync>(cell: &(dyn Any + Send + Sync), f: &mut dyn FnMut(&dyn Any)) {
    if let Some(lock) = cell.downcast_ref::<RwLock<T>>() {
        let guard = lock.read_recursive();
        f(&*guard);
    }
}

fn write_shared<T: Any + Send + Sync>(
    cell: &(dyn Any + Send + Sync),
    f: &mut dyn FnMut(&mut dyn Any),
) {
    if let Some(lock) = cell.downcast_ref::<RwLock<T>>() {
        let mut guard = lock.write();
        f(&mut *guard);
    }
}

/// Type-erased value
#[derive(Clone)]
pub struct Value {
    key: TypeKey,
    payload: Payload,
}

impl Value {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// The null value (also what `()`-returning callables produce)
    pub fn null() -> Self {
        Value {
            key: TypeKey::of::<()>(),
            payload: Payload::Null,
        }
    }

    /// Wrap a concrete value.
    ///
    /// Wrapping a `Value` returns it unchanged and wrapping `()` yields null.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        if TypeId::of::<T>() == TypeId::of::<()>() {
            return Self::null();
        }

        let boxed: Box<dyn Any + Send + Sync> = Box::new(value);
        match boxed.downcast::<Value>() {
            Ok(inner) => *inner,
            Err(boxed) => Value {
                key: TypeKey::of::<T>(),
                payload: Payload::Owned(Arc::from(boxed)),
            },
        }
    }

    /// Alias a shared instance. Clones of the result refer to the same object.
    pub fn from_shared<T: Any + Send + Sync>(instance: Shared<T>) -> Self {
        Value {
            key: TypeKey::of::<T>(),
            payload: Payload::Shared {
                cell: instance,
                read: read_shared::<T>,
                write: write_shared::<T>,
            },
        }
    }

    // ========================================================================
    // Type queries
    // ========================================================================

    /// Runtime identity of the stored type
    pub fn type_key(&self) -> TypeKey {
        self.key
    }

    /// Short name of the stored type
    pub fn type_name(&self) -> String {
        self.key.name()
    }

    /// Check if this is the null value
    pub fn is_null(&self) -> bool {
        matches!(self.payload, Payload::Null)
    }

    /// Check if the stored type is exactly `T`
    pub fn is<T: Any>(&self) -> bool {
        self.key.is::<T>()
    }

    /// Check if this value aliases a shared instance
    pub fn is_shared(&self) -> bool {
        matches!(self.payload, Payload::Shared { .. })
    }

    // ========================================================================
    // Access
    // ========================================================================

    /// Borrow an owned payload of type `T`.
    ///
    /// Returns `None` for shared handles; use [`Value::with_ref`] for those.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match &self.payload {
            Payload::Owned(inner) => inner.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Get the shared handle if this value aliases an instance of `T`
    pub fn shared_handle<T: Any + Send + Sync>(&self) -> Option<Shared<T>> {
        match &self.payload {
            Payload::Shared { cell, .. } => cell.clone().downcast::<RwLock<T>>().ok(),
            _ => None,
        }
    }

    /// Run `f` on the payload (read-locked for shared handles).
    ///
    /// Returns `None` for null.
    pub fn with_ref<R>(&self, f: impl FnOnce(&dyn Any) -> R) -> Option<R> {
        match &self.payload {
            Payload::Null => None,
            Payload::Owned(inner) => {
                let any: &dyn Any = &**inner;
                Some(f(any))
            }
            Payload::Shared { cell, read, .. } => {
                let mut f = Some(f);
                let mut out = None;
                read(&**cell, &mut |any| {
                    if let Some(f) = f.take() {
                        out = Some(f(any));
                    }
                });
                out
            }
        }
    }

    /// Run `f` on a shared instance under its write lock.
    ///
    /// Returns `None` unless this value is a shared handle.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut dyn Any) -> R) -> Option<R> {
        match &self.payload {
            Payload::Shared { cell, write, .. } => {
                let mut f = Some(f);
                let mut out = None;
                write(&**cell, &mut |any| {
                    if let Some(f) = f.take() {
                        out = Some(f(any));
                    }
                });
                out
            }
            _ => None,
        }
    }

    /// Copy the payload out if it is exactly `T` (no conversion)
    pub fn read_as<T: Any + Clone>(&self) -> Option<T> {
        self.with_ref(|any| any.downcast_ref::<T>().cloned()).flatten()
    }

    /// Extract the value as `T`, converting if necessary.
    ///
    /// Fails with `TypeMismatch` when the stored type is not `T` and no
    /// converter path exists. `to::<Value>()` returns the value itself.
    pub fn to<T: Any + Clone + Send + Sync>(&self) -> ReflectResult<T> {
        if TypeId::of::<T>() == TypeId::of::<Value>() {
            let boxed: Box<dyn Any> = Box::new(self.clone());
            return boxed
                .downcast::<T>()
                .map(|inner| *inner)
                .map_err(|_| self.mismatch::<T>());
        }

        if let Some(value) = self.read_as::<T>() {
            return Ok(value);
        }

        let converted = match self.convert_to(TypeKey::of::<T>()) {
            Ok(converted) => converted,
            Err(ReflectError::ConversionUnavailable { .. }) => return Err(self.mismatch::<T>()),
            Err(err) => return Err(err),
        };

        converted.read_as::<T>().ok_or_else(|| self.mismatch::<T>())
    }

    /// Produce a new value of type `target`. The source is never modified.
    pub fn convert_to(&self, target: TypeKey) -> ReflectResult<Value> {
        types::convert(self, target)
    }

    /// Check whether a converter path to `target` exists
    pub fn can_convert(&self, target: TypeKey) -> bool {
        self.key == target || types::can_convert(self.key, target)
    }

    /// Compare with another value. `None` means incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        types::compare(self, other)
    }

    fn mismatch<T: ?Sized + 'static>(&self) -> ReflectError {
        ReflectError::TypeMismatch {
            expected: TypeKey::of::<T>().name(),
            got: self.type_name(),
        }
    }

    // ========================================================================
    // Sequences
    // ========================================================================

    fn sequence_access(&self) -> Option<SequenceAccess> {
        if self.is_null() {
            return None;
        }
        types::sequence_access(self.key)
    }

    /// Check if the stored type is a registered sequence type
    pub fn is_list(&self) -> bool {
        self.sequence_access()
            .is_some_and(|access| access.kind == SequenceKind::List)
    }

    /// Check if the stored type is a registered associative type
    pub fn is_map(&self) -> bool {
        self.sequence_access()
            .is_some_and(|access| access.kind == SequenceKind::Map)
    }

    /// Number of elements, or `None` if the type is not a sequence
    pub fn item_count(&self) -> Option<usize> {
        let access = self.sequence_access()?;
        self.with_ref(|any| (access.len)(any))
    }

    /// Lazy iterator over the elements (values, for maps).
    ///
    /// Returns `None` if the type is not a registered sequence or map.
    /// The iterator is `Clone`, so it can be restarted.
    pub fn iter(&self) -> Option<Items> {
        let access = self.sequence_access()?;
        let len = self.item_count()?;
        Some(Items {
            source: self.clone(),
            access,
            index: 0,
            len,
        })
    }

    /// Lazy iterator over `(key, value)` pairs of a registered map type.
    pub fn entries(&self) -> Option<Entries> {
        let access = self.sequence_access()?;
        if access.kind != SequenceKind::Map {
            return None;
        }
        let len = self.item_count()?;
        Some(Entries {
            items: Items {
                source: self.clone(),
                access,
                index: 0,
                len,
            },
        })
    }

    fn describe(&self) -> Option<String> {
        self.with_ref(|any| {
            if let Some(v) = any.downcast_ref::<i32>() {
                Some(v.to_string())
            } else if let Some(v) = any.downcast_ref::<i64>() {
                Some(v.to_string())
            } else if let Some(v) = any.downcast_ref::<f64>() {
                Some(v.to_string())
            } else if let Some(v) = any.downcast_ref::<bool>() {
                Some(v.to_string())
            } else if let Some(v) = any.downcast_ref::<String>() {
                Some(format!("{v:?}"))
            } else {
                any.downcast_ref::<&'static str>().map(|v| format!("{v:?}"))
            }
        })
        .flatten()
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::null()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "Value::Null");
        }
        match self.describe() {
            Some(text) => write!(f, "Value<{}>({})", self.type_name(), text),
            None if self.is_shared() => write!(f, "Value<{}>(shared)", self.type_name()),
            None => write!(f, "Value<{}>", self.type_name()),
        }
    }
}

/// Build a `Vec<Value>` argument list from expressions.
///
/// ```ignore
/// let args = values![1, "two", 3.0];
/// ```
#[macro_export]
macro_rules! values {
    () => { ::std::vec::Vec::<$crate::Value>::new() };
    ($($item:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::new($item)),+]
    };
}

// ============================================================================
// Iteration
// ============================================================================

/// Lazy iterator over the elements of a sequence value
#[derive(Clone)]
pub struct Items {
    source: Value,
    access: SequenceAccess,
    index: usize,
    len: usize,
}

impl Iterator for Items {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        if self.index >= self.len {
            return None;
        }
        let index = self.index;
        self.index += 1;
        let item = self.access.item;
        self.source.with_ref(|any| item(any, index)).flatten()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len.saturating_sub(self.index);
        (0, Some(remaining))
    }
}

/// Lazy iterator over the entries of a map value
#[derive(Clone)]
pub struct Entries {
    items: Items,
}

impl Iterator for Entries {
    type Item = (Value, Value);

    fn next(&mut self) -> Option<(Value, Value)> {
        let index = self.items.index;
        let key_fn = self.items.access.key?;
        let value = self.items.next()?;
        let key = self
            .items
            .source
            .with_ref(|any| key_fn(any, index))
            .flatten()?;
        Some((key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_null_and_unit() {
        assert!(Value::null().is_null());
        assert!(Value::new(()).is_null());
        assert!(Value::default().is_null());
        assert_eq!(Value::null(), Value::null());
    }

    #[test]
    fn test_wrapping_value_is_transparent() {
        let inner = Value::new(7i32);
        let outer = Value::new(inner.clone());
        assert!(outer.is::<i32>());
        assert_eq!(outer.to::<i32>().unwrap(), 7);
    }

    #[test]
    fn test_identity_extraction() {
        let v = Value::new(String::from("hello"));
        assert_eq!(v.to::<String>().unwrap(), "hello");
        assert_eq!(v.downcast_ref::<String>().map(String::as_str), Some("hello"));
        assert!(v.downcast_ref::<i32>().is_none());
    }

    #[test]
    fn test_to_value_returns_self() {
        let v = Value::new(3.5f64);
        let same: Value = v.to::<Value>().unwrap();
        assert!(same.is::<f64>());
    }

    #[test]
    fn test_type_mismatch_without_converter() {
        #[derive(Clone)]
        struct Opaque;

        let v = Value::new(Opaque);
        let err = v.to::<i32>().unwrap_err();
        assert!(matches!(err, ReflectError::TypeMismatch { .. }));
    }

    #[test]
    fn test_shared_handles_alias() {
        let cell = shared(10i32);
        let a = Value::from_shared(cell.clone());
        let b = a.clone();

        assert!(a.is_shared());
        assert!(a.is::<i32>());
        b.with_mut(|any| {
            if let Some(n) = any.downcast_mut::<i32>() {
                *n += 5;
            }
        });

        assert_eq!(a.to::<i32>().unwrap(), 15);
        assert_eq!(*cell.read(), 15);
        assert!(a.shared_handle::<i32>().is_some());
        assert!(a.shared_handle::<i64>().is_none());
    }

    #[test]
    fn test_owned_values_are_not_writable() {
        let v = Value::new(1i32);
        assert!(v.with_mut(|_| ()).is_none());
    }

    #[test]
    fn test_list_iteration_is_restartable() {
        let list = Value::new(values![1i32, 2i32, 3i32]);
        assert!(list.is_list());
        assert!(!list.is_map());
        assert_eq!(list.item_count(), Some(3));

        let iter = list.iter().unwrap();
        let first: Vec<i32> = iter.clone().map(|v| v.to::<i32>().unwrap()).collect();
        let second: Vec<i32> = iter.map(|v| v.to::<i32>().unwrap()).collect();
        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_string_list_iteration() {
        let list = Value::new(vec!["a".to_string(), "b".to_string()]);
        let items: Vec<String> = list.iter().unwrap().map(|v| v.to::<String>().unwrap()).collect();
        assert_eq!(items, vec!["a", "b"]);
    }

    #[test]
    fn test_map_entries() {
        let mut map = ValueMap::new();
        map.insert("x".to_string(), Value::new(1i32));
        map.insert("y".to_string(), Value::new(2i32));
        let v = Value::new(map);

        assert!(v.is_map());
        assert_eq!(v.item_count(), Some(2));
        let entries: Vec<(String, i32)> = v
            .entries()
            .unwrap()
            .map(|(k, v)| (k.to::<String>().unwrap(), v.to::<i32>().unwrap()))
            .collect();
        assert_eq!(entries, vec![("x".to_string(), 1), ("y".to_string(), 2)]);
    }

    #[test]
    fn test_hash_map_is_map() {
        let mut map: HashMap<String, Value> = HashMap::new();
        map.insert("k".to_string(), Value::new(true));
        let v = Value::new(map);
        assert!(v.is_map());
        assert_eq!(v.iter().unwrap().count(), 1);
    }

    #[test]
    fn test_sequence_queries_not_applicable() {
        let v = Value::new(42i32);
        assert!(!v.is_list());
        assert!(!v.is_map());
        assert!(v.item_count().is_none());
        assert!(v.iter().is_none());
        assert!(v.entries().is_none());

        let list = Value::new(values![1i32]);
        assert!(list.entries().is_none());
    }

    #[test]
    fn test_debug_output() {
        assert_eq!(format!("{:?}", Value::new(5i32)), "Value<i32>(5)");
        assert_eq!(format!("{:?}", Value::null()), "Value::Null");
    }
}
