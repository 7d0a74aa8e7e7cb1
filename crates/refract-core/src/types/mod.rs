//! Runtime type table
//!
//! Registers conversions between types, comparators, sequence (list and
//! map) types and name aliases. All registrations are process-wide; the
//! builtin set is installed the first time the table is touched.
//!
//! ```ignore
//! types::register_conversion::<Celsius, f64>(|c| c.0);
//! types::register_comparable::<Celsius>();
//! ```

mod builtin;
mod key;
mod table;

use std::any::Any;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub use key::{short_type_name, TypeKey};
pub use table::{SequenceAccess, SequenceKind};

pub(crate) use table::{can_convert, compare, convert, sequence_access};

use crate::value::Value;

/// Register a total conversion from `A` to `B`.
pub fn register_conversion<A, B>(convert: impl Fn(&A) -> B + Send + Sync + 'static)
where
    A: Any + Send + Sync,
    B: Any + Send + Sync,
{
    register_fallible_conversion::<A, B>(move |a| Some(convert(a)));
}

/// Register a conversion that may reject a concrete value.
///
/// A `None` result surfaces as `ConversionFailed`.
pub fn register_fallible_conversion<A, B>(
    convert: impl Fn(&A) -> Option<B> + Send + Sync + 'static,
) where
    A: Any + Send + Sync,
    B: Any + Send + Sync,
{
    table::table().write().add_converter(
        TypeKey::of::<A>(),
        TypeKey::of::<B>(),
        erase_converter(convert),
    );
}

pub(crate) fn erase_converter<A, B>(
    convert: impl Fn(&A) -> Option<B> + Send + Sync + 'static,
) -> table::ConvertFn
where
    A: Any + Send + Sync,
    B: Any + Send + Sync,
{
    Arc::new(move |any: &dyn Any| any.downcast_ref::<A>().and_then(&convert).map(Value::new))
}

fn ordering_of<T: PartialOrd + Any>(left: &dyn Any, right: &dyn Any) -> Option<Ordering> {
    left.downcast_ref::<T>()?
        .partial_cmp(right.downcast_ref::<T>()?)
}

fn equality_of<T: PartialEq + Any>(left: &dyn Any, right: &dyn Any) -> Option<Ordering> {
    let equal = left.downcast_ref::<T>()? == right.downcast_ref::<T>()?;
    equal.then_some(Ordering::Equal)
}

/// Register `T` as ordered, enabling `<`, `>` and `==` between values.
pub fn register_comparable<T: PartialOrd + Any + Send + Sync>() {
    table::table()
        .write()
        .add_comparator(TypeKey::of::<T>(), ordering_of::<T>);
}

/// Register `T` as equality-comparable only. Unequal values are incomparable.
pub fn register_equatable<T: PartialEq + Any + Send + Sync>() {
    table::table()
        .write()
        .add_comparator(TypeKey::of::<T>(), equality_of::<T>);
}

// ============================================================================
// Sequences
// ============================================================================

fn list_len<T: Any>(any: &dyn Any) -> usize {
    any.downcast_ref::<Vec<T>>().map_or(0, Vec::len)
}

fn list_item<T: Any + Clone + Send + Sync>(any: &dyn Any, index: usize) -> Option<Value> {
    any.downcast_ref::<Vec<T>>()?.get(index).cloned().map(Value::new)
}

fn btree_len<V: Any>(any: &dyn Any) -> usize {
    any.downcast_ref::<BTreeMap<String, V>>().map_or(0, BTreeMap::len)
}

fn btree_item<V: Any + Clone + Send + Sync>(any: &dyn Any, index: usize) -> Option<Value> {
    let map = any.downcast_ref::<BTreeMap<String, V>>()?;
    map.values().nth(index).cloned().map(Value::new)
}

fn btree_key<V: Any>(any: &dyn Any, index: usize) -> Option<Value> {
    let map = any.downcast_ref::<BTreeMap<String, V>>()?;
    map.keys().nth(index).cloned().map(Value::new)
}

fn hash_len<V: Any>(any: &dyn Any) -> usize {
    any.downcast_ref::<HashMap<String, V>>().map_or(0, HashMap::len)
}

fn hash_item<V: Any + Clone + Send + Sync>(any: &dyn Any, index: usize) -> Option<Value> {
    let map = any.downcast_ref::<HashMap<String, V>>()?;
    map.values().nth(index).cloned().map(Value::new)
}

fn hash_key<V: Any>(any: &dyn Any, index: usize) -> Option<Value> {
    let map = any.downcast_ref::<HashMap<String, V>>()?;
    map.keys().nth(index).cloned().map(Value::new)
}

pub(crate) fn install_list<T: Any + Clone + Send + Sync>(table: &mut table::TypeTable) {
    table.add_sequence(
        TypeKey::of::<Vec<T>>(),
        SequenceAccess {
            kind: SequenceKind::List,
            len: list_len::<T>,
            item: list_item::<T>,
            key: None,
        },
    );

    if TypeKey::of::<T>() != TypeKey::of::<Value>() {
        table.add_converter(
            TypeKey::of::<Vec<T>>(),
            TypeKey::of::<Vec<Value>>(),
            erase_converter(|list: &Vec<T>| {
                Some(list.iter().cloned().map(Value::new).collect::<Vec<Value>>())
            }),
        );
        table.add_converter(
            TypeKey::of::<Vec<Value>>(),
            TypeKey::of::<Vec<T>>(),
            erase_converter(|list: &Vec<Value>| {
                list.iter()
                    .map(|item| item.to::<T>().ok())
                    .collect::<Option<Vec<T>>>()
            }),
        );
    }
}

pub(crate) fn install_map<V: Any + Clone + Send + Sync>(table: &mut table::TypeTable) {
    table.add_sequence(
        TypeKey::of::<BTreeMap<String, V>>(),
        SequenceAccess {
            kind: SequenceKind::Map,
            len: btree_len::<V>,
            item: btree_item::<V>,
            key: Some(btree_key::<V>),
        },
    );
    table.add_sequence(
        TypeKey::of::<HashMap<String, V>>(),
        SequenceAccess {
            kind: SequenceKind::Map,
            len: hash_len::<V>,
            item: hash_item::<V>,
            key: Some(hash_key::<V>),
        },
    );
}

/// Register `Vec<T>` as a list type.
///
/// Also registers conversions between `Vec<T>` and `Vec<Value>`.
pub fn register_list<T: Any + Clone + Send + Sync>() {
    install_list::<T>(&mut table::table().write());
}

/// Register `BTreeMap<String, V>` and `HashMap<String, V>` as map types.
pub fn register_map<V: Any + Clone + Send + Sync>() {
    install_map::<V>(&mut table::table().write());
}

// ============================================================================
// Names
// ============================================================================

/// Register `name` as an alias for `T`, used by name-based lookups
pub fn register_type_name<T: Any>(name: &str) {
    table::table().write().add_name(name, TypeKey::of::<T>());
}

/// Resolve a registered type name
pub fn type_by_name(name: &str) -> Option<TypeKey> {
    table::table().read().by_name(name)
}

/// Check whether a conversion path between two types exists
pub fn conversion_exists(from: TypeKey, to: TypeKey) -> bool {
    can_convert(from, to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Meters(f64);

    #[derive(Debug, Clone, PartialEq, PartialOrd)]
    struct Grams(u32);

    #[test]
    fn test_register_conversion() {
        register_conversion::<Meters, f64>(|m| m.0);
        let v = Value::new(Meters(2.5));
        assert_eq!(v.to::<f64>().unwrap(), 2.5);
        assert!(conversion_exists(TypeKey::of::<Meters>(), TypeKey::of::<f64>()));
    }

    #[test]
    fn test_fallible_conversion_failure() {
        register_fallible_conversion::<Grams, i8>(|g| i8::try_from(g.0).ok());
        let ok = Value::new(Grams(5));
        let big = Value::new(Grams(500));
        assert_eq!(ok.to::<i8>().unwrap(), 5);
        assert!(matches!(
            big.to::<i8>(),
            Err(crate::ReflectError::ConversionFailed { .. })
        ));
    }

    #[test]
    fn test_register_comparable() {
        register_comparable::<Grams>();
        assert!(Value::new(Grams(1)) < Value::new(Grams(2)));
        assert_eq!(Value::new(Grams(3)), Value::new(Grams(3)));
    }

    #[test]
    fn test_register_equatable() {
        register_equatable::<Meters>();
        assert_eq!(Value::new(Meters(1.0)), Value::new(Meters(1.0)));
        assert_eq!(Value::new(Meters(1.0)).compare(&Value::new(Meters(2.0))), None);
    }

    #[test]
    fn test_type_names() {
        register_type_name::<Meters>("Meters");
        assert_eq!(type_by_name("Meters"), Some(TypeKey::of::<Meters>()));
        assert_eq!(type_by_name("String"), Some(TypeKey::of::<String>()));
        assert!(type_by_name("NoSuchType").is_none());
    }

    #[test]
    fn test_register_list_converts_to_value_list() {
        register_list::<Grams>();
        let v = Value::new(vec![Grams(1), Grams(2)]);
        assert!(v.is_list());
        let generic = v.to::<Vec<Value>>().unwrap();
        assert_eq!(generic.len(), 2);
        let back = Value::new(generic).to::<Vec<Grams>>().unwrap();
        assert_eq!(back, vec![Grams(1), Grams(2)]);
    }
}
