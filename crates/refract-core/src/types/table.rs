//! Process-wide conversion, comparison and sequence table
//!
//! Registrations are additive and expected to happen during startup,
//! though the table stays usable from any thread afterwards. Converter
//! functions are cloned out of the lock before they run, so a converter
//! may itself convert or compare values.

use std::any::Any;
use std::cmp::Ordering;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::key::TypeKey;
use crate::defaults::MAX_CONVERSION_INTERMEDIATES;
use crate::error::{ReflectError, ReflectResult};
use crate::value::Value;

/// Type-erased converter. `None` means the value was rejected.
pub(crate) type ConvertFn = Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;

/// Type-erased ordering of two payloads of the same registered type.
pub(crate) type CompareFn = fn(&dyn Any, &dyn Any) -> Option<Ordering>;

/// Shape of a registered sequence type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    /// Ordered list of elements
    List,
    /// String-keyed associative container
    Map,
}

/// Index-based accessors for one sequence type
#[derive(Clone, Copy)]
pub struct SequenceAccess {
    /// List or map
    pub kind: SequenceKind,
    pub(crate) len: fn(&dyn Any) -> usize,
    pub(crate) item: fn(&dyn Any, usize) -> Option<Value>,
    pub(crate) key: Option<fn(&dyn Any, usize) -> Option<Value>>,
}

struct Converter {
    target: TypeKey,
    convert: ConvertFn,
}

enum ConversionPath {
    Direct(ConvertFn),
    Chained {
        via: TypeKey,
        first: ConvertFn,
        second: ConvertFn,
    },
}

/// Registered conversions, comparators, sequences and names
#[derive(Default)]
pub(crate) struct TypeTable {
    /// Outgoing converters per source type, in registration order
    converters: FxHashMap<TypeKey, Vec<Converter>>,
    comparators: FxHashMap<TypeKey, CompareFn>,
    /// Comparable types in registration order
    comparable_order: Vec<TypeKey>,
    sequences: FxHashMap<TypeKey, SequenceAccess>,
    names: FxHashMap<String, TypeKey>,
}

static TABLE: Lazy<RwLock<TypeTable>> = Lazy::new(|| {
    let mut table = TypeTable::default();
    super::builtin::install(&mut table);
    RwLock::new(table)
});

pub(crate) fn table() -> &'static RwLock<TypeTable> {
    &TABLE
}

impl TypeTable {
    // ========================================================================
    // Registration
    // ========================================================================

    /// Add a converter. A second registration for the same pair replaces
    /// the first but keeps its position.
    pub(crate) fn add_converter(&mut self, from: TypeKey, to: TypeKey, convert: ConvertFn) {
        if from == to {
            return;
        }
        let outgoing = self.converters.entry(from).or_default();
        match outgoing.iter_mut().find(|c| c.target == to) {
            Some(existing) => existing.convert = convert,
            None => outgoing.push(Converter {
                target: to,
                convert,
            }),
        }
    }

    pub(crate) fn add_comparator(&mut self, key: TypeKey, compare: CompareFn) {
        if self.comparators.insert(key, compare).is_none() {
            self.comparable_order.push(key);
        }
    }

    pub(crate) fn add_sequence(&mut self, key: TypeKey, access: SequenceAccess) {
        self.sequences.insert(key, access);
    }

    pub(crate) fn add_name(&mut self, name: &str, key: TypeKey) {
        self.names.insert(name.to_string(), key);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    fn direct(&self, from: TypeKey, to: TypeKey) -> Option<ConvertFn> {
        self.converters
            .get(&from)?
            .iter()
            .find(|c| c.target == to)
            .map(|c| c.convert.clone())
    }

    /// Direct converter first, then the first intermediate (in registration
    /// order of `from`'s converters) that reaches `to` directly.
    fn resolve(&self, from: TypeKey, to: TypeKey) -> Option<ConversionPath> {
        if let Some(direct) = self.direct(from, to) {
            return Some(ConversionPath::Direct(direct));
        }
        if MAX_CONVERSION_INTERMEDIATES == 0 {
            return None;
        }

        self.converters.get(&from)?.iter().find_map(|hop| {
            self.direct(hop.target, to).map(|second| ConversionPath::Chained {
                via: hop.target,
                first: hop.convert.clone(),
                second,
            })
        })
    }

    pub(crate) fn sequence(&self, key: TypeKey) -> Option<SequenceAccess> {
        self.sequences.get(&key).copied()
    }

    pub(crate) fn by_name(&self, name: &str) -> Option<TypeKey> {
        self.names.get(name).copied()
    }
}

// ============================================================================
// Operations on values
// ============================================================================

fn unavailable(from: TypeKey, to: TypeKey) -> ReflectError {
    ReflectError::ConversionUnavailable {
        from: from.name(),
        to: to.name(),
    }
}

fn failed(from: TypeKey, to: TypeKey) -> ReflectError {
    ReflectError::ConversionFailed {
        from: from.name(),
        to: to.name(),
    }
}

fn apply(value: &Value, convert: &ConvertFn) -> Option<Value> {
    value.with_ref(|any| convert(any)).flatten()
}

pub(crate) fn convert(value: &Value, target: TypeKey) -> ReflectResult<Value> {
    let from = value.type_key();
    if from == target {
        return Ok(value.clone());
    }
    if value.is_null() {
        return Err(unavailable(from, target));
    }

    let path = table().read().resolve(from, target);
    match path {
        None => Err(unavailable(from, target)),
        Some(ConversionPath::Direct(convert)) => {
            apply(value, &convert).ok_or_else(|| failed(from, target))
        }
        Some(ConversionPath::Chained { via, first, second }) => {
            tracing::trace!(
                from = %from,
                via = %via,
                to = %target,
                "Chained conversion"
            );
            let middle = apply(value, &first).ok_or_else(|| failed(from, target))?;
            apply(&middle, &second).ok_or_else(|| failed(from, target))
        }
    }
}

fn convert_direct(value: &Value, target: TypeKey) -> Option<Value> {
    if value.type_key() == target {
        return Some(value.clone());
    }
    let convert = table().read().direct(value.type_key(), target)?;
    apply(value, &convert)
}

pub(crate) fn can_convert(from: TypeKey, to: TypeKey) -> bool {
    from == to || table().read().resolve(from, to).is_some()
}

fn compare_same(left: &Value, right: &Value, compare: CompareFn) -> Option<Ordering> {
    left.with_ref(|l| right.with_ref(|r| compare(l, r)))
        .flatten()
        .flatten()
}

/// Compare two values.
///
/// Steps, first success wins: same comparable type; right converted to
/// left's type; left converted to right's type; the first registered
/// comparable type both convert to directly.
pub(crate) fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left.is_null(), right.is_null()) {
        (true, true) => return Some(Ordering::Equal),
        (true, false) | (false, true) => return None,
        (false, false) => {}
    }

    let lk = left.type_key();
    let rk = right.type_key();
    let (left_cmp, right_cmp) = {
        let table = table().read();
        (
            table.comparators.get(&lk).copied(),
            table.comparators.get(&rk).copied(),
        )
    };

    if lk == rk {
        if let Some(ordering) = left_cmp.and_then(|cmp| compare_same(left, right, cmp)) {
            return Some(ordering);
        }
        // Uncomparable on their own type: only a common type can order them
        return compare_common(left, right, lk, rk);
    }

    if let Some(cmp) = left_cmp {
        if let Ok(converted) = convert(right, lk) {
            if let Some(ordering) = compare_same(left, &converted, cmp) {
                return Some(ordering);
            }
        }
    }

    if let Some(cmp) = right_cmp {
        if let Ok(converted) = convert(left, rk) {
            if let Some(ordering) = compare_same(&converted, right, cmp) {
                return Some(ordering);
            }
        }
    }

    compare_common(left, right, lk, rk)
}

/// First registered comparable type, other than the operands' own, that
/// both sides convert to directly
fn compare_common(left: &Value, right: &Value, lk: TypeKey, rk: TypeKey) -> Option<Ordering> {
    let candidates: Vec<(TypeKey, CompareFn)> = {
        let table = table().read();
        table
            .comparable_order
            .iter()
            .filter(|key| **key != lk && **key != rk)
            .filter_map(|key| table.comparators.get(key).map(|cmp| (*key, *cmp)))
            .collect()
    };

    candidates.into_iter().find_map(|(key, cmp)| {
        let l = convert_direct(left, key)?;
        let r = convert_direct(right, key)?;
        compare_same(&l, &r, cmp)
    })
}

pub(crate) fn sequence_access(key: TypeKey) -> Option<SequenceAccess> {
    table().read().sequence(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_beats_chain() {
        let mut table = TypeTable::default();
        let a = TypeKey::of::<u8>();
        let b = TypeKey::of::<u16>();
        let c = TypeKey::of::<u32>();
        table.add_converter(a, b, Arc::new(|_| Some(Value::new(1u16))));
        table.add_converter(b, c, Arc::new(|_| Some(Value::new(2u32))));
        assert!(matches!(table.resolve(a, c), Some(ConversionPath::Chained { .. })));

        table.add_converter(a, c, Arc::new(|_| Some(Value::new(3u32))));
        assert!(matches!(table.resolve(a, c), Some(ConversionPath::Direct(_))));
    }

    #[test]
    fn test_chain_limited_to_one_intermediate() {
        let mut table = TypeTable::default();
        let a = TypeKey::of::<u8>();
        let b = TypeKey::of::<u16>();
        let c = TypeKey::of::<u32>();
        let d = TypeKey::of::<u64>();
        table.add_converter(a, b, Arc::new(|_| None));
        table.add_converter(b, c, Arc::new(|_| None));
        table.add_converter(c, d, Arc::new(|_| None));

        assert!(table.resolve(a, c).is_some());
        assert!(table.resolve(a, d).is_none());
    }

    #[test]
    fn test_first_registered_intermediate_wins() {
        let mut table = TypeTable::default();
        let a = TypeKey::of::<u8>();
        let b1 = TypeKey::of::<u16>();
        let b2 = TypeKey::of::<i16>();
        let c = TypeKey::of::<u32>();
        table.add_converter(a, b1, Arc::new(|_| None));
        table.add_converter(a, b2, Arc::new(|_| None));
        table.add_converter(b2, c, Arc::new(|_| None));
        table.add_converter(b1, c, Arc::new(|_| None));

        match table.resolve(a, c) {
            Some(ConversionPath::Chained { via, .. }) => assert_eq!(via, b1),
            _ => panic!("expected chained path"),
        }
    }

    #[test]
    fn test_reregistration_keeps_order() {
        let mut table = TypeTable::default();
        let a = TypeKey::of::<u8>();
        table.add_converter(a, TypeKey::of::<u16>(), Arc::new(|_| None));
        table.add_converter(a, TypeKey::of::<u32>(), Arc::new(|_| None));
        table.add_converter(a, TypeKey::of::<u16>(), Arc::new(|_| None));

        let targets: Vec<TypeKey> = table.converters[&a].iter().map(|c| c.target).collect();
        assert_eq!(targets, vec![TypeKey::of::<u16>(), TypeKey::of::<u32>()]);
    }

    #[test]
    fn test_self_conversion_ignored() {
        let mut table = TypeTable::default();
        let a = TypeKey::of::<u8>();
        table.add_converter(a, a, Arc::new(|_| None));
        assert!(table.converters.get(&a).is_none());
    }
}
