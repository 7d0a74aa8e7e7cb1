//! Builtin conversions, comparators, sequences and names

use std::any::Any;
use std::collections::HashMap;

use super::table::TypeTable;
use super::{erase_converter, install_list, install_map, ordering_of, TypeKey};
use crate::value::{Value, ValueMap};

fn convert<A, B>(table: &mut TypeTable, f: impl Fn(&A) -> Option<B> + Send + Sync + 'static)
where
    A: Any + Send + Sync,
    B: Any + Send + Sync,
{
    table.add_converter(TypeKey::of::<A>(), TypeKey::of::<B>(), erase_converter(f));
}

macro_rules! widen {
    ($table:expr; $($from:ty => $($to:ty),+);+ $(;)?) => {
        $($(convert::<$from, $to>($table, |v| Some(<$to>::from(*v)));)+)+
    };
}

macro_rules! narrow {
    ($table:expr; $($from:ty => $($to:ty),+);+ $(;)?) => {
        $($(convert::<$from, $to>($table, |v| <$to>::try_from(*v).ok());)+)+
    };
}

macro_rules! stringify_and_parse {
    ($table:expr; $($ty:ty),+ $(,)?) => {
        $(
            convert::<$ty, String>($table, |v| Some(v.to_string()));
            convert::<String, $ty>($table, |s| s.trim().parse::<$ty>().ok());
        )+
    };
}

macro_rules! comparable {
    ($table:expr; $($ty:ty),+ $(,)?) => {
        $($table.add_comparator(TypeKey::of::<$ty>(), ordering_of::<$ty>);)+
    };
}

macro_rules! names {
    ($table:expr; $($ty:ty => $name:expr),+ $(,)?) => {
        $($table.add_name($name, TypeKey::of::<$ty>());)+
    };
}

/// Only integral floats inside the target range convert
fn float_to_int<T: TryFrom<i64>>(v: f64) -> Option<T> {
    if !v.is_finite() || v.fract() != 0.0 {
        return None;
    }
    if v < i64::MIN as f64 || v >= i64::MAX as f64 {
        return None;
    }
    T::try_from(v as i64).ok()
}

pub(super) fn install(table: &mut TypeTable) {
    // Wider types first: cross-type comparison picks the first common type
    comparable!(table; f64, i64, u64, f32, i32, u32, usize, bool, char, String, &'static str);

    // Numeric widening
    widen!(table;
        i32 => i64, f64;
        u32 => u64, i64, f64;
        f32 => f64;
        bool => i64, i32;
    );
    convert::<i64, f64>(table, |v| Some(*v as f64));
    convert::<u64, f64>(table, |v| Some(*v as f64));
    convert::<usize, u64>(table, |v| u64::try_from(*v).ok());
    convert::<usize, i64>(table, |v| i64::try_from(*v).ok());

    // Checked narrowing
    narrow!(table;
        i64 => i32, u32, u64, usize;
        u64 => u32, i64, i32, usize;
        i32 => u32;
        u32 => i32;
    );
    convert::<f64, i64>(table, |v| float_to_int::<i64>(*v));
    convert::<f64, i32>(table, |v| float_to_int::<i32>(*v));
    convert::<f64, f32>(table, |v| {
        let narrowed = *v as f32;
        (narrowed.is_finite() || !v.is_finite()).then_some(narrowed)
    });
    convert::<i64, bool>(table, |v| Some(*v != 0));
    convert::<i32, bool>(table, |v| Some(*v != 0));

    // Text
    stringify_and_parse!(table; i32, i64, u32, u64, f32, f64, bool);
    convert::<char, String>(table, |c| Some(c.to_string()));
    convert::<&'static str, String>(table, |s| Some((*s).to_string()));

    // Sequences
    install_list::<Value>(table);
    install_list::<String>(table);
    install_list::<i64>(table);
    install_list::<f64>(table);
    install_map::<Value>(table);
    convert::<HashMap<String, Value>, ValueMap>(table, |m| {
        Some(m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    });

    names!(table;
        i32 => "i32",
        i64 => "i64",
        u32 => "u32",
        u64 => "u64",
        f32 => "f32",
        f64 => "f64",
        usize => "usize",
        bool => "bool",
        char => "char",
        String => "String",
        Value => "Value",
        Vec<Value> => "ValueList",
        ValueMap => "ValueMap",
        Vec<String> => "Vec<String>",
        () => "()",
    );
}

#[cfg(test)]
mod tests {
    use crate::error::ReflectError;
    use crate::value::Value;
    use crate::TypeKey;
    use std::cmp::Ordering;

    #[test]
    fn test_numeric_widening() {
        assert_eq!(Value::new(7i32).to::<i64>().unwrap(), 7);
        assert_eq!(Value::new(7i32).to::<f64>().unwrap(), 7.0);
        assert_eq!(Value::new(1.5f32).to::<f64>().unwrap(), 1.5);
    }

    #[test]
    fn test_checked_narrowing() {
        assert_eq!(Value::new(42i64).to::<i32>().unwrap(), 42);
        assert!(matches!(
            Value::new(i64::MAX).to::<i32>(),
            Err(ReflectError::ConversionFailed { .. })
        ));
        assert!(matches!(
            Value::new(-1i64).to::<u32>(),
            Err(ReflectError::ConversionFailed { .. })
        ));
        assert_eq!(Value::new(3.0f64).to::<i64>().unwrap(), 3);
        assert!(Value::new(2.6f64).to::<i64>().is_err());
        assert!(Value::new(f64::NAN).to::<i64>().is_err());
    }

    #[test]
    fn test_string_conversions() {
        assert_eq!(Value::new(12i32).to::<String>().unwrap(), "12");
        assert_eq!(Value::new("34").to::<String>().unwrap(), "34");
        assert_eq!(Value::new("34".to_string()).to::<i32>().unwrap(), 34);
        assert_eq!(Value::new(true).to::<String>().unwrap(), "true");
        assert!(matches!(
            Value::new("abc".to_string()).to::<i32>(),
            Err(ReflectError::ConversionFailed { .. })
        ));
    }

    #[test]
    fn test_chained_through_string() {
        // &str -> String -> i32
        assert_eq!(Value::new("17").to::<i32>().unwrap(), 17);
    }

    #[test]
    fn test_cross_type_comparison() {
        assert_eq!(Value::new(3i32), Value::new(3i64));
        assert!(Value::new(2i32) < Value::new(2.5f64));
        assert!(Value::new(3i32) > Value::new(2.6f64));
        assert_eq!(
            Value::new(10u32).compare(&Value::new(9i32)),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::new("a"), Value::new("a".to_string()));
    }

    #[test]
    fn test_null_comparison() {
        assert_eq!(Value::null().compare(&Value::null()), Some(Ordering::Equal));
        assert_eq!(Value::null().compare(&Value::new(0i32)), None);
        assert_eq!(Value::new(0i32).compare(&Value::null()), None);
    }

    #[test]
    fn test_conversion_unavailable() {
        let err = Value::new(1i32)
            .convert_to(TypeKey::of::<Vec<Value>>())
            .unwrap_err();
        assert!(matches!(err, ReflectError::ConversionUnavailable { .. }));
    }
}
