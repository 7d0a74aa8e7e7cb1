//! Typed adapters from native callables to the generic calling convention
//!
//! Implemented for plain functions and closures of up to eight parameters
//! (`TypedFn`) and for methods taking `&mut T` first (`MethodFn`). Each
//! parameter type must be `Any + Clone + Send + Sync`; arguments reach the
//! adapter already converted to the parameter types.
//!
//! Method arguments are extracted before the receiver is borrowed, so an
//! argument may be the receiver itself.

use std::any::Any;

use crate::error::{ReflectError, ReflectResult};
use crate::types::TypeKey;
use crate::value::Value;

/// Callable with statically known parameter types
pub trait TypedFn<Args>: Send + Sync + 'static {
    /// Native return type
    type Output;

    /// Parameter types in order
    fn params() -> Vec<TypeKey>;

    /// Call with exactly `params().len()` arguments
    fn call_with(&self, args: Vec<Value>) -> ReflectResult<Self::Output>;
}

/// Method on `T` with statically known parameter types
pub trait MethodFn<T, Args>: Send + Sync + 'static {
    /// Native return type
    type Output;

    /// Parameter types in order, excluding the receiver
    fn params() -> Vec<TypeKey>;

    /// Convert exactly `params().len()` arguments to the native tuple
    fn take_args(args: Vec<Value>) -> ReflectResult<Args>;

    /// Call on `this` with already extracted arguments
    fn apply(&self, this: &mut T, args: Args) -> Self::Output;

    /// Extract the arguments, then call on `this`
    fn call_with(&self, this: &mut T, args: Vec<Value>) -> ReflectResult<Self::Output> {
        let args = Self::take_args(args)?;
        Ok(self.apply(this, args))
    }
}

fn take_arg<A: Any + Clone + Send + Sync>(index: usize, value: Option<Value>) -> ReflectResult<A> {
    let value = value.unwrap_or_default();
    value
        .to::<A>()
        .map_err(|_| ReflectError::ArgumentConversion {
            index,
            expected: TypeKey::of::<A>().name(),
            got: value.type_name(),
        })
}

fn check_count(expected: usize, args: &[Value]) -> ReflectResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ReflectError::ArityMismatch {
            expected,
            got: args.len(),
        })
    }
}

macro_rules! impl_typed {
    ($($arg:ident),*) => {
        impl<F, R, $($arg,)*> TypedFn<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            $($arg: Any + Clone + Send + Sync,)*
        {
            type Output = R;

            fn params() -> Vec<TypeKey> {
                vec![$(TypeKey::of::<$arg>()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
            fn call_with(&self, args: Vec<Value>) -> ReflectResult<R> {
                check_count(<Self as TypedFn<($($arg,)*)>>::params().len(), &args)?;
                let mut args = args.into_iter();
                let mut index = 0usize;
                $(
                    let $arg = take_arg::<$arg>(index, args.next())?;
                    index += 1;
                )*
                Ok(self($($arg),*))
            }
        }

        impl<F, T, R, $($arg,)*> MethodFn<T, ($($arg,)*)> for F
        where
            F: Fn(&mut T, $($arg),*) -> R + Send + Sync + 'static,
            T: 'static,
            $($arg: Any + Clone + Send + Sync,)*
        {
            type Output = R;

            fn params() -> Vec<TypeKey> {
                vec![$(TypeKey::of::<$arg>()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
            fn take_args(args: Vec<Value>) -> ReflectResult<($($arg,)*)> {
                check_count(<Self as MethodFn<T, ($($arg,)*)>>::params().len(), &args)?;
                let mut args = args.into_iter();
                let mut index = 0usize;
                $(
                    let $arg = take_arg::<$arg>(index, args.next())?;
                    index += 1;
                )*
                Ok(($($arg,)*))
            }

            #[allow(non_snake_case, clippy::unused_unit)]
            fn apply(&self, this: &mut T, args: ($($arg,)*)) -> R {
                let ($($arg,)*) = args;
                self(this, $($arg),*)
            }
        }
    };
}

impl_typed!();
impl_typed!(A1);
impl_typed!(A1, A2);
impl_typed!(A1, A2, A3);
impl_typed!(A1, A2, A3, A4);
impl_typed!(A1, A2, A3, A4, A5);
impl_typed!(A1, A2, A3, A4, A5, A6);
impl_typed!(A1, A2, A3, A4, A5, A6, A7);
impl_typed!(A1, A2, A3, A4, A5, A6, A7, A8);
