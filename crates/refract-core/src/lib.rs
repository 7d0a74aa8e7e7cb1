//! Refract Core - runtime reflection and generic invocation
//!
//! This crate lets calling code wrap arbitrary callables behind one
//! uniform invocation interface, and describe and invoke methods, fields
//! and enumerations of arbitrary types by name.
//!
//! - [`Value`]: type-erased container with conversion and comparison
//!   through the process-wide type table ([`types`])
//! - [`Callback`]: type-erased invocable handle over functions, bound
//!   methods, slots and future producers
//! - [`Future`]: single-assignment result with ordered completions
//! - [`meta`]: meta objects and the inheritance-aware registry
//!
//! # Example
//!
//! ```ignore
//! use refract_core::{values, Callback};
//!
//! let add = Callback::from_fn(|a: i32, b: i32| a + b);
//! let sum = add.invoke(&values![2, "40"])?;
//! assert_eq!(sum.to::<i32>()?, 42);
//! ```

#![warn(missing_docs)]

pub mod callback;
pub mod defaults;
pub mod error;
pub mod future;
pub mod meta;
pub mod types;
pub mod value;

pub use callback::{Binding, Callback, CallbackKind, MethodFn, Signature, SlotReceiver, TypedFn};
pub use error::{InvocationError, ReflectError, ReflectResult};
pub use future::{Future, FutureState, GenericFuture};
pub use meta::{
    Annotated, FieldAccess, MetaAnnotation, MetaEnum, MetaField, MetaIndex, MetaMethod,
    MetaObject, MetaObjectBuilder, MetaRegistry, MetaRegistryBuilder, MethodKind, RecursionDepth,
    RegistryConfig, Serializer,
};
pub use types::TypeKey;
pub use value::{shared, Entries, Items, Shared, Value, ValueList, ValueMap};
