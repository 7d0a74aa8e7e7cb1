//! Callback - type-erased invocable target
//!
//! A callback wraps a free function or closure, a method bound to a shared
//! instance, a named slot on a receiver, or a producer of futures, and
//! calls any of them with a list of generic values. Arguments are checked
//! for count and converted to the declared parameter types before the
//! target runs.
//!
//! # Example
//!
//! ```ignore
//! let add = Callback::from_fn(|a: i32, b: i32| a + b);
//! let out = add.invoke(&values![2, "3"])?;
//! assert_eq!(out.to::<i32>()?, 5);
//! ```
//!
//! # Variadic callbacks
//!
//! A callback whose last parameter is `ValueList` can be made variadic with
//! [`Callback::into_variadic`]. Arguments beyond the fixed ones are then
//! folded into that trailing list.

mod bind;
mod typed;

pub use bind::Binding;
pub use typed::{MethodFn, TypedFn};

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::{ReflectError, ReflectResult};
use crate::future::{Future, GenericFuture};
use crate::types::TypeKey;
use crate::value::{Shared, Value, ValueList};

/// Generic calling convention shared by all callables
pub(crate) type Thunk = Arc<dyn Fn(Vec<Value>) -> ReflectResult<Value> + Send + Sync>;

/// What a callback points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    /// Empty callback
    Invalid,
    /// Free function or closure
    Function,
    /// Method bound to a shared instance
    BoundMethod,
    /// Named slot on a weakly held receiver
    Slot,
    /// Function whose result is a future
    FutureProducer,
}

/// Return type and ordered parameter types of a callable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Return type (`()` for none)
    pub return_type: TypeKey,
    /// Parameter types in order
    pub params: Vec<TypeKey>,
}

impl Signature {
    /// Create a signature
    pub fn new(return_type: TypeKey, params: Vec<TypeKey>) -> Self {
        Self {
            return_type,
            params,
        }
    }

    /// Number of declared parameters
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.return_type)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")
    }
}

/// Receiver of named slots.
///
/// Slot callbacks hold the receiver weakly; once it is dropped, invoking
/// the callback fails with `SlotUnavailable`.
pub trait SlotReceiver: Send + Sync {
    /// Signature of the named slot, or `None` if there is no such slot
    fn slot_signature(&self, name: &str) -> Option<Signature>;

    /// Call the named slot with converted arguments
    fn call_slot(&self, name: &str, args: Vec<Value>) -> ReflectResult<Value>;
}

#[derive(Clone)]
enum Target {
    Invalid,
    Thunk { kind: CallbackKind, thunk: Thunk },
    Slot {
        receiver: Weak<dyn SlotReceiver>,
        name: String,
    },
    Bound {
        inner: Callback,
        bindings: Arc<[Binding]>,
    },
}

struct Inner {
    target: Target,
    signature: Signature,
    variadic: bool,
}

/// Type-erased invocable target
#[derive(Clone)]
pub struct Callback {
    inner: Arc<Inner>,
}

impl Callback {
    // ========================================================================
    // Constructors
    // ========================================================================

    fn from_parts(target: Target, signature: Signature, variadic: bool) -> Self {
        Callback {
            inner: Arc::new(Inner {
                target,
                signature,
                variadic,
            }),
        }
    }

    pub(crate) fn from_thunk(kind: CallbackKind, signature: Signature, thunk: Thunk) -> Self {
        Self::from_parts(Target::Thunk { kind, thunk }, signature, false)
    }

    /// The empty callback
    pub fn invalid() -> Self {
        Self::from_parts(
            Target::Invalid,
            Signature::new(TypeKey::of::<()>(), Vec::new()),
            false,
        )
    }

    /// Wrap a function or closure.
    ///
    /// Parameter types are taken from the callable's signature; closures
    /// need annotated parameters.
    pub fn from_fn<Args, F>(f: F) -> Self
    where
        F: TypedFn<Args>,
        F::Output: Any + Send + Sync,
    {
        let signature = Signature::new(TypeKey::of::<F::Output>(), F::params());
        let thunk: Thunk = Arc::new(move |args| f.call_with(args).map(Value::new));
        Self::from_thunk(CallbackKind::Function, signature, thunk)
    }

    /// Wrap a function returning `Result`.
    ///
    /// An `Err` surfaces as `InvocationFailure` carrying the original error.
    pub fn from_try_fn<Args, F, R, E>(f: F) -> Self
    where
        F: TypedFn<Args, Output = Result<R, E>>,
        R: Any + Send + Sync,
        E: std::error::Error + Send + Sync + 'static,
    {
        let signature = Signature::new(TypeKey::of::<R>(), F::params());
        let thunk: Thunk = Arc::new(move |args| match f.call_with(args)? {
            Ok(value) => Ok(Value::new(value)),
            Err(err) => Err(ReflectError::invocation(err)),
        });
        Self::from_thunk(CallbackKind::Function, signature, thunk)
    }

    /// Wrap a function producing a future.
    ///
    /// The declared return type is the future's result type.
    /// [`Callback::invoke_async`] hands out the produced future itself.
    pub fn from_future_fn<Args, F, R>(f: F) -> Self
    where
        F: TypedFn<Args, Output = Future<R>>,
        R: Any + Clone + Send + Sync,
    {
        let signature = Signature::new(TypeKey::of::<R>(), F::params());
        let thunk: Thunk = Arc::new(move |args| Ok(Value::new(f.call_with(args)?.to_generic())));
        Self::from_thunk(CallbackKind::FutureProducer, signature, thunk)
    }

    /// Bind a method to a shared instance.
    ///
    /// Arguments are converted first; the instance is then write-locked
    /// for the duration of the call.
    pub fn from_method<T, Args, F>(instance: &Shared<T>, f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: MethodFn<T, Args>,
        F::Output: Any + Send + Sync,
    {
        let instance = instance.clone();
        let signature = Signature::new(TypeKey::of::<F::Output>(), F::params());
        let thunk: Thunk = Arc::new(move |args| {
            let args = F::take_args(args)?;
            let out = f.apply(&mut *instance.write(), args);
            Ok(Value::new(out))
        });
        Self::from_thunk(CallbackKind::BoundMethod, signature, thunk)
    }

    /// Bind a `Result`-returning method to a shared instance
    pub fn from_try_method<T, Args, F, R, E>(instance: &Shared<T>, f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: MethodFn<T, Args, Output = Result<R, E>>,
        R: Any + Send + Sync,
        E: std::error::Error + Send + Sync + 'static,
    {
        let instance = instance.clone();
        let signature = Signature::new(TypeKey::of::<R>(), F::params());
        let thunk: Thunk = Arc::new(move |args| {
            let args = F::take_args(args)?;
            let out = f.apply(&mut *instance.write(), args);
            match out {
                Ok(value) => Ok(Value::new(value)),
                Err(err) => Err(ReflectError::invocation(err)),
            }
        });
        Self::from_thunk(CallbackKind::BoundMethod, signature, thunk)
    }

    /// Refer to the slot `name` on `receiver`.
    ///
    /// The receiver is held weakly. If it has no such slot, the result is
    /// an invalid callback and an error is logged.
    pub fn slot<R: SlotReceiver + 'static>(receiver: &Arc<R>, name: &str) -> Self {
        let receiver: Arc<dyn SlotReceiver> = receiver.clone();
        Self::dyn_slot(&receiver, name)
    }

    /// [`Callback::slot`] for a receiver already behind a trait object
    pub fn dyn_slot(receiver: &Arc<dyn SlotReceiver>, name: &str) -> Self {
        let Some(signature) = receiver.slot_signature(name) else {
            tracing::error!(slot = name, "No such slot on receiver");
            return Self::invalid();
        };
        Self::from_parts(
            Target::Slot {
                receiver: Arc::downgrade(receiver),
                name: name.to_string(),
            },
            signature,
            false,
        )
    }

    /// Wrap a callable working directly on the generic convention.
    ///
    /// Arguments are checked and converted against `signature` first.
    pub fn from_raw(
        signature: Signature,
        f: impl Fn(Vec<Value>) -> ReflectResult<Value> + Send + Sync + 'static,
    ) -> Self {
        Self::from_thunk(CallbackKind::Function, signature, Arc::new(f))
    }

    /// Make this callback variadic.
    ///
    /// Fails with `InvalidVariadic` unless the last parameter is `ValueList`.
    pub fn into_variadic(self) -> ReflectResult<Callback> {
        let last = self.inner.signature.params.last().copied();
        if last != Some(TypeKey::of::<ValueList>()) {
            return Err(ReflectError::InvalidVariadic);
        }
        if self.inner.variadic {
            return Ok(self);
        }
        Ok(Self::from_parts(
            self.inner.target.clone(),
            self.inner.signature.clone(),
            true,
        ))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// What this callback points at
    pub fn kind(&self) -> CallbackKind {
        match &self.inner.target {
            Target::Invalid => CallbackKind::Invalid,
            Target::Thunk { kind, .. } => *kind,
            Target::Slot { .. } => CallbackKind::Slot,
            Target::Bound { inner, .. } => inner.kind(),
        }
    }

    /// Check if the callback has a target
    pub fn is_valid(&self) -> bool {
        self.kind() != CallbackKind::Invalid
    }

    /// Check if extra arguments are folded into a trailing list
    pub fn is_variadic(&self) -> bool {
        self.inner.variadic
    }

    /// Declared signature
    pub fn signature(&self) -> &Signature {
        &self.inner.signature
    }

    /// Declared return type
    pub fn return_type(&self) -> TypeKey {
        self.inner.signature.return_type
    }

    /// Declared parameter types
    pub fn argument_types(&self) -> &[TypeKey] {
        &self.inner.signature.params
    }

    /// Check if `args` would pass the count and convertibility checks
    pub fn check_arguments(&self, args: &[Value]) -> bool {
        if !self.is_valid() {
            return false;
        }
        if let Target::Bound { inner, bindings } = &self.inner.target {
            return bind::resolve(bindings, args).is_ok_and(|full| inner.check_arguments(&full));
        }

        let params = self.argument_types();
        let fixed = if self.inner.variadic {
            params.len() - 1
        } else {
            params.len()
        };
        let count_ok = if self.inner.variadic {
            args.len() >= fixed
        } else {
            args.len() == fixed
        };
        count_ok
            && args
                .iter()
                .zip(&params[..fixed])
                .all(|(arg, param)| accepts(arg, *param))
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    /// Invoke with `args`.
    ///
    /// Arguments are converted to the parameter types; a `()` result is
    /// returned as null.
    pub fn invoke(&self, args: &[Value]) -> ReflectResult<Value> {
        match &self.inner.target {
            Target::Invalid => Err(ReflectError::InvalidCallback),
            Target::Bound { inner, bindings } => {
                let full = bind::resolve(bindings, args)?;
                inner.invoke(&full)
            }
            Target::Thunk { thunk, .. } => {
                let prepared = self.prepare(args)?;
                thunk(prepared)
            }
            Target::Slot { receiver, name } => {
                let receiver = receiver
                    .upgrade()
                    .ok_or_else(|| ReflectError::SlotUnavailable(name.clone()))?;
                let prepared = self.prepare(args)?;
                receiver.call_slot(name, prepared)
            }
        }
    }

    /// Invoke with an owned argument list
    pub fn call(&self, args: Vec<Value>) -> ReflectResult<Value> {
        self.invoke(&args)
    }

    /// Invoke and hand back the result as a future.
    ///
    /// Future producers return their own future; any other target runs
    /// synchronously and yields an already settled future.
    pub fn invoke_async(&self, args: &[Value]) -> GenericFuture {
        match self.invoke(args) {
            Ok(value) if self.kind() == CallbackKind::FutureProducer => {
                match value.read_as::<GenericFuture>() {
                    Some(future) => future,
                    None => GenericFuture::failed(ReflectError::TypeMismatch {
                        expected: "Future".to_string(),
                        got: value.type_name(),
                    }),
                }
            }
            Ok(value) => GenericFuture::fulfilled(value),
            Err(err) => GenericFuture::failed(err),
        }
    }

    /// Convert `args` to the parameter types, folding variadic extras
    fn prepare(&self, args: &[Value]) -> ReflectResult<Vec<Value>> {
        let params = &self.inner.signature.params;

        if !self.inner.variadic {
            if args.len() != params.len() {
                return Err(ReflectError::ArityMismatch {
                    expected: params.len(),
                    got: args.len(),
                });
            }
            return args
                .iter()
                .zip(params)
                .enumerate()
                .map(|(index, (arg, param))| convert_argument(index, arg, *param))
                .collect();
        }

        let fixed = params.len() - 1;
        if args.len() < fixed {
            return Err(ReflectError::ArityMismatch {
                expected: fixed,
                got: args.len(),
            });
        }

        let mut prepared = Vec::with_capacity(params.len());
        for (index, (arg, param)) in args[..fixed].iter().zip(params).enumerate() {
            prepared.push(convert_argument(index, arg, *param)?);
        }
        let rest: ValueList = args[fixed..].to_vec();
        prepared.push(Value::new(rest));
        Ok(prepared)
    }
}

fn accepts(arg: &Value, param: TypeKey) -> bool {
    param == TypeKey::of::<Value>() || arg.can_convert(param)
}

fn convert_argument(index: usize, arg: &Value, param: TypeKey) -> ReflectResult<Value> {
    if param == TypeKey::of::<Value>() || arg.type_key() == param {
        return Ok(arg.clone());
    }
    arg.convert_to(param)
        .map_err(|_| ReflectError::ArgumentConversion {
            index,
            expected: param.name(),
            got: arg.type_name(),
        })
}

impl Default for Callback {
    fn default() -> Self {
        Self::invalid()
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        match (&self.inner.target, &other.inner.target) {
            (Target::Invalid, Target::Invalid) => true,
            _ => Arc::ptr_eq(&self.inner, &other.inner),
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("kind", &self.kind())
            .field("signature", &self.inner.signature.to_string())
            .field("variadic", &self.inner.variadic)
            .finish()
    }
}
