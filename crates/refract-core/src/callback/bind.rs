//! Partial application of callbacks
//!
//! Without placeholders, bound values are prepended to the call arguments.
//! With placeholders, the bound list is the complete argument list: each
//! `Placeholder(n)` takes the n-th call argument and any call arguments not
//! referenced are discarded.

use std::sync::Arc;

use super::{Callback, Signature, Target};
use crate::error::{ReflectError, ReflectResult};
use crate::types::TypeKey;
use crate::value::Value;

/// One bound argument position
#[derive(Debug, Clone)]
pub enum Binding {
    /// A fixed value
    Value(Value),
    /// The call argument at this index
    Placeholder(usize),
}

impl Binding {
    /// Bind a fixed value
    pub fn value<T: std::any::Any + Send + Sync>(value: T) -> Self {
        Binding::Value(Value::new(value))
    }

    /// Forward the call argument at `index`
    pub fn placeholder(index: usize) -> Self {
        Binding::Placeholder(index)
    }
}

impl From<Value> for Binding {
    fn from(value: Value) -> Self {
        Binding::Value(value)
    }
}

fn placeholder_arity(bindings: &[Binding]) -> Option<usize> {
    bindings
        .iter()
        .filter_map(|b| match b {
            Binding::Placeholder(n) => Some(*n + 1),
            Binding::Value(_) => None,
        })
        .max()
}

/// Build the full argument list for the wrapped callback
pub(super) fn resolve(bindings: &[Binding], args: &[Value]) -> ReflectResult<Vec<Value>> {
    let Some(arity) = placeholder_arity(bindings) else {
        let mut full = Vec::with_capacity(bindings.len() + args.len());
        full.extend(bindings.iter().filter_map(|b| match b {
            Binding::Value(v) => Some(v.clone()),
            Binding::Placeholder(_) => None,
        }));
        full.extend_from_slice(args);
        return Ok(full);
    };

    if args.len() < arity {
        return Err(ReflectError::ArityMismatch {
            expected: arity,
            got: args.len(),
        });
    }

    Ok(bindings
        .iter()
        .map(|b| match b {
            Binding::Value(v) => v.clone(),
            Binding::Placeholder(n) => args[*n].clone(),
        })
        .collect())
}

impl Callback {
    /// Partially apply this callback.
    ///
    /// Binding an invalid callback yields an invalid callback.
    pub fn bind(&self, bindings: Vec<Binding>) -> Callback {
        if !self.is_valid() {
            return Callback::invalid();
        }

        let inner_params = self.argument_types();
        let (params, variadic) = match placeholder_arity(&bindings) {
            None => {
                let params = inner_params.get(bindings.len()..).unwrap_or_default().to_vec();
                let variadic = self.is_variadic() && !params.is_empty();
                (params, variadic)
            }
            Some(arity) => {
                let params = (0..arity)
                    .map(|index| {
                        bindings
                            .iter()
                            .position(|b| matches!(b, Binding::Placeholder(n) if *n == index))
                            .and_then(|pos| inner_params.get(pos).copied())
                            .unwrap_or_else(TypeKey::of::<Value>)
                    })
                    .collect();
                (params, false)
            }
        };

        let signature = Signature::new(self.return_type(), params);
        Callback::from_parts(
            Target::Bound {
                inner: self.clone(),
                bindings: Arc::from(bindings),
            },
            signature,
            variadic,
        )
    }

    /// Prepend fixed values to every call
    pub fn bind_values(&self, values: Vec<Value>) -> Callback {
        self.bind(values.into_iter().map(Binding::Value).collect())
    }
}
