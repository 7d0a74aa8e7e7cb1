//! Future - single-assignment result with ordered completion callbacks
//!
//! A future is settled exactly once, either with a value (fulfilled) or an
//! error (failed). Clones share the same state. Completion callbacks run in
//! registration order, outside the internal lock, on the thread that
//! settles the future. A callback registered after settlement runs
//! immediately on the registering thread, unless the settling thread is
//! still draining the queue, in which case it is appended to the queue.
//!
//! `Future<T>` is a typed view; [`GenericFuture`] (`Future<Value>`) is the
//! type-erased view. Both share the same state and convert freely.

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::callback::Callback;
use crate::error::{ReflectError, ReflectResult};
use crate::types::TypeKey;
use crate::value::Value;

type Outcome = Result<Value, ReflectError>;
type Completion = Box<dyn FnOnce(&Outcome) + Send>;

/// Type-erased future
pub type GenericFuture = Future<Value>;

/// Settlement state of a future
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FutureState {
    /// Not settled yet
    Pending,
    /// Settled with a value
    Fulfilled,
    /// Settled with an error
    Failed,
}

struct Cell {
    outcome: Option<Outcome>,
    queue: VecDeque<Completion>,
    draining: bool,
}

struct Inner {
    state: Mutex<Cell>,
    settled: Condvar,
    result_type: TypeKey,
}

/// Shared single-assignment result
pub struct Future<T = Value> {
    inner: Arc<Inner>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Future {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for Future<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Future")
            .field("result_type", &self.inner.result_type)
            .field("state", &self.state())
            .finish()
    }
}

impl<T> Future<T> {
    fn with_result_type(result_type: TypeKey) -> Self {
        Future {
            inner: Arc::new(Inner {
                state: Mutex::new(Cell {
                    outcome: None,
                    queue: VecDeque::new(),
                    draining: false,
                }),
                settled: Condvar::new(),
                result_type,
            }),
            _marker: PhantomData,
        }
    }

    /// Declared result type
    pub fn result_type(&self) -> TypeKey {
        self.inner.result_type
    }

    /// Current settlement state
    pub fn state(&self) -> FutureState {
        match &self.inner.state.lock().outcome {
            None => FutureState::Pending,
            Some(Ok(_)) => FutureState::Fulfilled,
            Some(Err(_)) => FutureState::Failed,
        }
    }

    /// Check if the future has been settled
    pub fn is_finished(&self) -> bool {
        self.state() != FutureState::Pending
    }

    /// Type-erased view sharing this future's state
    pub fn to_generic(&self) -> GenericFuture {
        Future {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }

    /// Settle with an error
    pub fn fail(&self, error: ReflectError) -> ReflectResult<()> {
        self.settle(Err(error))
    }

    fn settle(&self, outcome: Outcome) -> ReflectResult<()> {
        {
            let mut state = self.inner.state.lock();
            if state.outcome.is_some() {
                return Err(ReflectError::AlreadySettled);
            }
            state.outcome = Some(outcome.clone());
            state.draining = true;
            self.inner.settled.notify_all();
        }

        loop {
            let next = {
                let mut state = self.inner.state.lock();
                let next = state.queue.pop_front();
                if next.is_none() {
                    state.draining = false;
                }
                next
            };
            match next {
                Some(completion) => completion(&outcome),
                None => break,
            }
        }

        Ok(())
    }

    fn register(&self, completion: Completion) {
        let outcome = {
            let mut state = self.inner.state.lock();
            match &state.outcome {
                Some(outcome) if !state.draining => outcome.clone(),
                _ => {
                    state.queue.push_back(completion);
                    return;
                }
            }
        };
        completion(&outcome);
    }

    /// Invoke `callback` with the result once settled.
    ///
    /// A failed future passes the error as a `ReflectError` value. Errors
    /// raised by the callback are logged and otherwise ignored.
    pub fn then(&self, callback: Callback) {
        self.register(Box::new(move |outcome: &Outcome| {
            let argument = match outcome {
                Ok(value) => value.clone(),
                Err(error) => Value::new(error.clone()),
            };
            if let Err(err) = callback.invoke(&[argument]) {
                tracing::warn!(error = %err, "Future completion callback failed");
            }
        }));
    }
}

impl<T: Any + Clone + Send + Sync> Future<T> {
    /// Create a pending future
    pub fn new() -> Self {
        Self::with_result_type(TypeKey::of::<T>())
    }

    /// Create an already fulfilled future
    pub fn fulfilled(value: T) -> Self {
        let future = Self::new();
        // A fresh future cannot already be settled
        let _ = future.fulfill(value);
        future
    }

    /// Create an already failed future
    pub fn failed(error: ReflectError) -> Self {
        let future = Self::new();
        let _ = future.fail(error);
        future
    }

    /// Settle with a value.
    ///
    /// Fails with `AlreadySettled` if the future was settled before; the
    /// stored result is unchanged in that case.
    pub fn fulfill(&self, value: T) -> ReflectResult<()> {
        self.settle(Ok(Value::new(value)))
    }

    /// Run `f` with the typed result once settled.
    pub fn on_complete(&self, f: impl FnOnce(ReflectResult<T>) + Send + 'static) {
        self.register(Box::new(move |outcome: &Outcome| {
            f(extract::<T>(outcome));
        }));
    }

    /// Result if settled, without blocking
    pub fn try_result(&self) -> Option<ReflectResult<T>> {
        let state = self.inner.state.lock();
        state.outcome.as_ref().map(extract::<T>)
    }

    /// Block until settled and return the result
    pub fn wait(&self) -> ReflectResult<T> {
        let mut state = self.inner.state.lock();
        loop {
            if let Some(outcome) = &state.outcome {
                return extract::<T>(outcome);
            }
            self.inner.settled.wait(&mut state);
        }
    }
}

impl<T: Any + Clone + Send + Sync> Default for Future<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl Future<Value> {
    /// Typed view sharing this future's state.
    ///
    /// The stored value is converted to `U` when read.
    pub fn typed<U: Any + Clone + Send + Sync>(&self) -> Future<U> {
        Future {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

fn extract<T: Any + Clone + Send + Sync>(outcome: &Outcome) -> ReflectResult<T> {
    match outcome {
        Ok(value) => value.to::<T>(),
        Err(error) => Err(error.clone()),
    }
}
