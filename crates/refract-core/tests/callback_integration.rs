//! Integration tests for callbacks
//!
//! Tests cover:
//! - Argument count and conversion checks
//! - Slots on weakly held receivers
//! - Variadic callbacks and partial application
//! - Asynchronous invocation

use std::sync::Arc;

use parking_lot::Mutex;
use refract_core::{
    shared, values, Binding, Callback, CallbackKind, Future, ReflectError, ReflectResult,
    Signature, SlotReceiver, TypeKey, Value, ValueList,
};

/// Receiver exposing one slot, `greet(name: String) -> String`
struct Greeter {
    prefix: String,
    calls: Mutex<u32>,
}

impl SlotReceiver for Greeter {
    fn slot_signature(&self, name: &str) -> Option<Signature> {
        (name == "greet").then(|| {
            Signature::new(TypeKey::of::<String>(), vec![TypeKey::of::<String>()])
        })
    }

    fn call_slot(&self, name: &str, args: Vec<Value>) -> ReflectResult<Value> {
        if name != "greet" {
            return Err(ReflectError::NotFound {
                kind: "slot",
                name: name.to_string(),
            });
        }
        *self.calls.lock() += 1;
        let who = args[0].to::<String>()?;
        Ok(Value::new(format!("{}, {}", self.prefix, who)))
    }
}

fn greeter() -> Arc<Greeter> {
    Arc::new(Greeter {
        prefix: "Hello".to_string(),
        calls: Mutex::new(0),
    })
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn test_add_with_string_argument() {
    let add = Callback::from_fn(|a: i32, b: i32| a + b);
    assert_eq!(add.invoke(&values![2i32, "3"]).unwrap().to::<i32>().unwrap(), 5);
}

#[test]
fn test_arity_checked_before_call() {
    let calls = Arc::new(Mutex::new(0));
    let counter = calls.clone();
    let cb = Callback::from_fn(move |_: i32| *counter.lock() += 1);

    assert!(matches!(
        cb.invoke(&values![1i32, 2i32]),
        Err(ReflectError::ArityMismatch { expected: 1, got: 2 })
    ));
    assert!(matches!(
        cb.invoke(&values!["nope"]),
        Err(ReflectError::ArgumentConversion { index: 0, .. })
    ));
    assert_eq!(*calls.lock(), 0);

    cb.invoke(&values![1i32]).unwrap();
    assert_eq!(*calls.lock(), 1);
}

#[test]
fn test_raw_callback() {
    let sig = Signature::new(TypeKey::of::<i64>(), vec![TypeKey::of::<i64>(); 2]);
    let mul = Callback::from_raw(sig, |args| {
        Ok(Value::new(args[0].to::<i64>()? * args[1].to::<i64>()?))
    });
    assert_eq!(mul.invoke(&values![6i32, 7i32]).unwrap().to::<i64>().unwrap(), 42);
}

#[test]
fn test_try_method() {
    #[derive(Debug, thiserror::Error)]
    #[error("account overdrawn")]
    struct Overdrawn;

    struct Account {
        balance: i64,
    }

    let account = shared(Account { balance: 10 });
    let withdraw = Callback::from_try_method(&account, |a: &mut Account, amount: i64| {
        if amount > a.balance {
            return Err(Overdrawn);
        }
        a.balance -= amount;
        Ok(a.balance)
    });

    assert_eq!(withdraw.invoke(&values![4i64]).unwrap().to::<i64>().unwrap(), 6);
    let err = withdraw.invoke(&values![100i64]).unwrap_err();
    assert!(err.invocation_payload::<Overdrawn>().is_some());
    assert_eq!(account.read().balance, 6);
}

// ============================================================================
// Slots
// ============================================================================

#[test]
fn test_slot_invocation() {
    let receiver = greeter();
    let cb = Callback::slot(&receiver, "greet");
    assert_eq!(cb.kind(), CallbackKind::Slot);
    assert_eq!(
        cb.invoke(&values!["Ada"]).unwrap().to::<String>().unwrap(),
        "Hello, Ada"
    );
    assert_eq!(*receiver.calls.lock(), 1);
}

#[test]
fn test_missing_slot_is_invalid() {
    let receiver = greeter();
    let cb = Callback::slot(&receiver, "wave");
    assert!(!cb.is_valid());
    assert!(matches!(cb.invoke(&[]), Err(ReflectError::InvalidCallback)));
}

#[test]
fn test_slot_after_receiver_dropped() {
    let receiver = greeter();
    let cb = Callback::slot(&receiver, "greet");
    drop(receiver);
    assert!(matches!(
        cb.invoke(&values!["Ada"]),
        Err(ReflectError::SlotUnavailable(name)) if name == "greet"
    ));
}

#[test]
fn test_slot_through_trait_object() {
    let receiver = greeter();
    let erased: Arc<dyn SlotReceiver> = receiver.clone();
    let cb = Callback::dyn_slot(&erased, "greet");
    drop(erased);
    // The concrete handle still keeps the receiver alive
    assert_eq!(
        cb.invoke(&values!["Grace"]).unwrap().to::<String>().unwrap(),
        "Hello, Grace"
    );
}

// ============================================================================
// Variadic and bound callbacks
// ============================================================================

#[test]
fn test_variadic_sum() {
    let sum = Callback::from_fn(|rest: ValueList| {
        rest.iter().filter_map(|v| v.to::<i64>().ok()).sum::<i64>()
    })
    .into_variadic()
    .unwrap();

    assert_eq!(sum.invoke(&[]).unwrap().to::<i64>().unwrap(), 0);
    assert_eq!(
        sum.invoke(&values![1i32, 2i64, "3"]).unwrap().to::<i64>().unwrap(),
        6
    );
}

#[test]
fn test_bind_then_variadic_prefix() {
    let log = Callback::from_fn(|level: String, parts: ValueList| {
        format!("[{}] {}", level, parts.len())
    })
    .into_variadic()
    .unwrap()
    .bind(vec![Binding::value("warn".to_string())]);

    assert!(log.is_variadic());
    assert_eq!(
        log.invoke(&values![1i32, 2i32]).unwrap().to::<String>().unwrap(),
        "[warn] 2"
    );
}

#[test]
fn test_bound_arguments_are_converted() {
    let div = Callback::from_fn(|a: f64, b: f64| a / b);
    let half = div.bind(vec![Binding::placeholder(0), Binding::value(2i32)]);
    assert_eq!(half.invoke(&values![9i32]).unwrap().to::<f64>().unwrap(), 4.5);
}

// ============================================================================
// Asynchronous invocation
// ============================================================================

#[test]
fn test_invoke_async_producer_then_chain() {
    let pending: Future<String> = Future::new();
    let handle = pending.clone();
    let fetch = Callback::from_future_fn(move |_: String| handle.clone());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let fut = fetch.invoke_async(&values!["/index"]);
    fut.then(Callback::from_fn(move |body: String| sink.lock().push(body)));

    assert!(seen.lock().is_empty());
    pending.fulfill("<html>".to_string()).unwrap();
    assert_eq!(*seen.lock(), vec!["<html>".to_string()]);
}

#[test]
fn test_invoke_async_reports_invalid() {
    let fut = Callback::invalid().invoke_async(&[]);
    assert!(matches!(fut.wait(), Err(ReflectError::InvalidCallback)));
}
