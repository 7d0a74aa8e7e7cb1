//! Integration tests for the collaborator interfaces
//!
//! Tests cover:
//! - Rendering-style name resolution across a resolver chain
//! - Reflected methods exposed as slot callbacks
//! - Session values feeding resolution
//! - Event delivery to reflected methods

use std::sync::Arc;

use refract_bindings::diagnostics::{method_label, type_label};
use refract_bindings::{
    CallbackRegistry, EventDispatcher, MemorySession, ObjectResolver, Resolver, ResolverChain,
    SessionStore,
};
use refract_core::{
    shared, values, Callback, CallbackKind, MetaField, MetaMethod, MetaObject, MetaRegistry,
    ReflectError, Shared, Value,
};

#[derive(Debug, Clone)]
struct Page {
    title: String,
    views: i64,
}

fn page_registry() -> MetaRegistry {
    let document = MetaObject::builder("Document")
        .method(MetaMethod::instance("summary", |p: &mut Page| {
            format!("{} ({} views)", p.title, p.views)
        }))
        .finish()
        .unwrap();
    let page = MetaObject::builder("Page")
        .with_type::<Page>()
        .base("Document")
        .method(MetaMethod::instance("visit", |p: &mut Page| {
            p.views += 1;
            p.views
        }))
        .field(MetaField::read_write(
            "title",
            |p: &Page| p.title.clone(),
            |p: &mut Page, t: String| p.title = t,
        ))
        .finish()
        .unwrap();

    let mut builder = MetaRegistry::builder();
    builder.register_all([document, page]).unwrap();
    builder.build().unwrap()
}

fn page_instance() -> (Shared<Page>, Value) {
    let cell = shared(Page {
        title: "Home".to_string(),
        views: 0,
    });
    let value = Value::from_shared(cell.clone());
    (cell, value)
}

#[test]
fn test_render_through_chain() {
    let registry = page_registry();
    let (_, page) = page_instance();

    let session = Arc::new(MemorySession::new("s1"));
    session.set("user", Value::new("ada"));

    let mut helpers = CallbackRegistry::new();
    helpers.register("upper", Callback::from_fn(|s: String| s.to_uppercase()));
    helpers.register("title", Callback::from_fn(|| "shadowed".to_string()));

    let chain = ResolverChain::new()
        .with(ObjectResolver::new(&registry, page).unwrap())
        .with(session.clone())
        .with(helpers);

    // Object members come first
    let title = chain.call("title", &[]).unwrap();
    assert_eq!(title.to::<String>().unwrap(), "Home");

    // Inherited method
    let summary = chain.call("summary", &[]).unwrap();
    assert_eq!(summary.to::<String>().unwrap(), "Home (0 views)");

    // Session value, then a helper applied to it
    let user = chain.call("user", &[]).unwrap();
    let upper = chain.call("upper", &[user]).unwrap();
    assert_eq!(upper.to::<String>().unwrap(), "ADA");

    assert!(matches!(
        chain.call("footer", &[]),
        Err(ReflectError::NotFound { kind: "binding", .. })
    ));
}

#[test]
fn test_reflected_methods_as_slots() {
    let registry = page_registry();
    let (cell, page) = page_instance();
    let resolver = Arc::new(ObjectResolver::new(&registry, page).unwrap());

    let visit = Callback::slot(&resolver, "visit");
    assert_eq!(visit.kind(), CallbackKind::Slot);
    assert_eq!(visit.invoke(&[]).unwrap().to::<i64>().unwrap(), 1);
    assert_eq!(visit.invoke(&[]).unwrap().to::<i64>().unwrap(), 2);
    assert_eq!(cell.read().views, 2);

    let title = Callback::slot(&resolver, "title");
    assert_eq!(title.invoke(&[]).unwrap().to::<String>().unwrap(), "Home");

    assert!(!Callback::slot(&resolver, "missing").is_valid());

    drop(resolver);
    assert!(matches!(
        visit.invoke(&[]),
        Err(ReflectError::SlotUnavailable(_))
    ));
}

#[test]
fn test_events_drive_reflected_instance() {
    let registry = page_registry();
    let (cell, page) = page_instance();
    let visit = registry
        .by_name("Page")
        .and_then(|meta| registry.lookup_method(meta, "visit"))
        .unwrap()
        .callback(&page);

    let dispatcher = EventDispatcher::new();
    assert!(dispatcher.connect("request", visit.clone()));
    assert!(dispatcher.connect("request", Callback::from_fn(|path: String| path.len())));

    let results = dispatcher.emit("request", &values!["/home"]);
    assert_eq!(results.len(), 2);
    // visit takes no arguments, so it fails and the next handler still runs
    assert!(matches!(results[0], Err(ReflectError::ArityMismatch { .. })));
    assert_eq!(results[1].as_ref().unwrap().to::<usize>().unwrap(), 5);
    assert_eq!(cell.read().views, 0);

    dispatcher.connect("tick", visit);
    dispatcher.emit("tick", &[]);
    assert_eq!(cell.read().views, 1);
}

#[test]
fn test_linked_callbacks_dispatch() {
    let mut registry = CallbackRegistry::new();
    registry.register("join", Callback::from_fn(|a: String, b: String| a + &b));
    registry.register("len", Callback::from_fn(|s: String| s.len()));

    let linked = registry.link(&["len", "join"]).unwrap();
    let joined = linked.call(1, &values!["ab", 12i32]).unwrap();
    assert_eq!(joined.to::<String>().unwrap(), "ab12");
    assert_eq!(linked.call(0, &[joined]).unwrap().to::<usize>().unwrap(), 4);
}

#[test]
fn test_diagnostic_labels() {
    let registry = page_registry();
    let (_, page) = page_instance();
    assert_eq!(type_label(&page, &registry), "Page");

    let meta = registry.by_name("Page").unwrap();
    let visit = meta.method("visit").unwrap();
    assert_eq!(method_label(visit), "visit() -> i64");
}
