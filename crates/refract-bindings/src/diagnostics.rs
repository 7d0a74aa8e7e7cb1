//! Diagnostics helpers for logging reflected objects

use refract_core::{MetaMethod, MetaObject, MetaRegistry, Value};

/// Human-readable type of `value`.
///
/// The reflected class name when the registry describes the value's type,
/// otherwise the short Rust type name. Null is `"null"`.
pub fn type_label(value: &Value, registry: &MetaRegistry) -> String {
    if value.is_null() {
        return "null".to_string();
    }
    match registry.describe(value) {
        Some(meta) => meta.class_name().to_string(),
        None => value.type_name(),
    }
}

/// Span labelled with the class name, for work done on behalf of `meta`
pub fn class_span(meta: &MetaObject) -> tracing::Span {
    tracing::debug_span!("class", name = meta.class_name())
}

/// Method as written in a declaration: `translate(dx: f64, dy: f64) -> ()`.
///
/// Argument names are included when the method declares them.
pub fn method_label(method: &MetaMethod) -> String {
    let names = method.argument_names();
    let args: Vec<String> = method
        .argument_types()
        .iter()
        .enumerate()
        .map(|(i, ty)| match names.get(i) {
            Some(name) => format!("{name}: {ty}"),
            None => ty.clone(),
        })
        .collect();
    format!(
        "{}({}) -> {}",
        method.name(),
        args.join(", "),
        method.return_type()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use refract_core::{shared, MethodKind};

    #[derive(Debug, Clone)]
    struct Shape {
        x: f64,
    }

    #[test]
    fn test_type_label() {
        let mut builder = MetaRegistry::builder();
        builder
            .register(MetaObject::builder("Shape").with_type::<Shape>().finish().unwrap())
            .unwrap();
        let registry = builder.build().unwrap();

        let shape = Value::from_shared(shared(Shape { x: 1.0 }));
        assert_eq!(type_label(&shape, &registry), "Shape");
        assert_eq!(type_label(&Value::new(5i32), &registry), "i32");
        assert_eq!(type_label(&Value::null(), &registry), "null");
    }

    #[test]
    fn test_method_label() {
        let translate = MetaMethod::instance("translate", |s: &mut Shape, dx: f64, _dy: f64| {
            s.x += dx;
        })
        .with_argument_names(["dx", "dy"]);
        assert_eq!(method_label(&translate), "translate(dx: f64, dy: f64) -> ()");

        let unnamed = MetaMethod::described(
            "area",
            MethodKind::Method,
            "f64",
            Vec::new(),
            vec!["i32".to_string()],
        );
        assert_eq!(method_label(&unnamed), "area(i32) -> f64");
    }

    #[test]
    fn test_class_span_enters() {
        let meta = MetaObject::builder("Shape").finish().unwrap();
        let span = class_span(&meta);
        let _guard = span.enter();
    }
}
