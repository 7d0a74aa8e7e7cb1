//! MetaObject - reflected description of one type

use std::any::Any;

use rustc_hash::FxHashSet;

use super::member::{Annotated, MetaAnnotation, MetaEnum, MetaField, MetaMethod, MethodKind};
use crate::error::{ReflectError, ReflectResult};
use crate::types::TypeKey;
use crate::value::Value;

/// Reflected type: class name, bases, annotations and own members
#[derive(Debug, Clone)]
pub struct MetaObject {
    class_name: String,
    type_key: Option<TypeKey>,
    bases: Vec<String>,
    annotations: Vec<MetaAnnotation>,
    methods: Vec<MetaMethod>,
    fields: Vec<MetaField>,
    enums: Vec<MetaEnum>,
}

impl MetaObject {
    /// Start describing `class_name`
    pub fn builder(class_name: &str) -> MetaObjectBuilder {
        MetaObjectBuilder::new(class_name)
    }

    /// Class name
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Native type, if the object describes one
    pub fn type_key(&self) -> Option<TypeKey> {
        self.type_key
    }

    /// Declared base class names, in declaration order
    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    /// Own methods in declaration order
    pub fn methods(&self) -> &[MetaMethod] {
        &self.methods
    }

    /// Own fields in declaration order
    pub fn fields(&self) -> &[MetaField] {
        &self.fields
    }

    /// Own enumerations in declaration order
    pub fn enums(&self) -> &[MetaEnum] {
        &self.enums
    }

    /// Own method called `name` (bases are not searched)
    pub fn method(&self, name: &str) -> Option<&MetaMethod> {
        self.methods.iter().find(|m| m.name() == name)
    }

    /// Own field called `name`
    pub fn field(&self, name: &str) -> Option<&MetaField> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Own method called `name`, for attaching an invoker
    pub fn method_mut(&mut self, name: &str) -> Option<&mut MetaMethod> {
        self.methods.iter_mut().find(|m| m.name() == name)
    }

    /// Own field called `name`, for attaching accessors
    pub fn field_mut(&mut self, name: &str) -> Option<&mut MetaField> {
        self.fields.iter_mut().find(|f| f.name() == name)
    }

    /// Own enumeration called `name`
    pub fn enumeration(&self, name: &str) -> Option<&MetaEnum> {
        self.enums.iter().find(|e| e.name() == name)
    }

    /// Own constructors in declaration order
    pub fn constructors(&self) -> impl Iterator<Item = &MetaMethod> + Clone {
        self.methods
            .iter()
            .filter(|m| m.kind() == MethodKind::Constructor)
    }

    /// Create an instance with the first constructor accepting `args`
    pub fn instantiate(&self, args: &[Value]) -> ReflectResult<Value> {
        let constructor = self
            .constructors()
            .find(|c| c.accepts(args))
            .ok_or_else(|| ReflectError::NotFound {
                kind: "constructor",
                name: self.class_name.clone(),
            })?;
        constructor.invoke(&Value::null(), args)
    }
}

impl Annotated for MetaObject {
    fn annotations(&self) -> &[MetaAnnotation] {
        &self.annotations
    }
}

/// Incremental construction of a [`MetaObject`]
#[derive(Debug)]
pub struct MetaObjectBuilder {
    object: MetaObject,
}

impl MetaObjectBuilder {
    /// Start describing `class_name`
    pub fn new(class_name: &str) -> Self {
        Self {
            object: MetaObject {
                class_name: class_name.to_string(),
                type_key: None,
                bases: Vec::new(),
                annotations: Vec::new(),
                methods: Vec::new(),
                fields: Vec::new(),
                enums: Vec::new(),
            },
        }
    }

    /// Associate the native type `T`
    pub fn with_type<T: Any>(mut self) -> Self {
        self.object.type_key = Some(TypeKey::of::<T>());
        self
    }

    /// Declare a base class
    pub fn base(mut self, name: &str) -> Self {
        self.object.bases.push(name.to_string());
        self
    }

    /// Attach an annotation to the type
    pub fn annotation(mut self, name: &str, value: Value) -> Self {
        self.object.annotations.push(MetaAnnotation::new(name, value));
        self
    }

    /// Add a method, static method or constructor
    pub fn method(mut self, method: MetaMethod) -> Self {
        self.object.methods.push(method);
        self
    }

    /// Add a field
    pub fn field(mut self, field: MetaField) -> Self {
        self.object.fields.push(field);
        self
    }

    /// Add an enumeration
    pub fn enumeration(mut self, enumeration: MetaEnum) -> Self {
        self.object.enums.push(enumeration);
        self
    }

    /// Finish, rejecting duplicate member names within a category
    pub fn finish(self) -> ReflectResult<MetaObject> {
        let object = self.object;
        let class = &object.class_name;
        check_unique("method", class, object.methods.iter().map(MetaMethod::name))?;
        check_unique("field", class, object.fields.iter().map(MetaField::name))?;
        check_unique("enum", class, object.enums.iter().map(MetaEnum::name))?;
        Ok(object)
    }
}

fn check_unique<'a>(
    kind: &'static str,
    class: &str,
    names: impl Iterator<Item = &'a str>,
) -> ReflectResult<()> {
    let mut seen = FxHashSet::default();
    for name in names {
        if !seen.insert(name) {
            return Err(ReflectError::DuplicateMember {
                kind,
                name: name.to_string(),
                class: class.to_string(),
            });
        }
    }
    Ok(())
}
