//! Reflected members: methods, fields, enumerations and annotations

use std::any::Any;
use std::sync::Arc;

use crate::callback::{Callback, CallbackKind, MethodFn, Signature, TypedFn};
use crate::error::{ReflectError, ReflectResult};
use crate::types::TypeKey;
use crate::value::{shared, Value};

// ============================================================================
// Annotations
// ============================================================================

/// Named value attached to a type or member
#[derive(Debug, Clone)]
pub struct MetaAnnotation {
    name: String,
    value: Value,
}

impl MetaAnnotation {
    /// Create an annotation
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Annotation name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Annotation value
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Anything carrying an ordered annotation list.
///
/// Several annotations may share a name.
pub trait Annotated {
    /// All annotations in declaration order
    fn annotations(&self) -> &[MetaAnnotation];

    /// First annotation called `name`
    fn annotation(&self, name: &str) -> Option<&MetaAnnotation> {
        self.annotations().iter().find(|a| a.name == name)
    }

    /// Every annotation called `name`
    fn annotations_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MetaAnnotation> + 'a {
        self.annotations().iter().filter(move |a| a.name == name)
    }

    /// Check for an annotation called `name`
    fn has_annotation(&self, name: &str) -> bool {
        self.annotation(name).is_some()
    }
}

macro_rules! impl_annotated {
    ($($ty:ty),+) => {
        $(impl Annotated for $ty {
            fn annotations(&self) -> &[MetaAnnotation] {
                &self.annotations
            }
        })+
    };
}

impl_annotated!(MetaMethod, MetaField, MetaEnum);

// ============================================================================
// Methods
// ============================================================================

/// How a method is called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// Called on an instance
    Method,
    /// Called without an instance
    Static,
    /// Creates a new shared instance
    Constructor,
}

type MethodInvoker = Arc<dyn Fn(&Value, Vec<Value>) -> ReflectResult<Value> + Send + Sync>;

/// Reflected method
#[derive(Clone)]
pub struct MetaMethod {
    name: String,
    kind: MethodKind,
    return_type: String,
    argument_names: Vec<String>,
    argument_types: Vec<String>,
    annotations: Vec<MetaAnnotation>,
    signature: Option<Signature>,
    invoker: Option<MethodInvoker>,
}

fn type_names(keys: &[TypeKey]) -> Vec<String> {
    keys.iter().map(TypeKey::name).collect()
}

fn default_argument_names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("arg{i}")).collect()
}

impl MetaMethod {
    fn invocable(name: &str, kind: MethodKind, signature: Signature, invoker: MethodInvoker) -> Self {
        Self {
            name: name.to_string(),
            kind,
            return_type: signature.return_type.name(),
            argument_names: default_argument_names(signature.arity()),
            argument_types: type_names(&signature.params),
            annotations: Vec::new(),
            signature: Some(signature),
            invoker: Some(invoker),
        }
    }

    /// Instance method on `T`.
    ///
    /// The instance passed at invocation must be a shared `T`.
    pub fn instance<T, Args, F>(name: &str, f: F) -> Self
    where
        T: Any + Send + Sync,
        F: MethodFn<T, Args>,
        F::Output: Any + Send + Sync,
    {
        let signature = Signature::new(TypeKey::of::<F::Output>(), F::params());
        let invoker: MethodInvoker = Arc::new(move |instance, args| {
            let handle = instance
                .shared_handle::<T>()
                .ok_or_else(|| ReflectError::TypeMismatch {
                    expected: TypeKey::of::<T>().name(),
                    got: instance.type_name(),
                })?;
            let args = F::take_args(args)?;
            let out = f.apply(&mut *handle.write(), args);
            Ok(Value::new(out))
        });
        Self::invocable(name, MethodKind::Method, signature, invoker)
    }

    /// Static method
    pub fn static_fn<Args, F>(name: &str, f: F) -> Self
    where
        F: TypedFn<Args>,
        F::Output: Any + Send + Sync,
    {
        let signature = Signature::new(TypeKey::of::<F::Output>(), F::params());
        let invoker: MethodInvoker = Arc::new(move |_, args| f.call_with(args).map(Value::new));
        Self::invocable(name, MethodKind::Static, signature, invoker)
    }

    /// Constructor producing a shared `T`
    pub fn constructor<T, Args, F>(name: &str, f: F) -> Self
    where
        T: Any + Send + Sync,
        F: TypedFn<Args, Output = T>,
    {
        let signature = Signature::new(TypeKey::of::<T>(), F::params());
        let invoker: MethodInvoker = Arc::new(move |_, args| {
            let instance = f.call_with(args)?;
            Ok(Value::from_shared(shared(instance)))
        });
        Self::invocable(name, MethodKind::Constructor, signature, invoker)
    }

    /// Method built at runtime over the generic convention.
    ///
    /// `f` receives the bound instance (null for static methods and
    /// constructors) and the arguments, already checked and converted
    /// against `signature`.
    pub fn runtime(
        name: &str,
        kind: MethodKind,
        signature: Signature,
        f: impl Fn(&Value, Vec<Value>) -> ReflectResult<Value> + Send + Sync + 'static,
    ) -> Self {
        Self::invocable(name, kind, signature, Arc::new(f))
    }

    /// Method known by signature only; it cannot be invoked
    pub fn described(
        name: &str,
        kind: MethodKind,
        return_type: &str,
        argument_names: Vec<String>,
        argument_types: Vec<String>,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind,
            return_type: return_type.to_string(),
            argument_names,
            argument_types,
            annotations: Vec::new(),
            signature: None,
            invoker: None,
        }
    }

    /// Give a method an invoker, keeping its names, type names and
    /// annotations.
    ///
    /// Fails with `ArityMismatch` when `signature` does not take as many
    /// arguments as the method declares.
    pub fn set_invoker(
        &mut self,
        signature: Signature,
        f: impl Fn(&Value, Vec<Value>) -> ReflectResult<Value> + Send + Sync + 'static,
    ) -> ReflectResult<()> {
        if signature.arity() != self.argument_types.len() {
            return Err(ReflectError::ArityMismatch {
                expected: self.argument_types.len(),
                got: signature.arity(),
            });
        }
        self.signature = Some(signature);
        self.invoker = Some(Arc::new(f));
        Ok(())
    }

    /// Attach an annotation
    pub fn with_annotation(mut self, name: &str, value: Value) -> Self {
        self.annotations.push(MetaAnnotation::new(name, value));
        self
    }

    /// Replace the argument names.
    ///
    /// Names beyond the argument count are ignored.
    pub fn with_argument_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for (slot, name) in self.argument_names.iter_mut().zip(names) {
            *slot = name.into();
        }
        self
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Method kind
    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    /// Return type name
    pub fn return_type(&self) -> &str {
        &self.return_type
    }

    /// Argument names in order
    pub fn argument_names(&self) -> &[String] {
        &self.argument_names
    }

    /// Argument type names in order
    pub fn argument_types(&self) -> &[String] {
        &self.argument_types
    }

    /// Native signature, for invocable methods
    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// Check if the method has an invoker
    pub fn is_invocable(&self) -> bool {
        self.invoker.is_some()
    }

    /// Callback for this method.
    ///
    /// Instance methods bind `instance`; static methods and constructors
    /// ignore it. Described methods yield an invalid callback.
    pub fn callback(&self, instance: &Value) -> Callback {
        let (Some(invoker), Some(signature)) = (&self.invoker, &self.signature) else {
            return Callback::invalid();
        };

        let invoker = invoker.clone();
        let (kind, instance) = match self.kind {
            MethodKind::Method => (CallbackKind::BoundMethod, instance.clone()),
            MethodKind::Static | MethodKind::Constructor => (CallbackKind::Function, Value::null()),
        };
        Callback::from_thunk(
            kind,
            signature.clone(),
            Arc::new(move |args| invoker(&instance, args)),
        )
    }

    /// Invoke on `instance` with `args`
    pub fn invoke(&self, instance: &Value, args: &[Value]) -> ReflectResult<Value> {
        self.callback(instance).invoke(args)
    }

    /// Check if `args` would be accepted, without invoking
    pub fn accepts(&self, args: &[Value]) -> bool {
        self.callback(&Value::null()).check_arguments(args)
    }
}

impl std::fmt::Debug for MetaMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaMethod")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("return_type", &self.return_type)
            .field("argument_types", &self.argument_types)
            .field("invocable", &self.is_invocable())
            .finish()
    }
}

// ============================================================================
// Fields
// ============================================================================

/// Field access mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAccess {
    /// Readable only
    ReadOnly,
    /// Readable and writable
    ReadWrite,
}

type FieldReader = Arc<dyn Fn(&Value) -> ReflectResult<Value> + Send + Sync>;
type FieldWriter = Arc<dyn Fn(&Value, &Value) -> ReflectResult<()> + Send + Sync>;

/// Reflected field
#[derive(Clone)]
pub struct MetaField {
    name: String,
    type_name: String,
    access: FieldAccess,
    annotations: Vec<MetaAnnotation>,
    reader: Option<FieldReader>,
    writer: Option<FieldWriter>,
}

fn field_reader<T, V>(get: impl Fn(&T) -> V + Send + Sync + 'static) -> FieldReader
where
    T: Any + Send + Sync,
    V: Any + Send + Sync,
{
    Arc::new(move |instance: &Value| {
        instance
            .with_ref(|any| any.downcast_ref::<T>().map(&get))
            .flatten()
            .map(Value::new)
            .ok_or_else(|| ReflectError::TypeMismatch {
                expected: TypeKey::of::<T>().name(),
                got: instance.type_name(),
            })
    })
}

impl MetaField {
    /// Readable and writable field on `T`.
    ///
    /// Writes need a shared instance; the written value is converted to `V`.
    pub fn read_write<T, V>(
        name: &str,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self
    where
        T: Any + Send + Sync,
        V: Any + Clone + Send + Sync,
    {
        let writer: FieldWriter = Arc::new(move |instance: &Value, value: &Value| {
            let value = value.to::<V>()?;
            let mut value = Some(value);
            instance
                .with_mut(|any| {
                    let this = any.downcast_mut::<T>()?;
                    set(this, value.take()?);
                    Some(())
                })
                .flatten()
                .ok_or_else(|| ReflectError::TypeMismatch {
                    expected: TypeKey::of::<T>().name(),
                    got: instance.type_name(),
                })
        });

        Self {
            name: name.to_string(),
            type_name: TypeKey::of::<V>().name(),
            access: FieldAccess::ReadWrite,
            annotations: Vec::new(),
            reader: Some(field_reader(get)),
            writer: Some(writer),
        }
    }

    /// Read-only field on `T`
    pub fn read_only<T, V>(name: &str, get: impl Fn(&T) -> V + Send + Sync + 'static) -> Self
    where
        T: Any + Send + Sync,
        V: Any + Send + Sync,
    {
        Self {
            name: name.to_string(),
            type_name: TypeKey::of::<V>().name(),
            access: FieldAccess::ReadOnly,
            annotations: Vec::new(),
            reader: Some(field_reader(get)),
            writer: None,
        }
    }

    /// Read-only field built at runtime.
    ///
    /// `get` receives the instance as passed to [`MetaField::read`]. Add a
    /// setter with [`MetaField::set_writer`] to make it writable.
    pub fn runtime(
        name: &str,
        type_name: &str,
        get: impl Fn(&Value) -> ReflectResult<Value> + Send + Sync + 'static,
    ) -> Self {
        let mut field = Self::described(name, type_name, FieldAccess::ReadOnly);
        field.set_reader(get);
        field
    }

    /// Field known by type name only; it cannot be read or written
    pub fn described(name: &str, type_name: &str, access: FieldAccess) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            access,
            annotations: Vec::new(),
            reader: None,
            writer: None,
        }
    }

    /// Replace the reader; the access mode is unchanged
    pub fn set_reader(
        &mut self,
        get: impl Fn(&Value) -> ReflectResult<Value> + Send + Sync + 'static,
    ) {
        self.reader = Some(Arc::new(get));
    }

    /// Replace the writer and make the field read-write
    pub fn set_writer(
        &mut self,
        set: impl Fn(&Value, &Value) -> ReflectResult<()> + Send + Sync + 'static,
    ) {
        self.writer = Some(Arc::new(set));
        self.access = FieldAccess::ReadWrite;
    }

    /// [`MetaField::set_writer`] in builder style
    pub fn with_writer(
        mut self,
        set: impl Fn(&Value, &Value) -> ReflectResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.set_writer(set);
        self
    }

    /// Attach an annotation
    pub fn with_annotation(mut self, name: &str, value: Value) -> Self {
        self.annotations.push(MetaAnnotation::new(name, value));
        self
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Access mode
    pub fn access(&self) -> FieldAccess {
        self.access
    }

    /// Check if the field is read-only
    pub fn is_read_only(&self) -> bool {
        self.access == FieldAccess::ReadOnly
    }

    /// Check if the field has a reader (described fields do not)
    pub fn is_readable(&self) -> bool {
        self.reader.is_some()
    }

    /// Read the field from `instance` (owned or shared)
    pub fn read(&self, instance: &Value) -> ReflectResult<Value> {
        match &self.reader {
            Some(reader) => reader(instance),
            None => Err(ReflectError::AccessDenied(self.name.clone())),
        }
    }

    /// Write `value` into a shared `instance`
    pub fn write(&self, instance: &Value, value: &Value) -> ReflectResult<()> {
        match (&self.writer, self.access) {
            (Some(writer), FieldAccess::ReadWrite) => writer(instance, value),
            _ => Err(ReflectError::AccessDenied(self.name.clone())),
        }
    }

    /// Zero-argument callback reading this field from `instance`
    pub fn reader_callback(&self, instance: &Value) -> Callback {
        let Some(reader) = self.reader.clone() else {
            return Callback::invalid();
        };
        let instance = instance.clone();
        Callback::from_thunk(
            CallbackKind::BoundMethod,
            Signature::new(TypeKey::of::<Value>(), Vec::new()),
            Arc::new(move |_| reader(&instance)),
        )
    }
}

impl std::fmt::Debug for MetaField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaField")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("access", &self.access)
            .finish()
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// Reflected enumeration: ordered (key, value) elements
#[derive(Debug, Clone)]
pub struct MetaEnum {
    name: String,
    elements: Vec<(String, i64)>,
    annotations: Vec<MetaAnnotation>,
}

impl MetaEnum {
    /// Create an enumeration from elements in declaration order
    pub fn new<I, S>(name: &str, elements: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            elements: elements.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            annotations: Vec::new(),
        }
    }

    /// Attach an annotation
    pub fn with_annotation(mut self, name: &str, value: Value) -> Self {
        self.annotations.push(MetaAnnotation::new(name, value));
        self
    }

    /// Enumeration name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Elements in declaration order
    pub fn elements(&self) -> &[(String, i64)] {
        &self.elements
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if the enumeration has no elements
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// First key with the given value
    pub fn value_to_key(&self, value: i64) -> Option<&str> {
        self.elements
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(k, _)| k.as_str())
    }

    /// Value of `key`
    pub fn key_to_value(&self, key: &str) -> Option<i64> {
        self.elements.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }
}
