//! Metadata document reader
//!
//! Turns a parsed [`Document`] into described [`MetaObject`]s, grouped by
//! the source file that declared them. Described members carry names,
//! types and annotations but no invokers.

use std::collections::BTreeMap;
use std::path::Path;

use refract_core::{
    FieldAccess, MetaEnum, MetaField, MetaMethod, MetaObject, MetaRegistryBuilder, MethodKind,
    Value, ValueList, ValueMap,
};

use crate::document::{AnnotationDoc, Document, EnumDoc, FieldDoc, MethodDoc, TypeDoc};
use crate::error::{JsonMetaError, JsonMetaResult};

/// Described meta objects, keyed by source file
#[derive(Debug, Clone, Default)]
pub struct JsonMetaReader {
    files: BTreeMap<String, Vec<MetaObject>>,
}

impl JsonMetaReader {
    /// Create a reader with no files loaded
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a document from a JSON string.
    ///
    /// On error nothing from this document is kept. Files already loaded
    /// stay; a file present in both is replaced by the new document's.
    pub fn parse_str(&mut self, json: &str) -> JsonMetaResult<()> {
        let document: Document = serde_json::from_str(json)?;
        self.load(document)
    }

    /// Read a document from JSON bytes
    pub fn parse_slice(&mut self, json: &[u8]) -> JsonMetaResult<()> {
        let document: Document = serde_json::from_slice(json)?;
        self.load(document)
    }

    /// Read a document from an already parsed JSON value
    pub fn parse_value(&mut self, json: serde_json::Value) -> JsonMetaResult<()> {
        let document: Document = serde_json::from_value(json)?;
        self.load(document)
    }

    /// Read a document from a file
    pub fn parse_file(&mut self, path: impl AsRef<Path>) -> JsonMetaResult<()> {
        let content = std::fs::read(path.as_ref())?;
        self.parse_slice(&content)
    }

    fn load(&mut self, document: Document) -> JsonMetaResult<()> {
        let mut files = BTreeMap::new();
        for (file, types) in document {
            let objects = types
                .into_iter()
                .map(|(name, doc)| build_type(&name, doc))
                .collect::<JsonMetaResult<Vec<_>>>()?;
            files.insert(file, objects);
        }

        for (file, objects) in files {
            tracing::debug!(file = %file, types = objects.len(), "Loaded metadata");
            self.files.insert(file, objects);
        }
        Ok(())
    }

    /// Source files loaded so far, sorted
    pub fn source_files(&self) -> impl Iterator<Item = &str> + '_ {
        self.files.keys().map(String::as_str)
    }

    /// Types declared by `source_file` (empty if unknown)
    pub fn meta_objects(&self, source_file: &str) -> &[MetaObject] {
        self.files
            .get(source_file)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Loaded type called `class_name`, for attaching invokers and
    /// accessors. The first file declaring it wins.
    pub fn meta_object_mut(&mut self, class_name: &str) -> Option<&mut MetaObject> {
        self.files
            .values_mut()
            .flatten()
            .find(|object| object.class_name() == class_name)
    }

    /// Every loaded type, file by file
    pub fn all(&self) -> impl Iterator<Item = &MetaObject> + '_ {
        self.files.values().flatten()
    }

    /// Total number of loaded types
    pub fn len(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    /// Check if no types are loaded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register every loaded type into `builder`.
    ///
    /// Returns the number registered; stops at the first rejected type.
    pub fn register_into(&self, builder: &mut MetaRegistryBuilder) -> JsonMetaResult<usize> {
        let mut count = 0;
        for object in self.all() {
            builder.register(object.clone())?;
            count += 1;
        }
        Ok(count)
    }
}

// ============================================================================
// Document → meta objects
// ============================================================================

fn build_type(name: &str, doc: TypeDoc) -> JsonMetaResult<MetaObject> {
    let mut builder = MetaObject::builder(name);
    for base in &doc.bases {
        builder = builder.base(base);
    }
    for (key, value) in annotations(name, &doc.annotations)? {
        builder = builder.annotation(&key, value);
    }

    let methods = [
        (MethodKind::Method, &doc.member_methods),
        (MethodKind::Static, &doc.static_methods),
        (MethodKind::Constructor, &doc.constructors),
    ];
    for (kind, list) in methods {
        for method in list {
            builder = builder.method(build_method(name, kind, method)?);
        }
    }

    for (enum_name, enum_doc) in &doc.enums {
        builder = builder.enumeration(build_enum(name, enum_name, enum_doc)?);
    }
    for (field_name, field_doc) in &doc.fields {
        builder = builder.field(build_field(name, field_name, field_doc)?);
    }

    Ok(builder.finish()?)
}

fn build_method(class: &str, kind: MethodKind, doc: &MethodDoc) -> JsonMetaResult<MetaMethod> {
    if doc.argument_names.len() != doc.argument_types.len() {
        return Err(JsonMetaError::ArgumentLengthMismatch {
            class: class.to_string(),
            method: doc.name.clone(),
            names: doc.argument_names.len(),
            types: doc.argument_types.len(),
        });
    }

    let mut method = MetaMethod::described(
        &doc.name,
        kind,
        &doc.result_type,
        doc.argument_names.clone(),
        doc.argument_types.clone(),
    );
    let owner = format!("{class}::{}", doc.name);
    for (key, value) in annotations(&owner, &doc.annotations)? {
        method = method.with_annotation(&key, value);
    }
    Ok(method)
}

fn build_enum(class: &str, name: &str, doc: &EnumDoc) -> JsonMetaResult<MetaEnum> {
    let elements = doc.values.iter().map(|(k, v)| (k.as_str(), *v));
    let mut enumeration = MetaEnum::new(name, elements);
    let owner = format!("{class}::{name}");
    for (key, value) in annotations(&owner, &doc.annotations)? {
        enumeration = enumeration.with_annotation(&key, value);
    }
    Ok(enumeration)
}

fn build_field(class: &str, name: &str, doc: &FieldDoc) -> JsonMetaResult<MetaField> {
    let access = if doc.read_only {
        FieldAccess::ReadOnly
    } else {
        FieldAccess::ReadWrite
    };
    let mut field = MetaField::described(name, &doc.type_name, access);
    let owner = format!("{class}::{name}");
    for (key, value) in annotations(&owner, &doc.annotations)? {
        field = field.with_annotation(&key, value);
    }
    Ok(field)
}

fn annotations(owner: &str, docs: &[AnnotationDoc]) -> JsonMetaResult<Vec<(String, Value)>> {
    docs.iter()
        .map(|doc| {
            if doc.value.is_null() {
                return Err(JsonMetaError::NullAnnotation {
                    owner: owner.to_string(),
                    annotation: doc.name.clone(),
                });
            }
            Ok((doc.name.clone(), json_to_value(&doc.value)))
        })
        .collect()
}

/// Convert a JSON value into a generic [`Value`].
///
/// Integers become `i64` (or `u64` above `i64::MAX`), other numbers `f64`,
/// arrays `ValueList` and objects `ValueMap`.
pub fn json_to_value(json: &serde_json::Value) -> Value {
    use serde_json::Value as Json;

    match json {
        Json::Null => Value::null(),
        Json::Bool(b) => Value::new(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::new(i)
            } else if let Some(u) = n.as_u64() {
                Value::new(u)
            } else {
                Value::new(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Json::String(s) => Value::new(s.clone()),
        Json::Array(items) => Value::new(items.iter().map(json_to_value).collect::<ValueList>()),
        Json::Object(map) => Value::new(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_value(v)))
                .collect::<ValueMap>(),
        ),
    }
}
