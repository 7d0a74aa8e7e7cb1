//! Serde model of the metadata document
//!
//! ```text
//! { "<source file>": { "<type>": TypeDoc, ... }, ... }
//! ```
//!
//! Every key of every object is required. Objects keyed by name are read
//! into `BTreeMap`s, so types, enums and fields come out sorted by name.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Whole document: source file → type name → type
pub type Document = BTreeMap<String, BTreeMap<String, TypeDoc>>;

/// One described type
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDoc {
    /// Type annotations
    pub annotations: Vec<AnnotationDoc>,

    /// Base class names, in declaration order
    pub bases: Vec<String>,

    /// Instance methods
    pub member_methods: Vec<MethodDoc>,

    /// Static methods
    pub static_methods: Vec<MethodDoc>,

    /// Constructors
    pub constructors: Vec<MethodDoc>,

    /// Enumerations by name
    pub enums: BTreeMap<String, EnumDoc>,

    /// Fields by name
    pub fields: BTreeMap<String, FieldDoc>,
}

/// Method, static method or constructor
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDoc {
    /// Method name
    pub name: String,

    /// Result type name
    pub result_type: String,

    /// Argument names, parallel to `argument_types`
    pub argument_names: Vec<String>,

    /// Argument type names
    pub argument_types: Vec<String>,

    /// Method annotations
    pub annotations: Vec<AnnotationDoc>,
}

/// Enumeration
#[derive(Debug, Clone, Deserialize)]
pub struct EnumDoc {
    /// Key → integer value
    pub values: BTreeMap<String, i64>,

    /// Enumeration annotations
    pub annotations: Vec<AnnotationDoc>,
}

/// Field
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDoc {
    /// Field type name
    #[serde(rename = "type")]
    pub type_name: String,

    /// Whether the field can be written
    pub read_only: bool,

    /// Field annotations
    pub annotations: Vec<AnnotationDoc>,
}

/// Annotation; the value may be any JSON value except null
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationDoc {
    /// Annotation name
    pub name: String,

    /// Annotation value
    pub value: serde_json::Value,
}
