//! Refract JSON - type metadata documents
//!
//! Reads JSON documents describing types (bases, annotations, methods,
//! enumerations, fields) grouped by source file, and turns them into
//! described [`MetaObject`]s that can be registered alongside native ones.
//!
//! # Example
//!
//! ```ignore
//! use refract_json::JsonMetaReader;
//!
//! let mut reader = JsonMetaReader::new();
//! reader.parse_file("metadata.json")?;
//! let mut builder = refract_core::MetaRegistry::builder();
//! reader.register_into(&mut builder)?;
//! let registry = builder.build()?;
//! ```
//!
//! [`MetaObject`]: refract_core::MetaObject

#![warn(missing_docs)]

pub mod document;
pub mod error;
pub mod reader;

pub use error::{JsonMetaError, JsonMetaResult};
pub use reader::{json_to_value, JsonMetaReader};
